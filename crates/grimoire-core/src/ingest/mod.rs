pub mod confidence;
pub mod extractor;
pub mod normalizer;
pub mod pipeline;

pub use extractor::{ExtractError, ExtractedSpell, SpellExtractor};
pub use pipeline::{ImportError, ImportOutput, ImportPipeline, ImportedSpell};
