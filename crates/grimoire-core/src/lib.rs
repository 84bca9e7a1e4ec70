pub mod capability;
pub mod character;
pub mod export;
pub mod ingest;
pub mod render;
pub mod spell;

pub use capability::{
    CapabilityError, ConversionDisabled, DocxToText, PandocPdf, PdfConversion, PdfToText,
    TextExtraction,
};
pub use character::{Character, CharacterAbilities, CharacterClass};
pub use export::{ExportError, ExportFormat, ExportOutput, ExportPipeline, ExportRequest};
pub use ingest::{ExtractError, ImportError, ImportOutput, ImportPipeline, ImportedSpell};
pub use spell::{
    DocumentKind, FieldConfidence, ImportArtifact, ImportConflict, RawDocument, SpellRecord,
};
