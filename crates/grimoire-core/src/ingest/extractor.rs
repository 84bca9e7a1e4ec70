use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use super::confidence;
use super::normalizer::{normalize_fields, normalize_key};
use crate::capability::{CapabilityError, TextExtraction};
use crate::spell::{DocumentKind, FieldConfidence, RawDocument, SpellRecord};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// A record plus its per-field reliability, as produced by one extractor.
#[derive(Debug, Clone)]
pub struct ExtractedSpell {
    pub record: SpellRecord,
    pub confidence: FieldConfidence,
}

/// One document format's way of turning raw bytes into a canonical record.
/// Errors are typed and caught by the import pipeline, which converts them
/// into conflicts; they never reach the transport caller.
#[async_trait::async_trait]
pub trait SpellExtractor: Send + Sync {
    fn kind(&self) -> DocumentKind;

    async fn extract(&self, document: &RawDocument) -> ExtractResult<ExtractedSpell>;
}

const LEVEL_PATTERN: &str = r"(?i)(?:Level|Lvl)[:\s]*(\d+)";

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Binary prose never yields a reliable title, and headerless text documents
/// may not either; the filename is the fallback of last resort.
fn name_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("untitled");
    title_case(&stem.replace('_', " "))
}

/// Split a document on a literal `---` delimiter line at position 0 into
/// header pairs and body. No opening delimiter, or an unterminated header,
/// means the whole text is body with an empty header. Header lines parse as
/// `key: value` on the first colon; blank and colon-less lines are skipped.
fn split_front_matter(text: &str) -> (Vec<(String, String)>, String) {
    let mut lines = text.lines();
    match lines.next() {
        Some(first) if first.trim() == "---" => {}
        _ => return (Vec::new(), text.to_string()),
    }

    let mut header = Vec::new();
    let mut body = Vec::new();
    let mut in_header = true;
    for line in lines {
        if in_header {
            if line.trim() == "---" {
                in_header = false;
            } else if let Some((key, value)) = line.split_once(':') {
                if !key.trim().is_empty() {
                    header.push((key.trim().to_string(), value.trim().to_string()));
                }
            }
        } else {
            body.push(line);
        }
    }

    if in_header {
        return (Vec::new(), text.to_string());
    }
    (header, body.join("\n"))
}

fn heading_name(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let trimmed = line.trim();
        trimmed
            .strip_prefix("# ")
            .map(|rest| rest.trim().to_string())
    })
}

/// Level token interpretation for explicit headers. `cantrip` and `quest`
/// are word tokens; a literal 8 is only a quest spell when the record also
/// carries a sphere. Unparseable and negative values fall back to 0.
fn parse_level(raw: &str, has_sphere: bool) -> (i64, bool, bool) {
    let token = raw.trim().to_lowercase();
    match token.as_str() {
        "cantrip" => (0, true, false),
        "quest" => (8, false, true),
        _ => {
            let level = token.parse::<i64>().unwrap_or(0).max(0);
            (level, false, level == 8 && has_sphere)
        }
    }
}

/// Extractor for text documents carrying a machine-readable header.
#[derive(Debug, Default)]
pub struct StructuredTextExtractor;

impl StructuredTextExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl SpellExtractor for StructuredTextExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::StructuredText
    }

    async fn extract(&self, document: &RawDocument) -> ExtractResult<ExtractedSpell> {
        let text = document.text_lossy();
        let (header, body) = split_front_matter(&text);
        let mut fields = normalize_fields(&header);

        let description = fields
            .get("description")
            .cloned()
            .unwrap_or_else(|| body.trim().to_string());
        let confidence = confidence::score_structured_text(&fields, !description.is_empty());

        let name = fields
            .remove("name")
            .or_else(|| heading_name(&body))
            .unwrap_or_else(|| name_from_filename(&document.path));

        let (level, mut is_cantrip, is_quest_spell) = fields.get("level").map_or_else(
            || (0, false, false),
            |raw| parse_level(raw, fields.contains_key("sphere")),
        );
        // The marker is not a canonical field, so it is read from the raw
        // header before normalization drops it.
        if !is_cantrip {
            is_cantrip = header.iter().any(|(key, value)| {
                matches!(normalize_key(key).as_str(), "cantrip" | "is cantrip") && is_truthy(value)
            });
        }

        let tags = fields.remove("tags").map_or_else(Vec::new, |raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(String::from)
                .collect()
        });

        let mut record = SpellRecord::new(
            name,
            description,
            document.path.to_string_lossy().into_owned(),
        );
        record.level = level;
        record.is_cantrip = is_cantrip;
        record.is_quest_spell = is_quest_spell;
        record.school = fields.remove("school");
        record.sphere = fields.remove("sphere");
        record.class_list = fields.remove("class_list");
        record.range = fields.remove("range");
        record.components = fields.remove("components");
        record.material_components = fields.remove("material_components");
        record.casting_time = fields.remove("casting_time");
        record.duration = fields.remove("duration");
        record.area = fields.remove("area");
        record.saving_throw = fields.remove("saving_throw");
        record.source = fields.remove("source");
        record.edition = fields.remove("edition");
        record.author = fields.remove("author");
        record.license = fields.remove("license");
        record.reversible = fields.remove("reversible").as_deref().is_some_and(is_truthy);
        record.tags = tags;
        record.raw_text = Some(text);

        Ok(ExtractedSpell { record, confidence })
    }
}

/// Extractor for binary formats whose text comes from an external tool.
/// One implementation serves both kinds; only the capability, the kind, and
/// the fixed source label differ.
pub struct ProseExtractor {
    kind: DocumentKind,
    source_label: &'static str,
    text: Arc<dyn TextExtraction>,
    level_re: Option<Regex>,
}

impl ProseExtractor {
    #[must_use]
    pub fn pdf(text: Arc<dyn TextExtraction>) -> Self {
        Self {
            kind: DocumentKind::Pdf,
            source_label: "PDF Import",
            text,
            level_re: Regex::new(LEVEL_PATTERN).ok(),
        }
    }

    #[must_use]
    pub fn docx(text: Arc<dyn TextExtraction>) -> Self {
        Self {
            kind: DocumentKind::Docx,
            source_label: "DOCX Import",
            text,
            level_re: Regex::new(LEVEL_PATTERN).ok(),
        }
    }

    fn find_level(&self, text: &str) -> (i64, bool) {
        self.level_re
            .as_ref()
            .and_then(|re| re.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|digits| digits.as_str().parse::<i64>().ok())
            .map_or((0, false), |level| (level, true))
    }
}

#[async_trait::async_trait]
impl SpellExtractor for ProseExtractor {
    fn kind(&self) -> DocumentKind {
        self.kind
    }

    async fn extract(&self, document: &RawDocument) -> ExtractResult<ExtractedSpell> {
        let text = self.text.extract_text(&document.path).await?;
        let description = text.trim().to_string();
        let (level, level_matched) = self.find_level(&text);
        let confidence = confidence::score_prose(level_matched, !description.is_empty());

        let mut record = SpellRecord::new(
            name_from_filename(&document.path),
            description,
            document.path.to_string_lossy().into_owned(),
        );
        record.level = level;
        record.source = Some(self.source_label.to_string());
        record.raw_text = Some(text);

        Ok(ExtractedSpell { record, confidence })
    }
}
