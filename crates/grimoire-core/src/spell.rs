use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

/// The set of fields a spell record may carry regardless of source format.
pub const CANONICAL_FIELDS: [&str; 19] = [
    "name",
    "school",
    "sphere",
    "class_list",
    "level",
    "range",
    "components",
    "material_components",
    "casting_time",
    "duration",
    "area",
    "saving_throw",
    "description",
    "source",
    "tags",
    "edition",
    "author",
    "license",
    "reversible",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    StructuredText,
    Pdf,
    Docx,
}

impl DocumentKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StructuredText => "markdown",
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => Some(Self::StructuredText),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source document as read from disk. Bytes are read and hashed exactly
/// once per import.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub path: PathBuf,
    pub kind: DocumentKind,
    pub bytes: Vec<u8>,
    pub content_hash: String,
}

const HASH_CHUNK_SIZE: usize = 64 * 1024;

impl RawDocument {
    pub async fn load(path: &Path, kind: DocumentKind) -> std::io::Result<Self> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Sha256::new();
        let mut bytes = Vec::new();
        let mut chunk = vec![0u8; HASH_CHUNK_SIZE];

        loop {
            let n = file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            hasher.update(&chunk[..n]);
            bytes.extend_from_slice(&chunk[..n]);
        }

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            bytes,
            content_hash: hex::encode(hasher.finalize()),
        })
    }

    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// One normalized spell. `name` and `description` are always populated;
/// everything else is optional and absent fields stay out of the JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellRecord {
    pub name: String,
    pub level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sphere: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_components: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casting_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saving_throw: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default)]
    pub reversible: bool,
    #[serde(default)]
    pub is_cantrip: bool,
    #[serde(default)]
    pub is_quest_spell: bool,
    #[serde(
        default,
        rename = "_raw_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_text: Option<String>,
    #[serde(rename = "_source_file")]
    pub source_file: String,
}

impl SpellRecord {
    #[must_use]
    pub fn new(name: String, description: String, source_file: String) -> Self {
        Self {
            name,
            level: 0,
            school: None,
            sphere: None,
            class_list: None,
            range: None,
            components: None,
            material_components: None,
            casting_time: None,
            duration: None,
            area: None,
            saving_throw: None,
            description,
            source: None,
            tags: Vec::new(),
            edition: None,
            author: None,
            license: None,
            reversible: false,
            is_cantrip: false,
            is_quest_spell: false,
            raw_text: None,
            source_file,
        }
    }
}

/// Per-field reliability scores in `[0, 1]`. Kept separate from the record
/// itself; attached to the wire form under `_confidence`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConfidence(BTreeMap<String, f64>);

impl FieldConfidence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, score: f64) {
        self.0.insert(field.to_string(), score);
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Audit record written for every successfully imported document. Parallel
/// to the spell record, never merged into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportArtifact {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub hash: String,
    pub imported_at: DateTime<Utc>,
}

impl ImportArtifact {
    #[must_use]
    pub fn new(document: &RawDocument) -> Self {
        Self {
            kind: document.kind.as_str().to_string(),
            path: document.path.to_string_lossy().into_owned(),
            hash: document.content_hash.clone(),
            imported_at: Utc::now(),
        }
    }
}

/// A file that could not become a record. Recorded with a reason and
/// returned alongside the batch; never raised as a fatal error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConflict {
    pub path: String,
    pub reason: String,
}

impl ImportConflict {
    #[must_use]
    pub fn missing(path: &Path) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            reason: "missing".to_string(),
        }
    }

    #[must_use]
    pub fn parse(path: &Path, reason: &str) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
            reason: format!("parsing_error: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            DocumentKind::from_extension("md"),
            Some(DocumentKind::StructuredText)
        );
        assert_eq!(
            DocumentKind::from_extension("MARKDOWN"),
            Some(DocumentKind::StructuredText)
        );
        assert_eq!(DocumentKind::from_extension("pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_extension("txt"), None);
    }

    #[tokio::test]
    async fn test_load_hashes_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("spell.md");
        tokio::fs::write(&path, "hello").await.unwrap();

        let doc = RawDocument::load(&path, DocumentKind::StructuredText)
            .await
            .unwrap();

        assert_eq!(doc.bytes, b"hello");
        // sha256("hello")
        assert_eq!(
            doc.content_hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[tokio::test]
    async fn test_load_is_stable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("spell.md");
        tokio::fs::write(&path, "same content").await.unwrap();

        let a = RawDocument::load(&path, DocumentKind::StructuredText)
            .await
            .unwrap();
        let b = RawDocument::load(&path, DocumentKind::StructuredText)
            .await
            .unwrap();

        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.content_hash.len(), 64);
    }

    #[test]
    fn test_conflict_reasons() {
        let missing = ImportConflict::missing(Path::new("/tmp/gone.md"));
        assert_eq!(missing.reason, "missing");

        let parse = ImportConflict::parse(Path::new("/tmp/bad.pdf"), "boom");
        assert_eq!(parse.reason, "parsing_error: boom");
    }

    #[test]
    fn test_record_serializes_provenance_keys() {
        let mut record = SpellRecord::new(
            "Arcane Bolt".into(),
            "Zap.".into(),
            "/tmp/arcane_bolt.md".into(),
        );
        record.raw_text = Some("raw".into());

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_source_file"], "/tmp/arcane_bolt.md");
        assert_eq!(value["_raw_text"], "raw");
        assert!(value.get("school").is_none());
    }
}
