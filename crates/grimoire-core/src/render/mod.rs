pub mod html;
pub mod markdown;

use serde_json::Value;

use crate::character::Character;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Single,
    List,
    Spellbook,
    CharacterSheet,
    SpellbookPack,
}

impl RenderMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::List => "list",
            Self::Spellbook => "spellbook",
            Self::CharacterSheet => "character_sheet",
            Self::SpellbookPack => "spellbook_pack",
        }
    }

    /// Mode strings are forgiving: anything unrecognized renders as the
    /// default flat list.
    #[must_use]
    pub fn from_param(param: &str) -> Self {
        match param {
            "single" => Self::Single,
            "spellbook" => Self::Spellbook,
            "character_sheet" => Self::CharacterSheet,
            "spellbook_pack" => Self::SpellbookPack,
            _ => Self::List,
        }
    }
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellLayout {
    Compact,
    Full,
}

impl SpellLayout {
    /// Older clients sent layout names like `standard` and `stat-block`;
    /// everything that is not `compact` gets the full field breakdown.
    #[must_use]
    pub fn from_param(param: &str) -> Self {
        if param == "compact" {
            Self::Compact
        } else {
            Self::Full
        }
    }
}

/// One render call: records plus the optional character context and
/// class scope that some modes use.
pub struct RenderRequest<'a> {
    pub records: &'a [Value],
    pub mode: RenderMode,
    pub layout: SpellLayout,
    pub character: Option<&'a Character>,
    pub class_name: Option<&'a str>,
}

impl<'a> RenderRequest<'a> {
    /// The character sheet carries its spells inside the character payload;
    /// everything else passes them at the top level.
    #[must_use]
    pub fn effective_records(&self) -> &'a [Value] {
        if self.records.is_empty() {
            if let Some(character) = self.character {
                if !character.character_spells.is_empty() {
                    return &character.character_spells;
                }
            }
        }
        self.records
    }
}

/// Read-only access to an externally-supplied spell map. Canonical
/// snake_case keys win; the client's camelCase variants fill their absence.
pub struct RecordView<'a> {
    map: Option<&'a serde_json::Map<String, Value>>,
}

impl<'a> RecordView<'a> {
    #[must_use]
    pub fn new(value: &'a Value) -> Self {
        Self {
            map: value.as_object(),
        }
    }

    fn raw(&self, field: &str) -> Option<&'a Value> {
        let map = self.map?;
        map.get(field)
            .filter(|v| !v.is_null())
            .or_else(|| map.get(&camel_case(field)).filter(|v| !v.is_null()))
    }

    #[must_use]
    pub fn text(&self, field: &str) -> Option<String> {
        match self.raw(field)? {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn level(&self) -> i64 {
        match self.raw("level") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    #[must_use]
    pub fn flag(&self, field: &str) -> bool {
        match self.raw(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0) != 0.0,
            Some(Value::String(s)) => {
                matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes")
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.text("name").unwrap_or_else(|| "Unnamed Spell".to_string())
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.text("description").unwrap_or_default()
    }
}

fn camel_case(snake: &str) -> String {
    let mut parts = snake.split('_');
    let mut out = String::from(parts.next().unwrap_or_default());
    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Escape interpolated free text for markup output.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape and turn newlines into explicit breaks. Plain-text encodings keep
/// their newlines literal instead.
#[must_use]
pub fn escape_html_multiline(text: &str) -> String {
    escape_html(&text.replace("\r\n", "\n")).replace('\n', "<br>\n")
}
