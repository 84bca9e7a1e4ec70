use std::collections::HashMap;

use crate::spell::FieldConfidence;

// Confidence drives downstream human-review triage; explicit metadata always
// outranks heuristic derivation. These exact values are a compatibility
// contract with the desktop client.

const STRUCTURED_PRESENT_OR_ABSENT: [&str; 7] = [
    "school",
    "source",
    "sphere",
    "class_list",
    "range",
    "components",
    "duration",
];

/// Scores for a record built from an explicit document header.
#[must_use]
pub fn score_structured_text(
    fields: &HashMap<&'static str, String>,
    description_present: bool,
) -> FieldConfidence {
    let mut confidence = FieldConfidence::new();
    confidence.set("name", if fields.contains_key("name") { 1.0 } else { 0.3 });
    confidence.set("level", if fields.contains_key("level") { 1.0 } else { 0.2 });
    for field in STRUCTURED_PRESENT_OR_ABSENT {
        confidence.set(field, if fields.contains_key(field) { 1.0 } else { 0.0 });
    }
    confidence.set("description", if description_present { 0.9 } else { 0.1 });
    confidence
}

/// Scores for a record recovered from running prose. The filename-derived
/// name and regex-derived level are never trustworthy enough for 1.0.
#[must_use]
pub fn score_prose(level_matched: bool, description_present: bool) -> FieldConfidence {
    let mut confidence = FieldConfidence::new();
    confidence.set("name", 0.3);
    confidence.set("level", if level_matched { 0.6 } else { 0.1 });
    confidence.set("description", if description_present { 0.7 } else { 0.1 });
    confidence.set("source", 0.5);
    confidence.set("school", 0.0);
    confidence.set("sphere", 0.0);
    confidence.set("class_list", 0.0);
    confidence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(keys: &[&'static str]) -> HashMap<&'static str, String> {
        keys.iter().map(|k| (*k, "value".to_string())).collect()
    }

    #[test]
    fn test_explicit_header_fields_score_full() {
        let confidence = score_structured_text(&fields(&["name", "level", "school"]), true);

        assert_eq!(confidence.get("name"), Some(1.0));
        assert_eq!(confidence.get("level"), Some(1.0));
        assert_eq!(confidence.get("school"), Some(1.0));
        assert_eq!(confidence.get("description"), Some(0.9));
    }

    #[test]
    fn test_heuristic_fallbacks_score_low() {
        let confidence = score_structured_text(&fields(&[]), false);

        assert_eq!(confidence.get("name"), Some(0.3));
        assert_eq!(confidence.get("level"), Some(0.2));
        assert_eq!(confidence.get("school"), Some(0.0));
        assert_eq!(confidence.get("sphere"), Some(0.0));
        assert_eq!(confidence.get("description"), Some(0.1));
    }

    #[test]
    fn test_prose_policy() {
        let matched = score_prose(true, true);
        assert_eq!(matched.get("name"), Some(0.3));
        assert_eq!(matched.get("level"), Some(0.6));
        assert_eq!(matched.get("description"), Some(0.7));
        assert_eq!(matched.get("source"), Some(0.5));
        assert_eq!(matched.get("school"), Some(0.0));
        assert_eq!(matched.get("sphere"), Some(0.0));
        assert_eq!(matched.get("class_list"), Some(0.0));

        let unmatched = score_prose(false, false);
        assert_eq!(unmatched.get("level"), Some(0.1));
        assert_eq!(unmatched.get("description"), Some(0.1));
    }
}
