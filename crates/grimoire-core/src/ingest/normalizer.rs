use std::collections::HashMap;

/// Lower-case, trim, and collapse underscores so header keys written as
/// `Casting_Time`, `casting time`, or `CASTING TIME` all compare equal.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', " ")
}

/// Resolve a normalized header key to its canonical field, if any.
fn resolve_alias(key: &str) -> Option<&'static str> {
    match key {
        "name" | "title" => Some("name"),
        "school" => Some("school"),
        "sphere" => Some("sphere"),
        "classes" | "class" | "class list" => Some("class_list"),
        "level" | "lvl" => Some("level"),
        "range" => Some("range"),
        "components" => Some("components"),
        "material components" => Some("material_components"),
        "casting time" => Some("casting_time"),
        "duration" => Some("duration"),
        "area" | "area/target" | "target" => Some("area"),
        "saving throw" => Some("saving_throw"),
        "description" => Some("description"),
        "source" => Some("source"),
        "tags" => Some("tags"),
        "edition" => Some("edition"),
        "author" => Some("author"),
        "license" => Some("license"),
        "reversible" => Some("reversible"),
        _ => None,
    }
}

/// Restrict an arbitrary header key/value bag to the canonical field set.
/// Unresolved keys and empty values are dropped. When two raw keys resolve
/// to the same canonical field, the later one wins.
#[must_use]
pub fn normalize_fields(raw: &[(String, String)]) -> HashMap<&'static str, String> {
    let mut normalized = HashMap::new();
    for (key, value) in raw {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        if let Some(field) = resolve_alias(&normalize_key(key)) {
            normalized.insert(field, value.to_string());
        }
    }
    normalized
}
