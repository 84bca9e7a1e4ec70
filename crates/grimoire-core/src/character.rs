use serde::{Deserialize, Serialize};

/// Ability scores as stored by the desktop client. `com` is an optional
/// extra column some campaigns track; it only renders when present and
/// `include_com` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharacterAbilities {
    #[serde(default, rename = "str")]
    pub strength: Option<i64>,
    #[serde(default, rename = "dex")]
    pub dexterity: Option<i64>,
    #[serde(default, rename = "con")]
    pub constitution: Option<i64>,
    #[serde(default, rename = "int")]
    pub intelligence: Option<i64>,
    #[serde(default, rename = "wis")]
    pub wisdom: Option<i64>,
    #[serde(default, rename = "cha")]
    pub charisma: Option<i64>,
    #[serde(default, rename = "com")]
    pub comeliness: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterClass {
    #[serde(alias = "className")]
    pub class_name: String,
    #[serde(default, alias = "classLabel", skip_serializing_if = "Option::is_none")]
    pub class_label: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
}

/// Character context supplied with an export request. Field names accept the
/// camelCase variants the desktop client sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "characterType")]
    pub character_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub abilities: Option<CharacterAbilities>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<CharacterClass>,
    #[serde(default, alias = "characterSpells", skip_serializing_if = "Vec::is_empty")]
    pub character_spells: Vec<serde_json::Value>,
    #[serde(default, alias = "includeCom")]
    pub include_com: bool,
    #[serde(default = "default_include_notes", alias = "includeNotes")]
    pub include_notes: bool,
}

const fn default_include_notes() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_camel_case_fields() {
        let character: Character = serde_json::from_value(json!({
            "name": "Gandalf",
            "characterType": "Wizard",
        }))
        .unwrap();

        assert_eq!(character.name, "Gandalf");
        assert_eq!(character.character_type, "Wizard");
        assert!(character.include_notes);
        assert!(!character.include_com);
    }

    #[test]
    fn test_accepts_full_sheet_payload() {
        let character: Character = serde_json::from_value(json!({
            "name": "Mirelle",
            "character_type": "Priest",
            "race": "Half-Elf",
            "abilities": {"str": 9, "dex": 14, "con": 11, "int": 13, "wis": 17, "cha": 12, "com": 10},
            "classes": [{"class_name": "Cleric", "class_label": "Cleric of Dawn", "level": 7}],
            "character_spells": [{"name": "Bless", "level": 1, "class_name": "Cleric"}],
            "include_com": true,
        }))
        .unwrap();

        assert_eq!(character.abilities.unwrap().wisdom, Some(17));
        assert_eq!(character.classes[0].class_name, "Cleric");
        assert_eq!(character.character_spells.len(), 1);
        assert!(character.include_com);
    }
}
