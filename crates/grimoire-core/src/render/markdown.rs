use serde_json::Value;

use super::{RecordView, RenderMode, RenderRequest, SpellLayout};
use crate::character::{Character, CharacterAbilities};

const DETAIL_FIELDS: [(&str, &str); 11] = [
    ("School", "school"),
    ("Sphere", "sphere"),
    ("Classes", "class_list"),
    ("Range", "range"),
    ("Components", "components"),
    ("Material Components", "material_components"),
    ("Casting Time", "casting_time"),
    ("Duration", "duration"),
    ("Area", "area"),
    ("Saving Throw", "saving_throw"),
    ("Source", "source"),
];

/// Render markdown for the requested mode. Every record's name renders as a
/// level-1 heading immediately followed by its description; structured
/// details trail the prose. Newlines in free text are preserved literally.
#[must_use]
pub fn render(request: &RenderRequest) -> String {
    let records = request.effective_records();
    let mut out = String::new();
    match request.mode {
        RenderMode::Single => {
            if let Some(record) = records.first() {
                spell_markdown(&mut out, &RecordView::new(record), request.layout);
            }
        }
        RenderMode::List => {
            for record in records {
                spell_markdown(&mut out, &RecordView::new(record), request.layout);
            }
        }
        RenderMode::Spellbook => {
            if let Some(character) = request.character {
                book_header(&mut out, character);
            }
            for record in records {
                spell_markdown(&mut out, &RecordView::new(record), request.layout);
            }
        }
        RenderMode::CharacterSheet => render_character_sheet(&mut out, records, request),
        RenderMode::SpellbookPack => {
            out.push_str(&format!(
                "# {} Spellbook\n\n",
                request.class_name.unwrap_or("Class")
            ));
            if let Some(character) = request.character {
                if !character.name.trim().is_empty() {
                    out.push_str(&format!("{}\n\n", character.name));
                }
            }
            for record in records {
                let view = RecordView::new(record);
                if in_class_scope(&view, request.class_name) {
                    spell_markdown(&mut out, &view, request.layout);
                }
            }
        }
    }
    out
}

fn in_class_scope(view: &RecordView, class_name: Option<&str>) -> bool {
    match (view.text("class_name"), class_name) {
        (Some(record_class), Some(wanted)) => record_class == wanted,
        _ => true,
    }
}

fn book_header(out: &mut String, character: &Character) {
    let character_type = character.character_type.trim();
    if character_type.is_empty() {
        out.push_str("# Spellbook\n\n");
    } else {
        out.push_str(&format!("# {character_type} Spellbook\n\n"));
    }
    if !character.name.trim().is_empty() {
        out.push_str(&format!("{}\n\n", character.name));
    }
}

fn spell_markdown(out: &mut String, view: &RecordView, layout: SpellLayout) {
    out.push_str(&format!("# {}\n\n", view.name()));

    let description = view.description();
    if !description.is_empty() {
        out.push_str(&description);
        out.push_str("\n\n");
    }

    if let Some(status) = status_text(view) {
        out.push_str(&format!("*{status}*\n\n"));
    }

    match layout {
        SpellLayout::Compact => {
            let mut parts = Vec::new();
            let level = view.level();
            parts.push(view.text("school").map_or_else(
                || format!("Level {level}"),
                |school| format!("{school} · Level {level}"),
            ));
            for (label, field) in [
                ("Range", "range"),
                ("Casting Time", "casting_time"),
                ("Duration", "duration"),
                ("Components", "components"),
                ("Saving Throw", "saving_throw"),
            ] {
                if let Some(value) = view.text(field) {
                    parts.push(format!("{label}: {value}"));
                }
            }
            out.push_str(&format!("{}\n\n", parts.join(" | ")));
        }
        SpellLayout::Full => {
            out.push_str(&format!("- **Level:** {}\n", view.level()));
            for (label, field) in DETAIL_FIELDS {
                if let Some(value) = view.text(field) {
                    out.push_str(&format!("- **{label}:** {value}\n"));
                }
            }
            out.push('\n');
        }
    }
}

fn status_text(view: &RecordView) -> Option<String> {
    let mut parts = Vec::new();
    if view.flag("prepared") {
        parts.push("Prepared");
    }
    if view.flag("known") {
        parts.push("Known");
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn render_character_sheet(out: &mut String, records: &[Value], request: &RenderRequest) {
    let Some(character) = request.character else {
        for record in records {
            spell_markdown(out, &RecordView::new(record), request.layout);
        }
        return;
    };

    out.push_str(&format!("# {}\n\n", character.name));
    let subtitle: Vec<&str> = [
        Some(character.character_type.as_str()),
        character.race.as_deref(),
        character.alignment.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.trim().is_empty())
    .collect();
    if !subtitle.is_empty() {
        out.push_str(&format!("{}\n\n", subtitle.join(" / ")));
    }

    if let Some(abilities) = &character.abilities {
        abilities_markdown(out, abilities, character.include_com);
    }

    for (class_name, group) in group_by_class(records) {
        let label = character
            .classes
            .iter()
            .find(|c| c.class_name == class_name)
            .and_then(|c| c.class_label.clone())
            .unwrap_or(class_name);
        out.push_str(&format!("## {label} Spells\n\n"));
        class_table_markdown(out, &group, character.include_notes);
    }

    if character.include_notes {
        if let Some(notes) = character.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            out.push_str("## Notes\n\n");
            out.push_str(notes);
            out.push_str("\n\n");
        }
    }
}

fn abilities_markdown(out: &mut String, abilities: &CharacterAbilities, include_com: bool) {
    let mut columns: Vec<(&str, Option<i64>)> = vec![
        ("STR", abilities.strength),
        ("DEX", abilities.dexterity),
        ("CON", abilities.constitution),
        ("INT", abilities.intelligence),
        ("WIS", abilities.wisdom),
        ("CHA", abilities.charisma),
    ];
    if include_com {
        columns.push(("COM", abilities.comeliness));
    }

    let headers: Vec<&str> = columns.iter().map(|(label, _)| *label).collect();
    out.push_str(&format!("| {} |\n", headers.join(" | ")));
    out.push_str(&format!("|{}\n", " --- |".repeat(columns.len())));
    let cells: Vec<String> = columns
        .iter()
        .map(|(_, score)| score.map(|s| s.to_string()).unwrap_or_default())
        .collect();
    out.push_str(&format!("| {} |\n\n", cells.join(" | ")));
}

fn class_table_markdown(out: &mut String, records: &[&Value], include_notes: bool) {
    let mut header = String::from(
        "| Lvl | Name | School | Range | Components | Duration | Saving Throw | Status |",
    );
    let mut columns = 8;
    if include_notes {
        header.push_str(" Notes |");
        columns += 1;
    }
    out.push_str(&format!("{header}\n"));
    out.push_str(&format!("|{}\n", " --- |".repeat(columns)));

    for record in records {
        let view = RecordView::new(record);
        let mut cells = vec![view.level().to_string(), view.name()];
        for field in ["school", "range", "components", "duration", "saving_throw"] {
            cells.push(view.text(field).unwrap_or_default());
        }
        cells.push(status_text(&view).unwrap_or_default());
        if include_notes {
            cells.push(view.text("notes").unwrap_or_default());
        }
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out.push('\n');
}

fn group_by_class<'a>(records: &'a [Value]) -> Vec<(String, Vec<&'a Value>)> {
    let mut groups: Vec<(String, Vec<&Value>)> = Vec::new();
    for record in records {
        let class = RecordView::new(record)
            .text("class_name")
            .unwrap_or_else(|| "General".to_string());
        match groups.iter_mut().find(|(name, _)| *name == class) {
            Some((_, items)) => items.push(record),
            None => groups.push((class, vec![record])),
        }
    }
    groups
}
