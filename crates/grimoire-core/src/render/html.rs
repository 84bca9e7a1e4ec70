use serde_json::Value;

use super::{
    escape_html, escape_html_multiline, RecordView, RenderMode, RenderRequest, SpellLayout,
};
use crate::character::{Character, CharacterAbilities};

// Markup structure is the contract here; the stylesheet is non-normative.
const STYLE: &str = "\
body { font-family: Georgia, serif; margin: 2rem auto; max-width: 48rem; color: #1a1a1a; }
h1 { border-bottom: 2px solid #444; padding-bottom: 0.3rem; }
h2 { margin-top: 1.5rem; }
.owner { font-style: italic; color: #555; }
.subtitle { color: #555; }
.pill { background: #eee; border: 1px solid #999; border-radius: 1em; padding: 0.1em 0.8em; font-size: 0.9em; }
.meta { color: #333; font-size: 0.95em; }
.status { color: #666; font-variant: small-caps; }
table { border-collapse: collapse; margin: 0.75rem 0; }
th, td { border: 1px solid #bbb; padding: 0.25rem 0.6rem; text-align: left; }
th { background: #f2f2f2; }";

const FIELD_ROWS: [(&str, &str); 11] = [
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

const META_FIELDS: [(&str, &str); 6] = [
    ("Range", "range"),
    ("Casting Time", "casting_time"),
    ("Duration", "duration"),
    ("Components", "components"),
    ("Saving Throw", "saving_throw"),
    ("Area", "area"),
];

/// Render a complete HTML document for the requested mode.
#[must_use]
pub fn render_document(request: &RenderRequest) -> String {
    let records = request.effective_records();
    let mut body = String::new();
    match request.mode {
        RenderMode::Single => render_single(&mut body, records, request.layout),
        RenderMode::List => render_list(&mut body, records, request.layout),
        RenderMode::Spellbook => render_spellbook(&mut body, records, request),
        RenderMode::CharacterSheet => render_character_sheet(&mut body, records, request),
        RenderMode::SpellbookPack => render_pack(&mut body, records, request),
    }
    page(&document_title(request, records), &body)
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{STYLE}\n</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape_html(title)
    )
}

fn document_title(request: &RenderRequest, records: &[Value]) -> String {
    match request.mode {
        RenderMode::Single => records
            .first()
            .map_or_else(|| "Spell".to_string(), |r| RecordView::new(r).name()),
        RenderMode::List => "Spell List".to_string(),
        RenderMode::Spellbook => spellbook_title(request.character),
        RenderMode::CharacterSheet => request
            .character
            .map(|c| c.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Character Sheet".to_string()),
        RenderMode::SpellbookPack => {
            format!("{} Spellbook", request.class_name.unwrap_or("Class"))
        }
    }
}

fn spellbook_title(character: Option<&Character>) -> String {
    character
        .map(|c| c.character_type.trim().to_string())
        .filter(|t| !t.is_empty())
        .map_or_else(|| "Spellbook".to_string(), |t| format!("{t} Spellbook"))
}

fn render_single(out: &mut String, records: &[Value], layout: SpellLayout) {
    if let Some(record) = records.first() {
        let view = RecordView::new(record);
        out.push_str(&format!("<h1>{}</h1>\n", escape_html(&view.name())));
        spell_body(out, &view, layout);
    }
}

fn render_list(out: &mut String, records: &[Value], layout: SpellLayout) {
    for record in records {
        let view = RecordView::new(record);
        out.push_str("<section class=\"spell\">\n");
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(&view.name())));
        spell_body(out, &view, layout);
        out.push_str("</section>\n");
    }
}

fn render_spellbook(out: &mut String, records: &[Value], request: &RenderRequest) {
    out.push_str(&format!(
        "<h1>{}</h1>\n",
        escape_html(&spellbook_title(request.character))
    ));
    if let Some(character) = request.character {
        if !character.name.trim().is_empty() {
            out.push_str(&format!(
                "<p class=\"owner\">{}</p>\n",
                escape_html(&character.name)
            ));
        }
    }
    for record in records {
        let view = RecordView::new(record);
        out.push_str("<section class=\"spell\">\n");
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(&view.name())));
        if let Some(status) = status_line(&view) {
            out.push_str(&format!("<p class=\"status\">{status}</p>\n"));
        }
        spell_body(out, &view, request.layout);
        out.push_str("</section>\n");
    }
}

fn render_character_sheet(out: &mut String, records: &[Value], request: &RenderRequest) {
    let Some(character) = request.character else {
        render_list(out, records, request.layout);
        return;
    };

    out.push_str(&format!("<h1>{}</h1>\n", escape_html(&character.name)));
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
        out.push_str(&format!(
            "<p class=\"subtitle\">{}</p>\n",
            escape_html(&subtitle.join(" / "))
        ));
    }

    if let Some(abilities) = &character.abilities {
        abilities_table(out, abilities, character.include_com);
    }

    for (class_name, group) in group_by_class(records) {
        let label = character
            .classes
            .iter()
            .find(|c| c.class_name == class_name)
            .and_then(|c| c.class_label.clone())
            .unwrap_or(class_name);
        out.push_str(&format!("<h2>{} Spells</h2>\n", escape_html(&label)));
        class_spell_table(out, &group, character.include_notes);
    }

    if character.include_notes {
        if let Some(notes) = character.notes.as_deref().filter(|n| !n.trim().is_empty()) {
            out.push_str("<h2>Notes</h2>\n");
            out.push_str(&format!("<p>{}</p>\n", escape_html_multiline(notes)));
        }
    }
}

fn render_pack(out: &mut String, records: &[Value], request: &RenderRequest) {
    out.push_str(&format!(
        "<h1>{} Spellbook</h1>\n",
        escape_html(request.class_name.unwrap_or("Class"))
    ));
    if let Some(character) = request.character {
        if !character.name.trim().is_empty() {
            out.push_str(&format!(
                "<p class=\"owner\">{}</p>\n",
                escape_html(&character.name)
            ));
        }
    }
    for record in records {
        let view = RecordView::new(record);
        if !in_class_scope(&view, request.class_name) {
            continue;
        }
        out.push_str("<section class=\"spell\">\n");
        out.push_str(&format!("<h2>{}</h2>\n", escape_html(&view.name())));
        if let Some(status) = status_line(&view) {
            out.push_str(&format!("<p class=\"status\">{status}</p>\n"));
        }
        spell_body(out, &view, request.layout);
        out.push_str("</section>\n");
    }
}

/// Records already scoped by the caller pass through; a record that names a
/// different class is left out of the pack.
fn in_class_scope(view: &RecordView, class_name: Option<&str>) -> bool {
    match (view.text("class_name"), class_name) {
        (Some(record_class), Some(wanted)) => record_class == wanted,
        _ => true,
    }
}

fn spell_body(out: &mut String, view: &RecordView, layout: SpellLayout) {
    match layout {
        SpellLayout::Compact => compact_block(out, view),
        SpellLayout::Full => full_table(out, view),
    }
    let description = view.description();
    if !description.is_empty() {
        out.push_str(&format!(
            "<p class=\"description\">{}</p>\n",
            escape_html_multiline(&description)
        ));
    }
}

fn compact_block(out: &mut String, view: &RecordView) {
    let level = view.level();
    let pill = view.text("school").map_or_else(
        || format!("Level {level}"),
        |school| format!("{school} · Level {level}"),
    );
    out.push_str(&format!(
        "<p><span class=\"pill\">{}</span></p>\n",
        escape_html(&pill)
    ));

    let meta: Vec<String> = META_FIELDS
        .iter()
        .filter_map(|(label, field)| {
            view.text(field)
                .map(|value| format!("{label}: {}", escape_html(&value)))
        })
        .collect();
    if !meta.is_empty() {
        out.push_str(&format!("<p class=\"meta\">{}</p>\n", meta.join(" | ")));
    }
}

fn full_table(out: &mut String, view: &RecordView) {
    out.push_str("<table class=\"spell-fields\">\n");
    out.push_str(&format!(
        "<tr><th>Level</th><td>{}</td></tr>\n",
        view.level()
    ));
    for (label, field) in FIELD_ROWS {
        if let Some(value) = view.text(field) {
            out.push_str(&format!(
                "<tr><th>{label}</th><td>{}</td></tr>\n",
                escape_html(&value)
            ));
        }
    }
    out.push_str("</table>\n");
}

fn status_line(view: &RecordView) -> Option<String> {
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
        Some(parts.join(" · "))
    }
}

fn abilities_table(out: &mut String, abilities: &CharacterAbilities, include_com: bool) {
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

    out.push_str("<table class=\"abilities\">\n<tr>");
    for (label, _) in &columns {
        out.push_str(&format!("<th>{label}</th>"));
    }
    out.push_str("</tr>\n<tr>");
    for (_, score) in &columns {
        let cell = score.map(|s| s.to_string()).unwrap_or_default();
        out.push_str(&format!("<td>{cell}</td>"));
    }
    out.push_str("</tr>\n</table>\n");
}

fn class_spell_table(out: &mut String, records: &[&Value], include_notes: bool) {
    out.push_str("<table class=\"spell-table\">\n<tr><th>Lvl</th><th>Name</th><th>School</th><th>Range</th><th>Components</th><th>Duration</th><th>Saving Throw</th><th>Status</th>");
    if include_notes {
        out.push_str("<th>Notes</th>");
    }
    out.push_str("</tr>\n");

    for record in records {
        let view = RecordView::new(record);
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td>",
            view.level(),
            escape_html(&view.name())
        ));
        for field in ["school", "range", "components", "duration", "saving_throw"] {
            let cell = view.text(field).unwrap_or_default();
            out.push_str(&format!("<td>{}</td>", escape_html(&cell)));
        }
        out.push_str(&format!(
            "<td>{}</td>",
            status_line(&view).unwrap_or_default()
        ));
        if include_notes {
            let notes = view.text("notes").unwrap_or_default();
            out.push_str(&format!("<td>{}</td>", escape_html(&notes)));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
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
