//! Loose natural-language query adapter.
//!
//! A thin, pattern-based translation of a handful of common phrasings into
//! a structured [`Query`]. No language model and no grammar: entity keywords,
//! date phrases, and leftover words become a contains filter. Placeholder
//! grade by design; programmatic callers should send structured queries.

use serde_json::json;

use super::{FilterClause, FilterOp, Query, DEFAULT_LIMIT};
use crate::store::types::EntityKind;

/// Entity keyword table, first match wins.
const ENTITY_KEYWORDS: &[(&str, EntityKind)] = &[
    ("work session", EntityKind::WorkSession),
    ("time entr", EntityKind::WorkSession),
    ("hours", EntityKind::WorkSession),
    ("worked", EntityKind::WorkSession),
    ("meeting", EntityKind::Meeting),
    ("call", EntityKind::Meeting),
    ("people", EntityKind::Person),
    ("person", EntityKind::Person),
    ("contact", EntityKind::Person),
    ("client", EntityKind::Client),
    ("project", EntityKind::Project),
    ("employer", EntityKind::Employer),
    ("note", EntityKind::Note),
    ("reminder", EntityKind::Reminder),
    ("todo", EntityKind::Reminder),
];

/// Date phrase → shortcut token over the entity's primary date field.
const DATE_PHRASES: &[(&str, &str)] = &[
    ("today", "today"),
    ("this week", "this_week"),
    ("this month", "this_month"),
    ("this year", "this_year"),
];

/// Words stripped before the leftover text becomes a search term.
const FILLER: &[&str] = &[
    "show", "me", "find", "search", "get", "list", "what", "how", "many", "all", "my", "the", "a",
    "an", "i", "did", "do", "for", "from", "in", "on", "at", "to", "about", "with",
];

/// Translate loose text into a structured query.
pub fn parse(text: &str) -> Query {
    let lower = text.to_lowercase();

    let entity_type = ENTITY_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(EntityKind::WorkSession);

    let mut filters = Vec::new();

    if let Some((_, token)) = DATE_PHRASES.iter().find(|(phrase, _)| lower.contains(phrase)) {
        filters.push(FilterClause {
            field: date_field(entity_type).to_string(),
            operator: FilterOp::Gte,
            value: json!(token),
        });
    }

    if let Some(term) = leftover_term(&lower) {
        filters.push(FilterClause {
            field: text_field(entity_type).to_string(),
            operator: FilterOp::Contains,
            value: json!(term),
        });
    }

    Query {
        entity_type,
        filters,
        aggregation: None,
        limit: DEFAULT_LIMIT,
        offset: 0,
        order_by: None,
    }
}

/// The field a date phrase constrains for each entity.
fn date_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::WorkSession => "date",
        EntityKind::Meeting => "start_time",
        EntityKind::Reminder => "reminder_time",
        _ => "created_at",
    }
}

/// The primary text field searched for each entity.
fn text_field(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::WorkSession => "summary",
        EntityKind::Meeting => "title",
        EntityKind::Person => "full_name",
        EntityKind::Client | EntityKind::Project | EntityKind::Employer => "name",
        EntityKind::Note => "text",
        EntityKind::Reminder => "message",
    }
}

/// Strip entity keywords, date phrases, and filler; whatever survives is the
/// search term.
fn leftover_term(lower: &str) -> Option<String> {
    let mut text = lower.to_string();
    for (keyword, _) in ENTITY_KEYWORDS {
        text = text.replace(keyword, " ");
    }
    for (phrase, _) in DATE_PHRASES {
        text = text.replace(phrase, " ");
    }

    // Single letters are keyword-stripping debris ("notes" → "s"), drop them.
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1 && !FILLER.contains(w))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_keyword_picks_the_base_entity() {
        assert_eq!(parse("show me my meetings").entity_type, EntityKind::Meeting);
        assert_eq!(parse("list clients").entity_type, EntityKind::Client);
        assert_eq!(parse("reminders").entity_type, EntityKind::Reminder);
        // default when nothing matches
        assert_eq!(parse("everything").entity_type, EntityKind::WorkSession);
    }

    #[test]
    fn date_phrase_becomes_a_gte_shortcut_filter() {
        let query = parse("work sessions this week");
        assert_eq!(query.entity_type, EntityKind::WorkSession);
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].field, "date");
        assert_eq!(query.filters[0].operator, FilterOp::Gte);
        assert_eq!(query.filters[0].value, json!("this_week"));
    }

    #[test]
    fn leftover_words_become_a_contains_filter() {
        let query = parse("find meetings about onboarding");
        let contains: Vec<_> = query
            .filters
            .iter()
            .filter(|f| f.operator == FilterOp::Contains)
            .collect();
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0].field, "title");
        assert_eq!(contains[0].value, json!("onboarding"));
    }

    #[test]
    fn parsed_queries_always_validate() {
        for text in [
            "show me work sessions this month",
            "meetings today",
            "clients",
            "notes about the migration",
            "reminders this week",
        ] {
            let query = parse(text);
            crate::query::validate(&query)
                .unwrap_or_else(|e| panic!("loose query for {text:?} invalid: {e}"));
        }
    }
}
