//! Identity of "the same recurring obligation" across periods.
//!
//! A natural key is the tuple (description, counterparty, category,
//! payment method). It is independent of primary keys, so a record entered
//! by hand for a bill still prevents that bill from being materialized again
//! in the same period.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::models::{ConcreteRecord, RecurrenceTemplate};

/// Separator for the canonical string form. Never appears in typed input.
const FIELD_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NaturalKey {
    pub description: String,
    pub counterparty: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
}

impl NaturalKey {
    pub fn new(
        description: &str,
        counterparty: Option<&str>,
        category: Option<&str>,
        payment_method: Option<&str>,
    ) -> Self {
        Self {
            description: description.trim().to_string(),
            counterparty: normalize(counterparty),
            category: normalize(category),
            payment_method: normalize(payment_method),
        }
    }

    pub fn from_template(template: &RecurrenceTemplate) -> Self {
        Self::new(
            &template.description,
            template.counterparty.as_deref(),
            template.category.as_deref(),
            template.payment_method.as_deref(),
        )
    }

    pub fn from_record(record: &ConcreteRecord) -> Self {
        Self::new(
            &record.description,
            record.counterparty.as_deref(),
            record.category.as_deref(),
            record.payment_method.as_deref(),
        )
    }

    /// The form stored in `records.natural_key` and covered by the unique index.
    pub fn canonical(&self) -> String {
        [
            self.description.as_str(),
            self.counterparty.as_deref().unwrap_or(""),
            self.category.as_deref().unwrap_or(""),
            self.payment_method.as_deref().unwrap_or(""),
        ]
        .join(&FIELD_SEPARATOR.to_string())
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)?;
        for field in [&self.counterparty, &self.category, &self.payment_method] {
            write!(f, " / {}", field.as_deref().unwrap_or("-"))?;
        }
        Ok(())
    }
}

// Empty and whitespace-only fields are the same as a missing field.
fn normalize(field: Option<&str>) -> Option<String> {
    field
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Keys already present in a period, by template id and by natural key.
#[derive(Debug, Default)]
pub struct KeyIndex {
    template_ids: HashSet<Uuid>,
    keys: HashSet<NaturalKey>,
}

impl KeyIndex {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ConcreteRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert_record(record);
        }
        index
    }

    pub fn insert_record(&mut self, record: &ConcreteRecord) {
        if let Some(template_id) = record.template_id {
            self.template_ids.insert(template_id);
        }
        self.keys.insert(NaturalKey::from_record(record));
    }

    /// Records the template as present, e.g. after planning a record for it.
    pub fn insert_template(&mut self, template: &RecurrenceTemplate) {
        self.template_ids.insert(template.id);
        self.keys.insert(NaturalKey::from_template(template));
    }

    /// True when the template's stable id or its descriptive tuple is present.
    pub fn contains_template(&self, template: &RecurrenceTemplate) -> bool {
        self.template_ids.contains(&template.id)
            || self.keys.contains(&NaturalKey::from_template(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_missing() {
        let a = NaturalKey::new("Rent", Some("  "), None, Some("transfer"));
        let b = NaturalKey::new(" Rent ", None, Some(""), Some("transfer "));
        assert_eq!(a, b);
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_field_positions_matter() {
        let a = NaturalKey::new("Gym", Some("Visa"), None, None);
        let b = NaturalKey::new("Gym", None, None, Some("Visa"));
        assert_ne!(a, b);
        assert_ne!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_key_index_matches_by_tuple_or_template_id() {
        let template = RecurrenceTemplate {
            description: "Rent".to_string(),
            counterparty: Some("Landlord".to_string()),
            ..Default::default()
        };

        let mut index = KeyIndex::default();
        assert!(!index.contains_template(&template));

        let renamed = RecurrenceTemplate {
            description: "Apartment rent".to_string(),
            ..template.clone()
        };
        index.insert_template(&template);
        assert!(index.contains_template(&template));
        // Renaming keeps identity through the template id.
        assert!(index.contains_template(&renamed));

        let lookalike = RecurrenceTemplate {
            id: Uuid::now_v7(),
            ..template.clone()
        };
        assert!(index.contains_template(&lookalike));
    }
}
