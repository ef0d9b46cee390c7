//! Patient search input and its translation into store queries.

use serde::{Deserialize, Serialize};

use crate::models::Patient;
use crate::store::{Filter, Order, Query};

/// Structured filter slots on the patient list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// First or last name
    Name,
    /// Identity document number
    DocumentNumber,
    /// Affiliation organization
    SocialWork,
    AffiliationNumber,
}

/// Structured filters; empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientFilters {
    pub name: String,
    pub document_number: String,
    pub social_work: String,
    pub affiliation_number: String,
}

impl PatientFilters {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Name => &self.name,
            FilterField::DocumentNumber => &self.document_number,
            FilterField::SocialWork => &self.social_work,
            FilterField::AffiliationNumber => &self.affiliation_number,
        }
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let slot = match field {
            FilterField::Name => &mut self.name,
            FilterField::DocumentNumber => &mut self.document_number,
            FilterField::SocialWork => &mut self.social_work,
            FilterField::AffiliationNumber => &mut self.affiliation_number,
        };
        *slot = value.into();
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.name,
            &self.document_number,
            &self.social_work,
            &self.affiliation_number,
        ]
        .iter()
        .all(|value| value.trim().is_empty())
    }
}

/// Free-text term plus structured filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchInput {
    pub term: String,
    pub filters: PatientFilters,
}

const TERM_FIELDS: [&str; 3] = ["first_name", "last_name", "document_number"];
const NAME_FIELDS: [&str; 2] = ["first_name", "last_name"];

impl SearchInput {
    pub fn term(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.filters.set(field, value);
        self
    }

    /// No term and no filter set: the plain paginated listing.
    pub fn is_empty(&self) -> bool {
        self.term.trim().is_empty() && self.filters.is_empty()
    }

    /// Store predicate for this input.
    ///
    /// Every whitespace token of the term must match first name, last name or
    /// document number; each structured filter adds another AND-ed substring
    /// constraint.
    pub fn to_filter(&self) -> Option<Filter> {
        let mut parts: Vec<Filter> = tokens(&self.term)
            .map(|token| any_field_contains(&TERM_FIELDS, token))
            .collect();

        parts.extend(tokens(&self.filters.name).map(|token| any_field_contains(&NAME_FIELDS, token)));

        for (field, value) in [
            ("document_number", &self.filters.document_number),
            ("social_work", &self.filters.social_work),
            ("affiliation_number", &self.filters.affiliation_number),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                parts.push(Filter::contains(field, value));
            }
        }

        Filter::all(parts)
    }

    /// Query for one page, ordered by name.
    pub fn page_query(&self, offset: usize, limit: usize) -> Query {
        Query::all()
            .filter(self.to_filter())
            .order_by(Order::asc("last_name"))
            .order_by(Order::asc("first_name"))
            .range(offset, limit)
    }

    /// Same predicate as [`SearchInput::to_filter`], evaluated locally.
    pub fn matches(&self, patient: &Patient) -> bool {
        let first = patient.first_name.as_str();
        let last = patient.last_name.as_str();
        let document = patient.document_number.as_str();

        let term_ok = tokens(&self.term)
            .all(|token| [first, last, document].iter().any(|field| contains(field, token)));
        let name_ok = tokens(&self.filters.name)
            .all(|token| [first, last].iter().any(|field| contains(field, token)));

        term_ok
            && name_ok
            && optional_contains(Some(document), &self.filters.document_number)
            && optional_contains(patient.social_work.as_deref(), &self.filters.social_work)
            && optional_contains(
                patient.affiliation_number.as_deref(),
                &self.filters.affiliation_number,
            )
    }
}

/// Whether rows remain after a page starting at `offset`.
pub fn has_more(offset: usize, page_size: usize, total_count: u64) -> bool {
    ((offset + page_size) as u64) < total_count
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

fn any_field_contains(fields: &[&str], token: &str) -> Filter {
    Filter::Or(
        fields
            .iter()
            .map(|field| Filter::contains(field, token))
            .collect(),
    )
}

/// Case-insensitive (ASCII, like the store's LIKE) substring test.
fn contains(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

fn optional_contains(field: Option<&str>, filter: &str) -> bool {
    let filter = filter.trim();
    filter.is_empty() || field.is_some_and(|value| contains(value, filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(first: &str, last: &str, doc: &str) -> Patient {
        Patient::new(first, last, doc)
    }

    #[test]
    fn test_empty_input_lists_everything() {
        let input = SearchInput::term("   ");
        assert!(input.is_empty());
        assert!(input.to_filter().is_none());
        assert!(input.matches(&patient("Ana", "Gomez", "1")));
    }

    #[test]
    fn test_tokens_are_anded_fields_ored() {
        let input = SearchInput::term("ana gom");
        let expected = Filter::And(vec![
            Filter::Or(vec![
                Filter::contains("first_name", "ana"),
                Filter::contains("last_name", "ana"),
                Filter::contains("document_number", "ana"),
            ]),
            Filter::Or(vec![
                Filter::contains("first_name", "gom"),
                Filter::contains("last_name", "gom"),
                Filter::contains("document_number", "gom"),
            ]),
        ]);
        assert_eq!(input.to_filter(), Some(expected));

        assert!(input.matches(&patient("Ana", "Gomez", "1")));
        assert!(!input.matches(&patient("Ana", "Diaz", "1")));
    }

    #[test]
    fn test_single_token_matches_document() {
        let input = SearchInput::term("3011");
        assert!(input.matches(&patient("Ana", "Gomez", "30111222")));
    }

    #[test]
    fn test_structured_filters_constrain_independently() {
        let input = SearchInput::default()
            .with_filter(FilterField::SocialWork, "osde")
            .with_filter(FilterField::Name, "gomez");

        let with_osde = patient("Ana", "Gomez", "1").with_affiliation("OSDE", "99");
        let without = patient("Ana", "Gomez", "1");
        let other_name = patient("Ana", "Diaz", "1").with_affiliation("OSDE", "99");

        assert!(input.matches(&with_osde));
        assert!(!input.matches(&without));
        assert!(!input.matches(&other_name));
    }

    #[test]
    fn test_page_query_orders_by_name() {
        let query = SearchInput::default().page_query(200, 100);
        assert_eq!(query.order[0], Order::asc("last_name"));
        assert_eq!(query.order[1], Order::asc("first_name"));
        assert_eq!(query.range.unwrap().offset, 200);
    }

    #[test]
    fn test_has_more() {
        assert!(has_more(0, 100, 250));
        assert!(has_more(100, 100, 250));
        assert!(!has_more(200, 100, 250));
        assert!(!has_more(0, 100, 100));
        assert!(!has_more(0, 100, 0));
    }
}
