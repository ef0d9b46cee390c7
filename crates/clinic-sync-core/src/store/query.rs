//! Filter grammar understood by the remote store.

use serde_json::Value;

use super::Row;

/// A row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Exact equality.
    Eq { field: String, value: Value },
    /// Case-insensitive substring match.
    Contains { field: String, needle: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn contains(field: &str, needle: impl Into<String>) -> Self {
        Filter::Contains {
            field: field.to_string(),
            needle: needle.into(),
        }
    }

    /// AND of the given filters, collapsing trivial cases.
    pub fn all(mut filters: Vec<Filter>) -> Option<Filter> {
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        }
    }
}

/// Sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: true,
        }
    }
}

/// Offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: usize,
    pub limit: usize,
}

/// A complete query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Filter>,
    pub order: Vec<Order>,
    /// `None` returns every matching row
    pub range: Option<Range>,
}

impl Query {
    /// Every row, ordered by id.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Option<Filter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.range = Some(Range { offset, limit });
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub rows: Vec<Row>,
    /// Size of the whole filtered set, not just this page
    pub total_count: u64,
}
