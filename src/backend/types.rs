use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const LISTINGS_TABLE: &str = "properties";
pub const PROFILES_TABLE: &str = "profiles";
pub const FAVORITES_TABLE: &str = "favorites";

/// One column constraint of a request. Filters in a request are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    Eq { column: String, value: Value },
    /// Inclusive lower bound
    Gte { column: String, value: Value },
    /// Inclusive upper bound
    Lte { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// Case-insensitive substring match, ORed across `columns`
    ContainsAny { columns: Vec<String>, term: String },
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Gte {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lte {
            column: column.to_string(),
            value: value.into(),
        }
    }

    pub fn is_in<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains_any(columns: &[&str], term: &str) -> Self {
        Filter::ContainsAny {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            term: term.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    pub fn ascending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::Ascending,
        }
    }

    pub fn descending(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: Direction::Descending,
        }
    }
}

/// A read against one table: all columns, filtered, optionally sorted and capped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl ReadRequest {
    pub fn from_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
