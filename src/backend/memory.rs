use crate::backend::traits::Backend;
use crate::backend::types::{Direction, Filter, ReadRequest};
use crate::error::BackendError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// In-process tables evaluated with the same filter semantics as the hosted backend
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    offline: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows into `table` as-is
    pub async fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        let mut tables = self.tables.write().await;
        tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Make every call fail as if the network were down
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    #[cfg(test)]
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    fn ensure_online(&self) -> Result<(), BackendError> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            warn!("Memory backend is offline");
            return Err(BackendError::Unreachable("backend is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn select(&self, request: &ReadRequest) -> Result<Vec<Value>, BackendError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;

        let mut rows: Vec<Value> = tables
            .get(&request.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &request.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &request.order {
            rows.sort_by(|a, b| {
                let ordering = compare(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = request.limit {
            rows.truncate(limit);
        }

        debug!("{} returned {} rows", request.table, rows.len());
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        self.ensure_online()?;

        let Value::Object(mut fields) = row else {
            return Err(BackendError::Rejected {
                status: 400,
                message: format!("insert into {table} expects an object"),
            });
        };
        fill_defaults(&mut fields);
        let stored = Value::Object(fields);

        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        self.ensure_online()?;

        let Value::Object(changes) = patch else {
            return Err(BackendError::Rejected {
                status: 400,
                message: format!("update of {table} expects an object"),
            });
        };

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        for row in tables.get_mut(table).into_iter().flatten() {
            if !matches_all(row, filters) {
                continue;
            }
            if let Value::Object(fields) = row {
                for (key, value) in &changes {
                    fields.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<usize, BackendError> {
        self.ensure_online()?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !matches_all(row, filters));
        Ok(before - rows.len())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

fn fill_defaults(fields: &mut Map<String, Value>) {
    fields
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    fields
        .entry("created_at")
        .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(row, filter))
}

fn matches(row: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Eq { column, value } => compare_eq(row.get(column), value),
        Filter::Gte { column, value } => row
            .get(column)
            .is_some_and(|cell| compare(Some(cell), Some(value)) != Ordering::Less),
        Filter::Lte { column, value } => row
            .get(column)
            .is_some_and(|cell| compare(Some(cell), Some(value)) != Ordering::Greater),
        Filter::In { column, values } => values.iter().any(|v| compare_eq(row.get(column), v)),
        Filter::ContainsAny { columns, term } => {
            let needle = term.to_lowercase();
            columns.iter().any(|column| {
                row.get(column)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        }
    }
}

fn compare_eq(cell: Option<&Value>, expected: &Value) -> bool {
    match (cell, expected) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(a), b) => a == b,
        (None, _) => false,
    }
}

/// Numbers compare numerically, timestamps as instants, other strings lexically.
/// Missing values sort first.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (parse_instant(a), parse_instant(b)) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
    }
}

fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
