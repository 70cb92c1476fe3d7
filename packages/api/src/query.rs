//! # Row queries
//!
//! [`Query`] describes a filtered, ordered read (or the row selection of an
//! update/delete) against one remote collection. It is backend-neutral:
//!
//! - [`Query::to_params`] renders it as PostgREST query parameters for
//!   [`crate::SupabaseClient`] (`creator_id=eq.u1`, `id=in.("a","b")`,
//!   `order=created_at.desc`, `limit=1`).
//! - [`Query::apply`] evaluates it against JSON rows for
//!   [`crate::MemoryBackend`].
//!
//! ```
//! use api::query::{Direction, Query};
//!
//! let query = Query::table("groups")
//!     .eq("creator_id", "u1")
//!     .order("created_at", Direction::Desc)
//!     .limit(10);
//! assert_eq!(query.table_name(), "groups");
//! ```

use std::cmp::Ordering;

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(column) == Some(value),
            Filter::In(column, values) => row
                .get(column)
                .is_some_and(|field| values.iter().any(|v| v == field)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    table: String,
    filters: Vec<Filter>,
    order: Vec<(String, Direction)>,
    limit: Option<usize>,
}

impl Query {
    /// Start a query against a collection.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.into(), value.into()));
        self
    }

    pub fn in_list<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In(
            column.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// PostgREST query parameters, `select=*` first.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(self.filter_params());

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, direction)| match direction {
                    Direction::Asc => format!("{column}.asc"),
                    Direction::Desc => format!("{column}.desc"),
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Only the row-selecting parameters (for PATCH and DELETE).
    pub fn filter_params(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|filter| match filter {
                Filter::Eq(column, value) => (column.clone(), format!("eq.{}", plain(value))),
                Filter::In(column, values) => {
                    let list = values.iter().map(quoted).collect::<Vec<_>>().join(",");
                    (column.clone(), format!("in.({list})"))
                }
            })
            .collect()
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Filter, sort and limit a set of rows.
    pub fn apply<'a>(&self, rows: impl IntoIterator<Item = &'a Value>) -> Vec<Value> {
        let mut selected: Vec<Value> = rows
            .into_iter()
            .filter(|row| self.matches(row))
            .cloned()
            .collect();

        if !self.order.is_empty() {
            selected.sort_by(|a, b| {
                self.order
                    .iter()
                    .map(|(column, direction)| {
                        let ordering = compare(a.get(column), b.get(column));
                        match direction {
                            Direction::Asc => ordering,
                            Direction::Desc => ordering.reverse(),
                        }
                    })
                    .find(|ordering| *ordering != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
