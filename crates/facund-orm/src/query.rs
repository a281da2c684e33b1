//! Query representation and the chainable query set.
//!
//! [`SelectQuery`] (filters, ordering, limit) is the contract handed to the
//! storage boundary; backends interpret it however they like, and the
//! in-memory backend evaluates it right here. [`QuerySet`] wraps a
//! `SelectQuery` together with the model definition so named scopes can be
//! applied and chained with further conditions before execution.

use crate::model::ModelDef;
use crate::record::Attributes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Contains,
    StartsWith,
    EndsWith,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    List(Vec<FilterValue>),
}

impl FilterValue {
    /// Lifts a raw attribute value into a filter value.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => Self::String(s.clone()),
            other => Self::String(other.to_string()),
        }
    }

    fn as_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Null => Value::Null,
            Self::List(items) => Value::Array(items.iter().map(Self::as_value).collect()),
        }
    }

    fn equals(&self, stored: &Value) -> bool {
        loose_eq(stored, &self.as_value())
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for FilterValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for FilterValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<Vec<FilterValue>> for FilterValue {
    fn from(items: Vec<FilterValue>) -> Self {
        Self::List(items)
    }
}

/// A single predicate over one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluates the predicate against a raw row.
    pub fn matches(&self, row: &Attributes) -> bool {
        let stored = row.get(&self.field).unwrap_or(&Value::Null);
        match self.operator {
            FilterOperator::Eq => self.value.equals(stored),
            FilterOperator::Ne => !self.value.equals(stored),
            FilterOperator::Gt => {
                compare_values(stored, &self.value.as_value()) == Some(Ordering::Greater)
            }
            FilterOperator::Gte => matches!(
                compare_values(stored, &self.value.as_value()),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOperator::Lt => {
                compare_values(stored, &self.value.as_value()) == Some(Ordering::Less)
            }
            FilterOperator::Lte => matches!(
                compare_values(stored, &self.value.as_value()),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOperator::In => match &self.value {
                FilterValue::List(items) => items.iter().any(|item| item.equals(stored)),
                single => single.equals(stored),
            },
            FilterOperator::Contains => {
                string_pair(stored, &self.value).is_some_and(|(s, f)| s.contains(&f))
            }
            FilterOperator::StartsWith => {
                string_pair(stored, &self.value).is_some_and(|(s, f)| s.starts_with(&f))
            }
            FilterOperator::EndsWith => {
                string_pair(stored, &self.value).is_some_and(|(s, f)| s.ends_with(&f))
            }
        }
    }
}

fn string_pair(stored: &Value, filter: &FilterValue) -> Option<(String, String)> {
    let stored = stored.as_str()?.to_string();
    match filter {
        FilterValue::String(f) => Some((stored, f.clone())),
        _ => None,
    }
}

/// Equality with numeric widening: `5` and `5.0` compare equal.
pub(crate) fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

/// The query contract handed across the storage boundary.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub filters: Vec<Filter>,
    pub order_by: Vec<(String, Direction)>,
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn matches(&self, row: &Attributes) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// In-process evaluation: filter, sort, truncate.
    pub fn apply(&self, mut rows: Vec<Attributes>) -> Vec<Attributes> {
        rows.retain(|row| self.matches(row));
        if !self.order_by.is_empty() {
            rows.sort_by(|a, b| {
                for (field, direction) in &self.order_by {
                    let left = a.get(field).unwrap_or(&Value::Null);
                    let right = b.get(field).unwrap_or(&Value::Null);
                    let ordering = compare_values(left, right).unwrap_or(Ordering::Equal);
                    let ordering = match direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        if let Some(limit) = self.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// A chainable query over one model.
///
/// Query sets are pure values: they accumulate conditions and are executed by
/// the [`Manager`](crate::manager::Manager) that created them.
#[derive(Debug, Clone)]
pub struct QuerySet {
    def: Arc<ModelDef>,
    query: SelectQuery,
}

impl QuerySet {
    pub(crate) fn new(def: Arc<ModelDef>) -> Self {
        Self {
            def,
            query: SelectQuery::default(),
        }
    }

    /// Adds a predicate.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use facund_orm::query::{FilterOperator, QuerySet};
    /// # fn chain(articles: QuerySet) -> QuerySet {
    /// articles
    ///     .filter("click_num", FilterOperator::Gte, 10)
    ///     .limit(5)
    /// # }
    /// ```
    pub fn filter(
        mut self,
        field: &str,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        self.query
            .filters
            .push(Filter::new(field, operator, value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.query.order_by.push((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Applies a named scope registered on the model and returns the
    /// transformed query set for further chaining.
    pub fn scope(self, name: &str) -> crate::error::Result<Self> {
        let scope = self
            .def
            .scopes
            .get(name)
            .cloned()
            .ok_or_else(|| crate::error::Error::UnknownScope {
                model: self.def.name.clone(),
                scope: name.to_string(),
            })?;
        Ok(scope(self))
    }

    pub fn def(&self) -> &Arc<ModelDef> {
        &self.def
    }

    pub fn select_query(&self) -> &SelectQuery {
        &self.query
    }

    pub fn into_select_query(self) -> SelectQuery {
        self.query
    }
}
