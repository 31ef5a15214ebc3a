//! Query, sort, and update specifications.

use crate::document::Document;
use crate::error::{StorageError, StorageResult};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A condition on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Field equals the value. `Eq(Null)` also matches a missing field.
    Eq(Value),
    /// Field does not equal the value.
    Ne(Value),
    /// Field equals one of the values.
    In(Vec<Value>),
    /// Field is greater than the value (same type bracket only).
    Gt(Value),
    /// Field is greater than or equal to the value.
    Gte(Value),
    /// Field is less than the value.
    Lt(Value),
    /// Field is less than or equal to the value.
    Lte(Value),
    /// Field is present (`true`) or absent (`false`).
    Exists(bool),
}

impl Condition {
    /// Evaluates the condition against a field value (`None` if missing).
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => equals(actual, expected),
            Condition::Ne(expected) => !equals(actual, expected),
            Condition::In(options) => options.iter().any(|o| equals(actual, o)),
            Condition::Gt(bound) => compare(actual, bound, |o| o == Ordering::Greater),
            Condition::Gte(bound) => compare(actual, bound, |o| o != Ordering::Less),
            Condition::Lt(bound) => compare(actual, bound, |o| o == Ordering::Less),
            Condition::Lte(bound) => compare(actual, bound, |o| o != Ordering::Greater),
            Condition::Exists(present) => actual.is_some() == *present,
        }
    }
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(value) => value == expected,
        None => expected.is_null(),
    }
}

fn compare(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    actual.is_some_and(|value| value.same_kind(bound) && accept(value.cmp(bound)))
}

/// A conjunction of field conditions.
///
/// Field names may be dotted paths into nested text-keyed maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: BTreeMap<String, Vec<Condition>>,
}

impl Filter {
    /// Creates a filter that matches every document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition on a field.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.clauses.entry(field.into()).or_default().push(condition);
        self
    }

    /// Adds an equality condition.
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Eq(value.into()))
    }

    /// Adds an inequality condition.
    #[must_use]
    pub fn ne(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Ne(value.into()))
    }

    /// Adds a membership condition.
    #[must_use]
    pub fn is_in<V: Into<Value>>(
        self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.with(
            field,
            Condition::In(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Adds a strict lower bound.
    #[must_use]
    pub fn gt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gt(value.into()))
    }

    /// Adds an inclusive lower bound.
    #[must_use]
    pub fn gte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Gte(value.into()))
    }

    /// Adds a strict upper bound.
    #[must_use]
    pub fn lt(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lt(value.into()))
    }

    /// Adds an inclusive upper bound.
    #[must_use]
    pub fn lte(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Lte(value.into()))
    }

    /// Adds a presence condition.
    #[must_use]
    pub fn exists(self, field: impl Into<String>, present: bool) -> Self {
        self.with(field, Condition::Exists(present))
    }

    /// Lays `baseline` over this filter.
    ///
    /// Every field constrained by `baseline` loses the conditions this
    /// filter had on it, so the baseline can never be widened.
    #[must_use]
    pub fn overlay(mut self, baseline: Filter) -> Self {
        for (field, conditions) in baseline.clauses {
            self.clauses.insert(field, conditions);
        }
        self
    }

    /// Returns true if the document satisfies every condition.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|(field, conditions)| {
            let actual = doc.get_path(field);
            conditions.iter().all(|c| c.matches(actual))
        })
    }

    /// Returns the conditions on a field.
    pub fn conditions(&self, field: &str) -> Option<&[Condition]> {
        self.clauses.get(field).map(Vec::as_slice)
    }

    /// Returns the value a field is pinned to by an equality condition.
    pub fn equality(&self, field: &str) -> Option<&Value> {
        self.conditions(field)?.iter().find_map(|c| match c {
            Condition::Eq(v) => Some(v),
            _ => None,
        })
    }

    /// Returns true if every document matching this filter also matches
    /// `other`, judged by equality conditions only.
    pub fn implies(&self, other: &Filter) -> bool {
        other.clauses.iter().all(|(field, conditions)| {
            conditions.iter().all(|c| match c {
                Condition::Eq(expected) => self.equality(field) == Some(expected),
                _ => false,
            })
        })
    }

    /// Constrained field names.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.clauses.keys().map(String::as_str)
    }

    /// Returns true if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Rejects empty field names and empty path segments.
    pub fn validate(&self) -> StorageResult<()> {
        for field in self.clauses.keys() {
            validate_path(field)?;
        }
        Ok(())
    }
}

fn validate_path(path: &str) -> StorageResult<()> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(StorageError::invalid_query(format!(
            "malformed field path {path:?}"
        )));
    }
    Ok(())
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// An ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort(Vec<(String, SortOrder)>);

impl Sort {
    /// Sorts by a single field, ascending.
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self(vec![(field.into(), SortOrder::Ascending)])
    }

    /// Sorts by a single field, descending.
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self(vec![(field.into(), SortOrder::Descending)])
    }

    /// Adds a tie-breaking key.
    #[must_use]
    pub fn then(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.0.push((field.into(), order));
        self
    }

    /// The sort keys in priority order.
    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.0
    }

    /// Returns true if there are no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compares two documents. Missing fields sort as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in &self.0 {
            let left = a.get_path(field).unwrap_or(&Value::Null);
            let right = b.get_path(field).unwrap_or(&Value::Null);
            let ord = match order {
                SortOrder::Ascending => left.cmp(right),
                SortOrder::Descending => right.cmp(left),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Rejects malformed field paths.
    pub fn validate(&self) -> StorageResult<()> {
        for (field, _) in &self.0 {
            validate_path(field)?;
        }
        Ok(())
    }
}

/// Field assignments applied by a multi-document update.
///
/// Only top-level fields can be assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Update {
    set: Vec<(String, Value)>,
}

impl Update {
    /// Creates an update assigning one field.
    #[must_use]
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(field, value)
    }

    /// Adds another assignment.
    #[must_use]
    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set.push((field.into(), value.into()));
        self
    }

    /// The assignments in order.
    pub fn assignments(&self) -> &[(String, Value)] {
        &self.set
    }

    /// Applies the assignments to a document. Returns true if anything changed.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.set {
            if doc.get(field) != Some(value) {
                doc.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// Rejects empty updates and dotted field names.
    pub fn validate(&self) -> StorageResult<()> {
        if self.set.is_empty() {
            return Err(StorageError::invalid_query("update has no assignments"));
        }
        for (field, _) in &self.set {
            if field.is_empty() || field.contains('.') {
                return Err(StorageError::invalid_query(format!(
                    "cannot assign field {field:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Options for a find operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Fields to return (plus `_id`); `None` returns whole documents.
    pub projection: Option<Vec<String>>,
    /// Result order; `None` keeps insertion order.
    pub sort: Option<Sort>,
    /// Number of matching documents to skip.
    pub skip: u64,
    /// Maximum number of documents to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the projection.
    #[must_use]
    pub fn projection<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the sort.
    #[must_use]
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Sets the skip count.
    #[must_use]
    pub const fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
