//! # Filters
//!
//! A `Filter` is a SQL-free predicate over entity columns. Repositories pass
//! filters through untouched; each store translates them into its own query
//! language (the SQLite store renders a parameterized WHERE clause).
//!
//! ## Building Filters
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Filter::eq("category_id", id)                                         │
//! │      .and(Filter::ge("amount_cents", 1_000))                           │
//! │      .and(Filter::is_null("note").negate())                            │
//! │                                                                         │
//! │                         And                                             │
//! │             ┌────────────┼─────────────┐                                │
//! │      category_id = ?   amount_cents >= ?   NOT (note IS NULL)           │
//! │                                                                         │
//! │  Nested `and` calls flatten into a single And node.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Edge Cases
//! - `And` with no children matches everything, `Or` with no children
//!   matches nothing.
//! - `In` with an empty list matches nothing.
//! - Comparing with `Value::Null` is the store's concern; the SQLite store
//!   renders `= NULL` as `IS NULL` and `!= NULL` as `IS NOT NULL`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Value;

// =============================================================================
// Comparison Operator
// =============================================================================

/// Binary comparison between a column and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        };
        f.write_str(symbol)
    }
}

// =============================================================================
// Filter
// =============================================================================

/// A boolean predicate over entity columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// Matches every row.
    All,
    /// `column <op> value`
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// `column IS NULL`
    IsNull { column: String },
    /// `column IS NOT NULL`
    IsNotNull { column: String },
    /// `column IN (values...)`
    In { column: String, values: Vec<Value> },
    /// `column LIKE pattern` (`%` and `_` wildcards)
    Like { column: String, pattern: String },
    /// All children match.
    And { filters: Vec<Filter> },
    /// At least one child matches.
    Or { filters: Vec<Filter> },
    /// The child does not match.
    Not { filter: Box<Filter> },
}

impl Filter {
    /// Matches every row.
    pub fn all() -> Self {
        Filter::All
    }

    /// Generic comparison.
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Filter::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(column, CompareOp::Eq, value)
    }

    /// `column != value`
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(column, CompareOp::Ne, value)
    }

    /// `column < value`
    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(column, CompareOp::Lt, value)
    }

    /// `column <= value`
    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(column, CompareOp::Le, value)
    }

    /// `column > value`
    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(column, CompareOp::Gt, value)
    }

    /// `column >= value`
    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::compare(column, CompareOp::Ge, value)
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull {
            column: column.into(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter::IsNotNull {
            column: column.into(),
        }
    }

    /// `column IN (...)`. An empty list matches nothing.
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `column LIKE pattern`
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Filter::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    /// Conjunction of all given filters.
    pub fn all_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::And {
            filters: filters.into_iter().collect(),
        }
    }

    /// Disjunction of all given filters.
    pub fn any_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Or {
            filters: filters.into_iter().collect(),
        }
    }

    /// `self AND other`, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And { mut filters }, Filter::And { filters: rest }) => {
                filters.extend(rest);
                Filter::And { filters }
            }
            (Filter::And { mut filters }, other) => {
                filters.push(other);
                Filter::And { filters }
            }
            (this, other) => Filter::And {
                filters: vec![this, other],
            },
        }
    }

    /// `self OR other`, flattening nested disjunctions.
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or { mut filters }, Filter::Or { filters: rest }) => {
                filters.extend(rest);
                Filter::Or { filters }
            }
            (Filter::Or { mut filters }, other) => {
                filters.push(other);
                Filter::Or { filters }
            }
            (this, other) => Filter::Or {
                filters: vec![this, other],
            },
        }
    }

    /// `NOT self`. Double negation collapses.
    pub fn negate(self) -> Self {
        match self {
            Filter::Not { filter } => *filter,
            other => Filter::Not {
                filter: Box::new(other),
            },
        }
    }

    /// Columns referenced anywhere in the filter, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Filter::All => {}
            Filter::Compare { column, .. }
            | Filter::IsNull { column }
            | Filter::IsNotNull { column }
            | Filter::In { column, .. }
            | Filter::Like { column, .. } => {
                if !out.contains(&column.as_str()) {
                    out.push(column);
                }
            }
            Filter::And { filters } | Filter::Or { filters } => {
                for filter in filters {
                    filter.collect_columns(out);
                }
            }
            Filter::Not { filter } => filter.collect_columns(out),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

/// Human-readable rendering for logs. Not SQL.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "TRUE"),
            Filter::Compare { column, op, value } => write!(f, "{} {} {}", column, op, value),
            Filter::IsNull { column } => write!(f, "{} IS NULL", column),
            Filter::IsNotNull { column } => write!(f, "{} IS NOT NULL", column),
            Filter::In { column, values } => {
                write!(f, "{} IN (", column)?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
            Filter::Like { column, pattern } => write!(f, "{} LIKE '{}'", column, pattern),
            Filter::And { filters } => join(f, filters, " AND ", "TRUE"),
            Filter::Or { filters } => join(f, filters, " OR ", "FALSE"),
            Filter::Not { filter } => write!(f, "NOT ({})", filter),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, filters: &[Filter], sep: &str, empty: &str) -> fmt::Result {
    if filters.is_empty() {
        return f.write_str(empty);
    }
    for (idx, filter) in filters.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "({})", filter)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_flattens() {
        let filter = Filter::eq("a", 1)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));

        match filter {
            Filter::And { filters } => assert_eq!(filters.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_and_with_all_is_identity() {
        let filter = Filter::all().and(Filter::eq("a", 1));
        assert_eq!(filter, Filter::eq("a", 1));

        let filter = Filter::eq("a", 1).and(Filter::all());
        assert_eq!(filter, Filter::eq("a", 1));
    }

    #[test]
    fn test_or_flattens() {
        let filter = Filter::eq("a", 1)
            .or(Filter::eq("b", 2))
            .or(Filter::any_of([Filter::eq("c", 3), Filter::eq("d", 4)]));

        match filter {
            Filter::Or { filters } => assert_eq!(filters.len(), 4),
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_double_negation_collapses() {
        let filter = Filter::is_null("note").negate().negate();
        assert_eq!(filter, Filter::is_null("note"));
    }

    #[test]
    fn test_columns_are_deduplicated() {
        let filter = Filter::ge("amount_cents", 10)
            .and(Filter::le("amount_cents", 100))
            .and(Filter::like("description", "%coffee%").negate())
            .and(Filter::in_list("category_id", ["a", "b"]));

        assert_eq!(
            filter.columns(),
            vec!["amount_cents", "description", "category_id"]
        );
        assert!(Filter::all().columns().is_empty());
    }

    #[test]
    fn test_display() {
        let filter = Filter::eq("category_id", "food").and(Filter::gt("amount_cents", 500));
        assert_eq!(
            filter.to_string(),
            "(category_id = 'food') AND (amount_cents > 500)"
        );
        assert_eq!(
            Filter::in_list("id", [1, 2]).to_string(),
            "id IN (1, 2)"
        );
        assert_eq!(Filter::any_of(Vec::new()).to_string(), "FALSE");
    }

    #[test]
    fn test_serde_shape() {
        let filter = Filter::eq("amount_cents", 10);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["kind"], "compare");
        assert_eq!(json["column"], "amount_cents");
        assert_eq!(json["op"], "eq");

        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, filter);
    }
}
