//! Predicate types and evaluation
//!
//! Predicates are evaluated against records. Partition directory values
//! are strings, so comparisons coerce a string operand to a number when the
//! other side is numeric.

use crate::types::Record;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A literal value appearing in a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "'{}'", v.replace('\'', "''")),
        }
    }
}

impl Literal {
    /// Compare a record value against this literal
    ///
    /// Returns `None` when either side is null or the two are not comparable.
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, value: &Value) -> Option<Ordering> {
        match (value, self) {
            (Value::Null, _) | (_, Literal::Null) => None,
            (Value::Bool(a), Literal::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Literal::Str(b)) => Some(a.as_str().cmp(b.as_str())),
            (Value::Number(n), Literal::Int(b)) => match n.as_i64() {
                Some(a) => Some(a.cmp(b)),
                None => n.as_f64()?.partial_cmp(&(*b as f64)),
            },
            (Value::Number(n), Literal::Float(b)) => n.as_f64()?.partial_cmp(b),
            (Value::String(s), Literal::Int(b)) => match s.trim().parse::<i64>() {
                Ok(a) => Some(a.cmp(b)),
                Err(_) => s.trim().parse::<f64>().ok()?.partial_cmp(&(*b as f64)),
            },
            (Value::String(s), Literal::Float(b)) => s.trim().parse::<f64>().ok()?.partial_cmp(b),
            (Value::String(s), Literal::Bool(b)) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(true.cmp(b)),
                "false" => Some(false.cmp(b)),
                _ => None,
            },
            (Value::Number(n), Literal::Str(s)) => {
                n.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?)
            }
            _ => None,
        }
    }

    fn matches(&self, value: &Value) -> bool {
        self.compare(value) == Some(Ordering::Equal)
    }
}

/// Comparison operator of a binary predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::LtEq => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::GtEq => ordering != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

/// A filter over record attributes
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column <op> value`
    Compare {
        column: String,
        op: CompareOp,
        value: Literal,
    },
    /// `column IN (values...)` or `column NOT IN (values...)`
    In {
        column: String,
        values: Vec<Literal>,
        negated: bool,
    },
    /// `column IS NULL` or `column IS NOT NULL`
    IsNull { column: String, negated: bool },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    /// `column IN (values...)` over string values
    pub fn in_list<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(|v| Literal::Str(v.into())).collect(),
            negated: false,
        }
    }

    /// `column = value`
    pub fn eq(column: impl Into<String>, value: Literal) -> Self {
        Predicate::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value,
        }
    }

    /// Combine predicates with AND; `None` for an empty list
    pub fn conjunction(mut predicates: Vec<Predicate>) -> Option<Predicate> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(Predicate::And(predicates)),
        }
    }

    /// Every column referenced anywhere in the predicate
    pub fn columns(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull { column, .. } => {
                out.insert(column.as_str());
            }
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_columns(out);
                }
            }
            Predicate::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Split a top-level AND into its conjuncts
    pub fn into_conjuncts(self) -> Vec<Predicate> {
        match self {
            Predicate::And(children) => children
                .into_iter()
                .flat_map(Predicate::into_conjuncts)
                .collect(),
            other => vec![other],
        }
    }

    /// Evaluate against a record; a missing field behaves as null
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::Compare { column, op, value } => record
                .get(column)
                .and_then(|v| value.compare(v))
                .is_some_and(|ord| op.holds(ord)),
            Predicate::In {
                column,
                values,
                negated,
            } => match record.get(column) {
                None | Some(Value::Null) => false,
                Some(v) => values.iter().any(|lit| lit.matches(v)) != *negated,
            },
            Predicate::IsNull { column, negated } => {
                let is_null = record.get(column).map_or(true, Value::is_null);
                is_null != *negated
            }
            Predicate::And(children) => children.iter().all(|c| c.evaluate(record)),
            Predicate::Or(children) => children.iter().any(|c| c.evaluate(record)),
            Predicate::Not(inner) => !inner.evaluate(record),
        }
    }

    /// Evaluate against Hive partition values (all strings)
    pub fn evaluate_partition(&self, values: &BTreeMap<String, String>) -> bool {
        let record: Record = values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        self.evaluate(&record)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { column, op, value } => {
                write!(f, "{column} {} {value}", op.symbol())
            }
            Predicate::In {
                column,
                values,
                negated,
            } => {
                let vals: Vec<String> = values.iter().map(ToString::to_string).collect();
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} {not}IN ({})", vals.join(", "))
            }
            Predicate::IsNull { column, negated } => {
                let not = if *negated { "NOT " } else { "" };
                write!(f, "{column} IS {not}NULL")
            }
            Predicate::And(children) => write_joined(f, children, " AND "),
            Predicate::Or(children) => write_joined(f, children, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({inner})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[Predicate], sep: &str) -> fmt::Result {
    let parts: Vec<String> = children
        .iter()
        .map(|c| match c {
            Predicate::And(_) | Predicate::Or(_) => format!("({c})"),
            _ => c.to_string(),
        })
        .collect();
    f.write_str(&parts.join(sep))
}

/// Result of splitting a predicate into pushable and local parts
#[derive(Debug, Clone, Default)]
pub struct SplitPredicates {
    /// Conjuncts over partition columns only; used to prune partitions
    pub pushable: Vec<Predicate>,
    /// Conjuncts that must be evaluated against each record
    pub local: Vec<Predicate>,
}

impl SplitPredicates {
    /// Whether the whole predicate can be answered from partition values
    pub fn fully_pushed(&self) -> bool {
        self.local.is_empty()
    }
}

/// Classify the conjuncts of a predicate as pushable or local
///
/// A conjunct is pushable when every column it references is a partition
/// column.
pub fn split_predicates(predicate: Predicate, partition_columns: &[String]) -> SplitPredicates {
    let mut split = SplitPredicates::default();

    for conjunct in predicate.into_conjuncts() {
        let can_push = conjunct
            .columns()
            .iter()
            .all(|c| partition_columns.iter().any(|p| p == c));
        if can_push {
            split.pushable.push(conjunct);
        } else {
            split.local.push(conjunct);
        }
    }

    split
}
