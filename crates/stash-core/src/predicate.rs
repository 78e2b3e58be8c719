//! Backing-store query predicates.
//!
//! A [`Predicate`] is composed by the caller and handed through the
//! orchestrators untouched; only the backing-store reader interprets it.

use crate::{StashError, StashResult};
use std::fmt;

/// A literal bound into a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! sql_value_from {
    ($variant:ident, $target:ty; $($ty:ty),*) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(<$target>::from(v))
                }
            }
        )*
    };
}

sql_value_from!(Int, i64; i8, i16, i32, i64);
sql_value_from!(UInt, u64; u8, u16, u32, u64);
sql_value_from!(Float, f64; f32, f64);
sql_value_from!(Bool, bool; bool);

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    /// Returns the SQL operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// A filter over backing-store rows.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    All,
    /// `column <op> value`
    Compare {
        column: String,
        op: CompareOp,
        value: SqlValue,
    },
    /// `column IN (values...)`
    In { column: String, values: Vec<SqlValue> },
    /// `column LIKE pattern`
    Like { column: String, pattern: String },
    /// All of the inner predicates.
    And(Vec<Predicate>),
    /// Any of the inner predicates.
    Or(Vec<Predicate>),
}

#[allow(clippy::should_implement_trait)]
impl Predicate {
    fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<SqlValue>) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    #[must_use]
    pub fn ne(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    #[must_use]
    pub fn gt(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    #[must_use]
    pub fn ge(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Ge, value)
    }

    #[must_use]
    pub fn lt(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    #[must_use]
    pub fn le(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Le, value)
    }

    /// `column IN (values...)`.
    #[must_use]
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Self::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like {
            column: column.into(),
            pattern: pattern.into(),
        }
    }

    /// Conjunction with another predicate, flattening nested `And`s.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::All, p) | (p, Self::All) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, Self::And(mut right)) => {
                right.insert(0, p);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Disjunction with another predicate.
    #[must_use]
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Or(mut left), p) => {
                left.push(p);
                Self::Or(left)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    /// Checks column identifiers and list arity.
    pub fn validate(&self) -> StashResult<()> {
        match self {
            Self::All => Ok(()),
            Self::Compare { column, .. } | Self::Like { column, .. } => validate_column(column),
            Self::In { column, values } => {
                validate_column(column)?;
                if values.is_empty() {
                    return Err(StashError::validation(format!(
                        "IN list for column '{column}' is empty"
                    )));
                }
                Ok(())
            }
            Self::And(inner) | Self::Or(inner) => {
                if inner.is_empty() {
                    return Err(StashError::validation("empty predicate group"));
                }
                inner.iter().try_for_each(Predicate::validate)
            }
        }
    }
}

/// Column identifiers are limited to `[A-Za-z0-9_.]`.
fn validate_column(column: &str) -> StashResult<()> {
    let valid = !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StashError::validation(format!("invalid column identifier '{column}'")))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("TRUE"),
            Self::Compare { column, op, value } => write!(f, "{column} {} {value}", op.as_sql()),
            Self::In { column, values } => {
                let list: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "{column} IN ({})", list.join(", "))
            }
            Self::Like { column, pattern } => write!(f, "{column} LIKE '{pattern}'"),
            Self::And(inner) | Self::Or(inner) => {
                let joiner = if matches!(self, Self::And(_)) { " AND " } else { " OR " };
                let parts: Vec<String> = inner.iter().map(|p| format!("({p})")).collect();
                f.write_str(&parts.join(joiner))
            }
        }
    }
}
