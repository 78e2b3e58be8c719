//! SQL rendering of predicates.
//!
//! Column names are spliced into the statement, so they are checked with
//! [`Predicate::validate`] first. Every value is a bound parameter.

use sqlx::{MySql, QueryBuilder};
use stash_core::{Predicate, SqlValue, StashError, StashResult};

/// Table and column identifiers are limited to `[A-Za-z0-9_.]`.
pub fn validate_identifier(name: &str) -> StashResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StashError::validation(format!("invalid identifier '{name}'")))
    }
}

/// Builds `SELECT <columns> FROM <table> WHERE <predicate> [LIMIT n]`.
pub fn select<'args>(
    table: &str,
    columns: &[String],
    predicate: &Predicate,
    limit: Option<u32>,
) -> StashResult<QueryBuilder<'args, MySql>> {
    predicate.validate()?;

    let mut builder = QueryBuilder::new("SELECT ");
    builder.push(columns.join(", "));
    builder.push(" FROM ");
    builder.push(table);
    builder.push(" WHERE ");
    push_predicate(&mut builder, predicate);

    if let Some(limit) = limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    Ok(builder)
}

fn push_predicate(builder: &mut QueryBuilder<'_, MySql>, predicate: &Predicate) {
    match predicate {
        Predicate::All => {
            builder.push("1 = 1");
        }
        Predicate::Compare { column, op, value } => {
            builder.push(column).push(" ").push(op.as_sql()).push(" ");
            push_value(builder, value);
        }
        Predicate::In { column, values } => {
            builder.push(column).push(" IN (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                push_value(builder, value);
            }
            builder.push(")");
        }
        Predicate::Like { column, pattern } => {
            builder.push(column).push(" LIKE ").push_bind(pattern.clone());
        }
        Predicate::And(inner) | Predicate::Or(inner) => {
            let joiner = if matches!(predicate, Predicate::And(_)) { " AND " } else { " OR " };
            for (i, part) in inner.iter().enumerate() {
                if i > 0 {
                    builder.push(joiner);
                }
                builder.push("(");
                push_predicate(builder, part);
                builder.push(")");
            }
        }
    }
}

fn push_value(builder: &mut QueryBuilder<'_, MySql>, value: &SqlValue) {
    match value {
        SqlValue::Int(v) => builder.push_bind(*v),
        SqlValue::UInt(v) => builder.push_bind(*v),
        SqlValue::Float(v) => builder.push_bind(*v),
        SqlValue::Text(v) => builder.push_bind(v.clone()),
        SqlValue::Bool(v) => builder.push_bind(*v),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string(), "age".to_string()]
    }

    #[test]
    fn test_select_one() {
        let builder = select("person", &columns(), &Predicate::eq("id", 42), Some(1)).unwrap();
        assert_eq!(builder.sql(), "SELECT id, name, age FROM person WHERE id = ? LIMIT ?");
    }

    #[test]
    fn test_select_in() {
        let predicate = Predicate::in_list("id", [1_i64, 2, 3]);
        let builder = select("person", &columns(), &predicate, None).unwrap();
        assert_eq!(builder.sql(), "SELECT id, name, age FROM person WHERE id IN (?, ?, ?)");
    }

    #[test]
    fn test_select_composite() {
        let predicate = Predicate::gt("age", 18)
            .and(Predicate::like("name", "Zhang%").or(Predicate::ne("id", 0)));
        let builder = select("person", &columns(), &predicate, None).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT id, name, age FROM person WHERE (age > ?) AND ((name LIKE ?) OR (id <> ?))"
        );
    }

    #[test]
    fn test_select_all() {
        let builder = select("person", &columns(), &Predicate::All, None).unwrap();
        assert_eq!(builder.sql(), "SELECT id, name, age FROM person WHERE 1 = 1");
    }

    #[test]
    fn test_select_rejects_invalid_predicate() {
        let predicate = Predicate::eq("id = 1 OR 1", 1);
        assert!(select("person", &columns(), &predicate, None).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("person").is_ok());
        assert!(validate_identifier("db.person").is_ok());
        assert!(validate_identifier("person; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }
}
