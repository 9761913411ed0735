//! Nested loop equality join between two tables opened for the duration of
//! one statement.

use std::path::Path;

use log::{debug, warn};

use super::{Footer, QueryResult, Row};
use crate::error::{DbError, Result};
use crate::query::{ColumnRef, JoinKind, JoinSpec};
use crate::storage::{DataValue, Table, TableSchema};

pub fn execute(dir: &Path, spec: &JoinSpec) -> Result<QueryResult> {
    let left = Table::open(dir, &spec.left_table)?;
    let right = Table::open(dir, &spec.right_table)?;
    let (left_field, right_field) = resolve(spec, left.schema(), right.schema())?;

    let notice = match spec.kind {
        JoinKind::Inner => None,
        kind => {
            warn!("{} JOIN requested, running INNER JOIN", kind.as_str());
            Some(format!(
                "{} JOIN not fully implemented, falling back to INNER JOIN",
                kind.as_str()
            ))
        }
    };

    // Every left record rescans the right table: O(n * m), no index use.
    let mut rows = Vec::new();
    for left_row in left.scan()? {
        let (_, left_values) = left_row?;
        let key = left_values[left_field].render();

        for right_row in right.scan()? {
            let (_, right_values) = right_row?;
            if right_values[right_field].render() == key {
                rows.push(joined(left.schema(), &left_values, right.schema(), &right_values));
            }
        }
    }

    debug!(
        "joined '{}' and '{}': {} rows",
        spec.left_table,
        spec.right_table,
        rows.len()
    );

    Ok(QueryResult::Rows {
        notice,
        rows,
        footer: Footer::Joined,
    })
}

/// Maps the two sides of the ON clause to field indexes of the left and right
/// table. `ON b.x = a.y` is accepted for `a JOIN b`.
fn resolve(spec: &JoinSpec, left: &TableSchema, right: &TableSchema) -> Result<(usize, usize)> {
    let belongs = |column: &ColumnRef, table: &str| {
        column.table.as_deref().is_none_or(|name| name == table)
    };

    let (on_left, on_right) = if belongs(&spec.left_field, &spec.left_table)
        && belongs(&spec.right_field, &spec.right_table)
    {
        (&spec.left_field, &spec.right_field)
    } else if belongs(&spec.left_field, &spec.right_table)
        && belongs(&spec.right_field, &spec.left_table)
    {
        (&spec.right_field, &spec.left_field)
    } else {
        return Err(DbError::JoinFieldNotFound(format!(
            "ON clause must reference '{}' and '{}'",
            spec.left_table, spec.right_table
        )));
    };

    let field_index = |schema: &TableSchema, column: &ColumnRef| {
        schema
            .index_of(&column.field)
            .ok_or_else(|| DbError::JoinFieldNotFound(format!("{}.{}", schema.name, column.field)))
    };

    Ok((field_index(left, on_left)?, field_index(right, on_right)?))
}

fn joined(
    left: &TableSchema,
    left_values: &[DataValue],
    right: &TableSchema,
    right_values: &[DataValue],
) -> Row {
    let qualify = |schema: &TableSchema, values: &[DataValue]| {
        schema
            .fields
            .iter()
            .zip(values)
            .map(|(field, value)| (format!("{}.{}", schema.name, field.name), value.clone()))
            .collect::<Vec<_>>()
    };

    let mut cells = qualify(left, left_values);
    cells.extend(qualify(right, right_values));
    Row(cells)
}
