//! WHERE clause evaluation over decoded records.

use crate::error::{DbError, Result};
use crate::query::{CmpOp, Condition, Connective};
use crate::storage::{DataType, DataValue, TableSchema};

/// Compares the rendered value of a field with a literal.
///
/// `=`, `==` and `!=` compare text for every type. Ordering operators only
/// apply to `int` and `bool` (as 0/1) and are always false on `text` or when
/// either side is not a number.
pub fn compare(field_value: &str, op: CmpOp, literal: &str, data_type: DataType) -> bool {
    match op {
        CmpOp::Eq | CmpOp::EqEq => return field_value == literal,
        CmpOp::Ne => return field_value != literal,
        _ => {}
    }

    if !data_type.is_ordered() {
        return false;
    }

    let (Some(left), Some(right)) = (ordinal(field_value), ordinal(literal)) else {
        return false;
    };

    match op {
        CmpOp::Gt => left > right,
        CmpOp::Lt => left < right,
        CmpOp::Ge => left >= right,
        CmpOp::Le => left <= right,
        CmpOp::Eq | CmpOp::EqEq | CmpOp::Ne => false,
    }
}

fn ordinal(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(1)
    } else if text.eq_ignore_ascii_case("false") {
        Some(0)
    } else {
        text.parse().ok()
    }
}

/// Fails on the first condition naming a field the schema doesn't have.
pub fn validate(schema: &TableSchema, conditions: &[Condition]) -> Result<()> {
    match conditions
        .iter()
        .find(|condition| schema.index_of(&condition.field).is_none())
    {
        Some(condition) => Err(DbError::FieldNotFound(condition.field.to_string())),
        None => Ok(()),
    }
}

pub fn evaluate(schema: &TableSchema, record: &[DataValue], condition: &Condition) -> bool {
    let Some(index) = schema.index_of(&condition.field) else {
        return false;
    };
    let (Some(field), Some(value)) = (schema.fields.get(index), record.get(index)) else {
        return false;
    };

    compare(&value.render(), condition.op, &condition.value, field.data_type)
}

/// Folds the conditions strictly left to right, no precedence: each term is
/// combined with the running result through its own connective.
pub fn evaluate_chain(schema: &TableSchema, record: &[DataValue], conditions: &[Condition]) -> bool {
    let Some((first, rest)) = conditions.split_first() else {
        return true;
    };

    rest.iter()
        .fold(evaluate(schema, record, first), |acc, condition| {
            let current = evaluate(schema, record, condition);
            match condition.combine {
                Connective::And => acc && current,
                Connective::Or => acc || current,
            }
        })
}
