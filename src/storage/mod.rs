pub mod codec;
pub mod schema;
pub mod table;

use std::fmt::Display;

use crate::error::{DbError, Result};

pub use schema::{Field, TableSchema};
pub use table::Table;

/// Capacity of a `text` field declared without an explicit size.
pub const DEFAULT_TEXT_CAPACITY: u32 = 255;

#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy)]
pub enum DataType {
    Int,
    Bool,
    Text(u32),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum DataValue {
    Int(i32),
    Bool(bool),
    Text(String),
}

impl DataType {
    pub const INT_TAG: u8 = 11;
    pub const BOOL_TAG: u8 = 13;
    pub const TEXT_TAG: u8 = 14;

    /// Resolves a declared type such as `int`, `bool`, `text` or `text(N)`.
    pub fn from_declaration(name: &str, size: Option<u32>) -> Result<Self> {
        match (name.to_ascii_lowercase().as_str(), size) {
            ("int", None) => Ok(DataType::Int),
            ("bool", None) => Ok(DataType::Bool),
            ("text", None) => Ok(DataType::Text(DEFAULT_TEXT_CAPACITY)),
            ("text", Some(size)) => Ok(DataType::Text(size)),
            (_, Some(size)) => Err(DbError::UnknownFieldType(format!("{name}({size})"))),
            _ => Err(DbError::UnknownFieldType(name.to_string())),
        }
    }

    pub fn from_tag(tag: u8, size: u32) -> Option<Self> {
        match tag {
            Self::INT_TAG if size == 4 => Some(DataType::Int),
            Self::BOOL_TAG if size == 1 => Some(DataType::Bool),
            Self::TEXT_TAG if size > 0 => Some(DataType::Text(size)),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            DataType::Int => Self::INT_TAG,
            DataType::Bool => Self::BOOL_TAG,
            DataType::Text(_) => Self::TEXT_TAG,
        }
    }

    /// Bytes taken by one value of this type inside a record. Fixed for every
    /// platform.
    pub fn byte_size(self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Bool => 1,
            DataType::Text(capacity) => capacity as usize,
        }
    }

    pub fn is_ordered(self) -> bool {
        matches!(self, DataType::Int | DataType::Bool)
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Int => f.write_str("int"),
            DataType::Bool => f.write_str("bool"),
            DataType::Text(capacity) => write!(f, "text({capacity})"),
        }
    }
}

impl DataValue {
    /// Textual form used as index key and for predicate comparisons.
    pub fn render(&self) -> String {
        match self {
            DataValue::Int(value) => value.to_string(),
            DataValue::Bool(value) => value.to_string(),
            DataValue::Text(value) => value.clone(),
        }
    }
}

/// Output form: text is single-quoted, everything else is rendered as is.
impl Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Text(value) => write!(f, "'{value}'"),
            DataValue::Int(value) => write!(f, "{value}"),
            DataValue::Bool(value) => write!(f, "{value}"),
        }
    }
}
