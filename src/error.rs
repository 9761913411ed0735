use crate::query::error::QueryErr;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),

    #[error("No table selected")]
    NoActiveTable,

    #[error("Table '{requested}' is not the active table '{active}' (run USE {requested} first)")]
    TableNotActive { requested: String, active: String },

    #[error("Field '{0}' not found")]
    FieldNotFound(String),

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    #[error(transparent)]
    Syntax(#[from] QueryErr),

    #[error("Join field not found: {0}")]
    JoinFieldNotFound(String),

    #[error("Expected {expected} values, got {found}")]
    ValueCount { expected: usize, found: usize },

    #[error("Invalid value {value} for field '{field}' of type {data_type}")]
    TypeMismatch {
        field: String,
        data_type: String,
        value: String,
    },

    #[error("Limit exceeded: {0}")]
    Limit(String),

    #[error("Corrupt table file: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
