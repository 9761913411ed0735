pub type Result<T> = std::result::Result<T, QueryErr>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryErr {
    #[error("Syntax error: unexpected end of input, expected {0}")]
    UnexpectedEof(String),
    #[error("Syntax error: invalid number {0}")]
    InvalidNum(String),
    #[error("Syntax error: unterminated text literal")]
    UnterminatedText,
    #[error("Syntax error: invalid character '{0}'")]
    InvalidToken(char),
    #[error("Syntax error: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
