pub mod error;
pub mod lexer;
pub mod parser;

pub use lexer::Lexer;
pub use parser::{
    CmpOp, ColumnDef, ColumnRef, Condition, Connective, JoinKind, JoinSpec, Literal, Parser,
    Projection, Stmt, parse,
};
