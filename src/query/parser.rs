use super::error::{QueryErr, Result};
use super::lexer::{Lexer, Token};

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Create {
        table: Box<str>,
        columns: Vec<ColumnDef>,
    },
    Use {
        table: Box<str>,
    },
    Insert {
        table: Box<str>,
        values: Vec<Literal>,
    },
    Select {
        table: Box<str>,
        projection: Projection,
        filters: Vec<Condition>,
    },
    Join(JoinSpec),
    Find {
        needle: Box<str>,
    },
    Load {
        path: Box<str>,
    },
    Help,
    Exit,
}

/// `name type[(size)]` as written in CREATE TABLE. The type is resolved by
/// the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Box<str>,
    pub type_name: Box<str>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(i64),
    Text(Box<str>),
    Bool(bool),
    /// Unquoted word such as `Alice` in `VALUES (1, Alice)`.
    Word(Box<str>),
}

impl Literal {
    pub fn to_text(&self) -> String {
        match self {
            Literal::Number(num) => num.to_string(),
            Literal::Bool(value) => value.to_string(),
            Literal::Text(text) | Literal::Word(text) => text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<Box<str>>),
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    EqEq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// One `field op value` term of a WHERE clause. `combine` is the AND/OR
/// written before this term; it is ignored on the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: Box<str>,
    pub op: CmpOp,
    pub value: Box<str>,
    pub combine: Connective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "INNER" => Some(JoinKind::Inner),
            "LEFT" => Some(JoinKind::Left),
            "RIGHT" => Some(JoinKind::Right),
            "FULL" => Some(JoinKind::Full),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
        }
    }
}

/// Possibly qualified column reference, `table.field` or `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<Box<str>>,
    pub field: Box<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub left_table: Box<str>,
    pub right_table: Box<str>,
    pub left_field: ColumnRef,
    pub right_field: ColumnRef,
    pub kind: JoinKind,
}

pub struct Parser {
    lexer: Lexer,
    peeked: Option<Token>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        Self {
            lexer,
            peeked: None,
        }
    }

    /// Parses exactly one statement, optionally terminated by `;`.
    pub fn parse(mut self) -> Result<Stmt> {
        // Anything that doesn't even lex as a first token is not a command.
        let command = self.lexer.leading_word();
        let first = self
            .next_token()
            .map_err(|_| QueryErr::UnknownCommand(command.to_uppercase()))?;

        let stmt = match first {
            Token::Create => self.parse_create()?,
            Token::Use => Stmt::Use {
                table: self.parse_ident("table name")?,
            },
            Token::Insert => self.parse_insert()?,
            Token::Select => self.parse_select()?,
            Token::Find => self.parse_find()?,
            Token::Load => return self.parse_load(),
            Token::Help => Stmt::Help,
            Token::Exit => Stmt::Exit,
            Token::Eof => return Err(QueryErr::UnexpectedEof("a statement".into())),
            other => return Err(QueryErr::UnknownCommand(other.to_string().to_uppercase())),
        };

        if self.peek()? == &Token::Semicolon {
            self.next_token()?;
        }
        match self.next_token()? {
            Token::Eof => Ok(stmt),
            found => Err(QueryErr::UnexpectedToken {
                expected: "end of statement".into(),
                found: found.to_string(),
            }),
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.lexer.next(),
        }
    }

    fn peek(&mut self) -> Result<&Token> {
        if self.peeked.is_none() {
            let token = self.lexer.next()?;
            self.peeked = Some(token);
        }
        Ok(self.peeked.get_or_insert(Token::Eof))
    }

    fn unexpected(expected: &str, found: Token) -> QueryErr {
        match found {
            Token::Eof => QueryErr::UnexpectedEof(expected.into()),
            found => QueryErr::UnexpectedToken {
                expected: expected.into(),
                found: found.to_string(),
            },
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let found = self.next_token()?;
        if found == expected {
            Ok(())
        } else {
            Err(Self::unexpected(&expected.to_string(), found))
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<()> {
        match self.next_token()? {
            Token::Ident(ident) if ident.eq_ignore_ascii_case(word) => Ok(()),
            found => Err(Self::unexpected(word, found)),
        }
    }

    fn parse_ident(&mut self, what: &str) -> Result<Box<str>> {
        match self.next_token()? {
            Token::Ident(ident) => Ok(ident.into()),
            found => Err(Self::unexpected(what, found)),
        }
    }

    fn parse_number<T: std::str::FromStr>(num: &str) -> Result<T> {
        num.parse().map_err(|_| QueryErr::InvalidNum(num.to_string()))
    }

    fn parse_create(&mut self) -> Result<Stmt> {
        self.expect(Token::Table)?;
        let table = self.parse_ident("table name")?;
        self.expect(Token::LParen)?;

        let mut columns = Vec::new();
        loop {
            let name = self.parse_ident("field name")?;
            let type_name = self.parse_ident("field type")?;

            let size = if self.peek()? == &Token::LParen {
                self.next_token()?;
                let size = match self.next_token()? {
                    Token::Num(num) => Self::parse_number(&num)?,
                    found => return Err(Self::unexpected("field size", found)),
                };
                self.expect(Token::RParen)?;
                Some(size)
            } else {
                None
            };

            columns.push(ColumnDef {
                name,
                type_name,
                size,
            });

            match self.next_token()? {
                Token::Comma => continue,
                Token::RParen => break,
                found => return Err(Self::unexpected("',' or ')'", found)),
            }
        }

        Ok(Stmt::Create { table, columns })
    }

    fn parse_insert(&mut self) -> Result<Stmt> {
        self.expect(Token::Into)?;
        let table = self.parse_ident("table name")?;
        self.expect(Token::Values)?;
        self.expect(Token::LParen)?;

        let mut values = Vec::new();
        if self.peek()? == &Token::RParen {
            self.next_token()?;
            return Ok(Stmt::Insert { table, values });
        }

        loop {
            values.push(self.parse_literal()?);
            match self.next_token()? {
                Token::Comma => continue,
                Token::RParen => break,
                found => return Err(Self::unexpected("',' or ')'", found)),
            }
        }

        Ok(Stmt::Insert { table, values })
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.next_token()? {
            Token::Num(num) => Ok(Literal::Number(Self::parse_number(&num)?)),
            Token::Sub => match self.next_token()? {
                Token::Num(num) => Ok(Literal::Number(Self::parse_number(&format!("-{num}"))?)),
                found => Err(Self::unexpected("number", found)),
            },
            Token::Text(text) => Ok(Literal::Text(text.into())),
            Token::Bool(value) => Ok(Literal::Bool(value)),
            Token::Ident(word) => Ok(Literal::Word(word.into())),
            found => Err(Self::unexpected("value", found)),
        }
    }

    fn parse_select(&mut self) -> Result<Stmt> {
        let projection = match self.next_token()? {
            Token::Star => Projection::All,
            Token::Ident(first) => {
                if first.eq_ignore_ascii_case("COUNT") && self.peek()? == &Token::LParen {
                    self.next_token()?;
                    self.expect(Token::Star)?;
                    self.expect(Token::RParen)?;
                    Projection::Count
                } else {
                    let mut columns = vec![first.into_boxed_str()];
                    while self.peek()? == &Token::Comma {
                        self.next_token()?;
                        columns.push(self.parse_ident("column name")?);
                    }
                    Projection::Columns(columns)
                }
            }
            found => return Err(Self::unexpected("'*', COUNT(*) or column list", found)),
        };

        self.expect(Token::From)?;
        let table = self.parse_ident("table name")?;

        if self.peek()? == &Token::Join || self.peek_join_kind()?.is_some() {
            if projection != Projection::All {
                return Err(QueryErr::UnexpectedToken {
                    expected: "SELECT * with JOIN".into(),
                    found: "column list".into(),
                });
            }
            return self.parse_join(table).map(Stmt::Join);
        }

        let mut filters = Vec::new();
        if self.peek()? == &Token::Where {
            self.next_token()?;
            filters = self.parse_conditions()?;
        }

        Ok(Stmt::Select {
            table,
            projection,
            filters,
        })
    }

    /// `[INNER|LEFT|RIGHT|FULL [OUTER]] JOIN t2 ON a = b [INNER|LEFT|RIGHT|FULL]`
    fn parse_join(&mut self, left_table: Box<str>) -> Result<JoinSpec> {
        let mut kind = self.peek_join_kind()?;
        if kind.is_some() {
            self.next_token()?;
            if matches!(self.peek()?, Token::Ident(word) if word.eq_ignore_ascii_case("OUTER")) {
                self.next_token()?;
            }
        }

        self.expect(Token::Join)?;
        let right_table = self.parse_ident("table name")?;
        self.expect(Token::On)?;
        let left_field = self.parse_column_ref()?;
        match self.next_token()? {
            Token::Eq | Token::EqEq => {}
            found => return Err(Self::unexpected("'='", found)),
        }
        let right_field = self.parse_column_ref()?;

        if let Some(trailing) = self.peek_join_kind()? {
            self.next_token()?;
            kind = Some(trailing);
        }

        Ok(JoinSpec {
            left_table,
            right_table,
            left_field,
            right_field,
            kind: kind.unwrap_or(JoinKind::Inner),
        })
    }

    fn peek_join_kind(&mut self) -> Result<Option<JoinKind>> {
        Ok(match self.peek()? {
            Token::Ident(word) => JoinKind::from_word(word),
            _ => None,
        })
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.parse_ident("column name")?;
        if self.peek()? == &Token::Dot {
            self.next_token()?;
            let field = self.parse_ident("column name")?;
            Ok(ColumnRef {
                table: Some(first),
                field,
            })
        } else {
            Ok(ColumnRef {
                table: None,
                field: first,
            })
        }
    }

    fn parse_conditions(&mut self) -> Result<Vec<Condition>> {
        let mut conditions = vec![self.parse_condition(Connective::And)?];
        loop {
            let combine = match self.peek()? {
                Token::And => Connective::And,
                Token::Or => Connective::Or,
                _ => return Ok(conditions),
            };
            self.next_token()?;
            conditions.push(self.parse_condition(combine)?);
        }
    }

    fn parse_condition(&mut self, combine: Connective) -> Result<Condition> {
        let field = self.parse_ident("field name")?;
        let op = match self.next_token()? {
            Token::Eq => CmpOp::Eq,
            Token::EqEq => CmpOp::EqEq,
            Token::Ne => CmpOp::Ne,
            Token::Gt => CmpOp::Gt,
            Token::Lt => CmpOp::Lt,
            Token::Ge => CmpOp::Ge,
            Token::Le => CmpOp::Le,
            found => return Err(Self::unexpected("comparison operator", found)),
        };
        let value = self.parse_literal()?.to_text().into();

        Ok(Condition {
            field,
            op,
            value,
            combine,
        })
    }

    fn parse_find(&mut self) -> Result<Stmt> {
        self.expect_word("TEXT")?;
        match self.next_token()? {
            Token::Text(needle) => Ok(Stmt::Find {
                needle: needle.into(),
            }),
            found => Err(Self::unexpected("quoted text", found)),
        }
    }

    fn parse_load(&mut self) -> Result<Stmt> {
        let rest = self.lexer.rest();
        let path = rest
            .trim_end_matches(';')
            .trim()
            .trim_matches(|c| c == '\'' || c == '"');
        if path.is_empty() {
            return Err(QueryErr::UnexpectedEof("file name".into()));
        }
        Ok(Stmt::Load { path: path.into() })
    }
}

/// Parses a single statement from `src`.
pub fn parse(src: &str) -> Result<Stmt> {
    Parser::new(Lexer::new(src)).parse()
}
