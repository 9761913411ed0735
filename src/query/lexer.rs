use std::collections::VecDeque;
use std::fmt::Display;

use super::error::{QueryErr, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Bool(bool),
    Num(String),
    Text(String),
    // 식별자
    Ident(String),
    // 키워드
    Create, // CREATE
    Table,  // TABLE
    Use,    // USE
    Insert, // INSERT
    Into,   // INTO
    Values, // VALUES
    Select, // SELECT
    From,   // FROM
    Where,  // WHERE
    Join,   // JOIN
    On,     // ON
    Find,   // FIND
    Load,   // LOAD
    Help,   // HELP
    Exit,   // EXIT
    // 구분자
    Dot,       // .
    Comma,     // ,
    Semicolon, // ;
    LParen,    // (
    RParen,    // )
    // 연산자
    And,  // AND
    Or,   // OR
    Eq,   // =
    EqEq, // ==
    Ne,   // != <>
    Gt,   // >
    Lt,   // <
    Ge,   // >=
    Le,   // <=
    Sub,  // -
    Star, // *
    Eof,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Bool(value) => write!(f, "{value}"),
            Token::Num(num) => write!(f, "{num}"),
            Token::Text(text) => write!(f, "'{text}'"),
            Token::Ident(ident) => write!(f, "{ident}"),
            Token::Create => f.write_str("CREATE"),
            Token::Table => f.write_str("TABLE"),
            Token::Use => f.write_str("USE"),
            Token::Insert => f.write_str("INSERT"),
            Token::Into => f.write_str("INTO"),
            Token::Values => f.write_str("VALUES"),
            Token::Select => f.write_str("SELECT"),
            Token::From => f.write_str("FROM"),
            Token::Where => f.write_str("WHERE"),
            Token::Join => f.write_str("JOIN"),
            Token::On => f.write_str("ON"),
            Token::Find => f.write_str("FIND"),
            Token::Load => f.write_str("LOAD"),
            Token::Help => f.write_str("HELP"),
            Token::Exit => f.write_str("EXIT"),
            Token::Dot => f.write_str("."),
            Token::Comma => f.write_str(","),
            Token::Semicolon => f.write_str(";"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::And => f.write_str("AND"),
            Token::Or => f.write_str("OR"),
            Token::Eq => f.write_str("="),
            Token::EqEq => f.write_str("=="),
            Token::Ne => f.write_str("!="),
            Token::Gt => f.write_str(">"),
            Token::Lt => f.write_str("<"),
            Token::Ge => f.write_str(">="),
            Token::Le => f.write_str("<="),
            Token::Sub => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

pub struct Lexer {
    src: VecDeque<char>,
}

impl Lexer {
    pub fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
        }
    }

    fn is_letter(ch: char) -> bool {
        ch.is_alphabetic() || ch == '_'
    }

    fn is_digit(ch: char) -> bool {
        ch.is_ascii_digit()
    }

    fn front(&self) -> Option<char> {
        self.src.front().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.src.pop_front()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.front()
            && ch.is_whitespace()
        {
            self.bump();
        }
    }

    /// First whitespace-delimited word of the unread input, without consuming
    /// anything.
    pub fn leading_word(&self) -> String {
        self.src
            .iter()
            .skip_while(|ch| ch.is_whitespace())
            .take_while(|ch| !ch.is_whitespace())
            .collect()
    }

    /// Consumes and returns the untokenized remainder of the input, trimmed.
    pub fn rest(&mut self) -> String {
        let rest: String = self.src.drain(..).collect();
        rest.trim().to_string()
    }

    pub fn next(&mut self) -> Result<Token> {
        self.skip_whitespace();
        let Some(ch) = self.bump() else {
            return Ok(Token::Eof);
        };
        Ok(match ch {
            '.' => Token::Dot,
            ',' => Token::Comma,
            ';' => Token::Semicolon,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '*' => Token::Star,
            '-' => Token::Sub,
            '=' => {
                if self.front() == Some('=') {
                    self.bump();
                    Token::EqEq
                } else {
                    Token::Eq
                }
            }
            '!' => {
                if self.front() == Some('=') {
                    self.bump();
                    Token::Ne
                } else {
                    return Err(QueryErr::InvalidToken(ch));
                }
            }
            '>' => {
                if self.front() == Some('=') {
                    self.bump();
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '<' => match self.front() {
                Some('=') => {
                    self.bump();
                    Token::Le
                }
                Some('>') => {
                    self.bump();
                    Token::Ne
                }
                _ => Token::Lt,
            },
            '\'' | '"' => self.lex_text(ch)?,
            _ if Self::is_digit(ch) => self.lex_num(ch)?,
            _ if Self::is_letter(ch) => self.lex_keyword(ch),
            _ => return Err(QueryErr::InvalidToken(ch)),
        })
    }

    fn lex_num(&mut self, start: char) -> Result<Token> {
        let mut out = String::from(start);
        while let Some(ch) = self.front() {
            if Self::is_digit(ch) {
                out.push(ch);
                self.bump();
            } else if Self::is_letter(ch) {
                // 123abc
                out.push(ch);
                return Err(QueryErr::InvalidNum(out));
            } else {
                break;
            }
        }
        Ok(Token::Num(out))
    }

    /// Quoted literal. A backslash keeps the next character literally, except
    /// for `\n`, `\r` and `\t`.
    fn lex_text(&mut self, quote: char) -> Result<Token> {
        let mut out = String::new();
        loop {
            match self.bump().ok_or(QueryErr::UnterminatedText)? {
                ch if ch == quote => return Ok(Token::Text(out)),
                '\\' => {
                    let escaped = self.bump().ok_or(QueryErr::UnterminatedText)?;
                    out.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => other,
                    });
                }
                ch => out.push(ch),
            }
        }
    }

    fn lex_keyword(&mut self, start: char) -> Token {
        let mut out = String::from(start);
        while let Some(ch) = self.front()
            && (Self::is_letter(ch) || Self::is_digit(ch))
        {
            out.push(ch);
            self.bump();
        }
        // 키워드 매칭
        match out.to_uppercase().as_str() {
            "TRUE" => Token::Bool(true),
            "FALSE" => Token::Bool(false),
            "CREATE" => Token::Create,
            "TABLE" => Token::Table,
            "USE" => Token::Use,
            "INSERT" => Token::Insert,
            "INTO" => Token::Into,
            "VALUES" => Token::Values,
            "SELECT" => Token::Select,
            "FROM" => Token::From,
            "WHERE" => Token::Where,
            "JOIN" => Token::Join,
            "ON" => Token::On,
            "FIND" => Token::Find,
            "LOAD" => Token::Load,
            "HELP" => Token::Help,
            "EXIT" => Token::Exit,
            "AND" => Token::And,
            "OR" => Token::Or,
            _ => Token::Ident(out),
        }
    }
}
