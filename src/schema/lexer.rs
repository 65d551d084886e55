//! Tokenizer for the ASN.1 subset understood by the schema parser.

use std::{error, fmt};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Type references, identifiers and keywords alike; the parser tells
    /// them apart.
    Ident(String),
    /// Integer or real number, kept in its source spelling.
    Number(String),
    /// `"..."`
    QuotedString(String),
    /// `'0101'B`
    BinString(String),
    /// `'DEAD'H`
    HexString(String),
    /// `::=`
    Assign,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    /// `..`
    Range,
    /// `...`
    Ellipsis,
    Pipe,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "'{name}'"),
            Self::Number(text) => write!(f, "'{text}'"),
            Self::QuotedString(_) => f.write_str("a quoted string"),
            Self::BinString(_) => f.write_str("a binary string"),
            Self::HexString(_) => f.write_str("a hexadecimal string"),
            Self::Assign => f.write_str("'::='"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Comma => f.write_str("','"),
            Self::Semicolon => f.write_str("';'"),
            Self::Range => f.write_str("'..'"),
            Self::Ellipsis => f.write_str("'...'"),
            Self::Pipe => f.write_str("'|'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Tokenizer error with the source position it occurred at.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

impl error::Error for Error {}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn skip_line_comment(&mut self) {
        // "--" runs to a closing "--" or to end of line.
        self.bump();
        self.bump();
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                return;
            }
            if ch == '-' && self.peek_at(1) == Some('-') {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), Error> {
        self.bump();
        self.bump();
        let mut depth = 1usize;
        while depth > 0 {
            match (self.peek(), self.peek_at(1)) {
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    self.bump();
                    self.bump();
                    depth -= 1;
                }
                (Some(_), _) => {
                    self.bump();
                }
                (None, _) => return Err(self.error("unterminated comment")),
            }
        }
        Ok(())
    }

    fn lex_identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() {
                name.push(ch);
                self.bump();
            } else if ch == '-' && self.peek_at(1).is_some_and(|c| c.is_ascii_alphanumeric()) {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn lex_number(&mut self) -> String {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.bump();
            } else if ch == '.' && self.peek_at(1) != Some('.') && !text.contains('.') {
                text.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn lex_quoted(&mut self) -> Result<String, Error> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(text),
                Some(ch) => text.push(ch),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn lex_single_quoted(&mut self) -> Result<TokenKind, Error> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('\'') => break,
                Some(ch) if !ch.is_whitespace() => text.push(ch),
                Some(_) => {}
                None => return Err(self.error("unterminated string")),
            }
        }
        match self.bump() {
            Some('B') | Some('b') => Ok(TokenKind::BinString(text)),
            Some('H') | Some('h') => Ok(TokenKind::HexString(text)),
            _ => Err(self.error("expected 'B' or 'H' after quoted string")),
        }
    }
}

/// Splits `source` into tokens, stripping comments.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    while let Some(ch) = lexer.peek() {
        if ch.is_whitespace() {
            lexer.bump();
            continue;
        }
        if ch == '-' && lexer.peek_at(1) == Some('-') {
            lexer.skip_line_comment();
            continue;
        }
        if ch == '/' && lexer.peek_at(1) == Some('*') {
            lexer.skip_block_comment()?;
            continue;
        }

        let line = lexer.line;
        let column = lexer.column;
        let kind = match ch {
            'a'..='z' | 'A'..='Z' => TokenKind::Ident(lexer.lex_identifier()),
            '0'..='9' => TokenKind::Number(lexer.lex_number()),
            '-' if lexer.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                TokenKind::Number(lexer.lex_number())
            }
            '"' => TokenKind::QuotedString(lexer.lex_quoted()?),
            '\'' => lexer.lex_single_quoted()?,
            ':' => {
                if lexer.peek_at(1) == Some(':') && lexer.peek_at(2) == Some('=') {
                    lexer.bump();
                    lexer.bump();
                    lexer.bump();
                    TokenKind::Assign
                } else {
                    return Err(lexer.error("expected '::='"));
                }
            }
            '.' => {
                if lexer.peek_at(1) == Some('.') {
                    if lexer.peek_at(2) == Some('.') {
                        lexer.bump();
                        lexer.bump();
                        lexer.bump();
                        TokenKind::Ellipsis
                    } else {
                        lexer.bump();
                        lexer.bump();
                        TokenKind::Range
                    }
                } else {
                    return Err(lexer.error("unexpected '.'"));
                }
            }
            '{' | '}' | '(' | ')' | '[' | ']' | ',' | ';' | '|' => {
                lexer.bump();
                match ch {
                    '{' => TokenKind::LBrace,
                    '}' => TokenKind::RBrace,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '[' => TokenKind::LBracket,
                    ']' => TokenKind::RBracket,
                    ',' => TokenKind::Comma,
                    ';' => TokenKind::Semicolon,
                    _ => TokenKind::Pipe,
                }
            }
            other => return Err(lexer.error(format!("unexpected character '{other}'"))),
        };
        tokens.push(Token { kind, line, column });
    }

    Ok(tokens)
}

#[test]
fn tokens_and_positions() {
    let tokens = tokenize("Foo DEFINITIONS ::= BEGIN\nFoo ::= [2] INTEGER\nEND").unwrap();
    let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
    assert_eq!(
        kinds,
        [
            &TokenKind::Ident("Foo".into()),
            &TokenKind::Ident("DEFINITIONS".into()),
            &TokenKind::Assign,
            &TokenKind::Ident("BEGIN".into()),
            &TokenKind::Ident("Foo".into()),
            &TokenKind::Assign,
            &TokenKind::LBracket,
            &TokenKind::Number("2".into()),
            &TokenKind::RBracket,
            &TokenKind::Ident("INTEGER".into()),
            &TokenKind::Ident("END".into()),
        ]
    );
    assert_eq!((tokens[4].line, tokens[4].column), (2, 1));
    assert_eq!((tokens[10].line, tokens[10].column), (3, 1));
}

#[test]
fn comments_are_stripped() {
    let tokens = tokenize("a -- inline -- b\nc -- to end of line\nd /* block /* nested */ */ e").unwrap();
    let names: Vec<String> = tokens
        .iter()
        .map(|t| match &t.kind {
            TokenKind::Ident(name) => name.clone(),
            other => panic!("unexpected token {other:?}"),
        })
        .collect();
    assert_eq!(names, ["a", "b", "c", "d", "e"]);
}

#[test]
fn hyphenated_identifiers_and_numbers() {
    let tokens = tokenize("bit-string ::= -5 1..99 1.5").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Ident("bit-string".into()));
    assert_eq!(tokens[2].kind, TokenKind::Number("-5".into()));
    assert_eq!(tokens[3].kind, TokenKind::Number("1".into()));
    assert_eq!(tokens[4].kind, TokenKind::Range);
    assert_eq!(tokens[5].kind, TokenKind::Number("99".into()));
    assert_eq!(tokens[6].kind, TokenKind::Number("1.5".into()));
}

#[test]
fn quoted_strings() {
    let tokens = tokenize("\"foo\" '0101'B 'AF'H").unwrap();
    assert_eq!(tokens[0].kind, TokenKind::QuotedString("foo".into()));
    assert_eq!(tokens[1].kind, TokenKind::BinString("0101".into()));
    assert_eq!(tokens[2].kind, TokenKind::HexString("AF".into()));
}
