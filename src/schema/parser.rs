//! Recursive-descent parser for the ASN.1 subset used by the compiler.
//!
//! The output is the [`ast`] form also accepted by
//! [`crate::compile_modules`], so parsed and externally supplied schemas run
//! through identical machinery.

use std::collections::BTreeMap;
use std::{error, fmt};

use crate::schema::ast::{
    Class, Constraint, Literal, Member, MemberItem, Module, TagDefault, TagDirective, TagMode,
    TypeDescriptor, TypeKind, ValueAssignment,
};
use crate::schema::lexer::{self, Token, TokenKind};

/// Parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed input.
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
    /// Well-formed ASN.1 that this subset deliberately does not accept.
    Unsupported {
        line: usize,
        column: usize,
        construct: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax {
                line,
                column,
                message,
            } => write!(f, "invalid syntax at line {line}, column {column}: {message}"),
            Self::Unsupported {
                line,
                column,
                construct,
            } => write!(
                f,
                "unsupported construct at line {line}, column {column}: {construct}"
            ),
        }
    }
}

impl error::Error for Error {}

impl From<lexer::Error> for Error {
    fn from(err: lexer::Error) -> Self {
        Self::Syntax {
            line: err.line,
            column: err.column,
            message: err.message,
        }
    }
}

/// Parses ASN.1 source text into modules.
pub fn parse(source: &str) -> Result<Vec<Module>, Error> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut modules = Vec::new();
    while !parser.is_at_end() {
        modules.push(parser.parse_module()?);
    }
    Ok(modules)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn position(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map_or((1, 1), |t| (t.line, t.column))
    }

    fn syntax_error(&self, message: impl Into<String>) -> Error {
        let (line, column) = self.position();
        Error::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn unsupported(&self, construct: impl Into<String>) -> Error {
        let (line, column) = self.position();
        Error::Unsupported {
            line,
            column,
            construct: construct.into(),
        }
    }

    fn next(&mut self) -> Result<&Token, Error> {
        if self.pos >= self.tokens.len() {
            return Err(self.syntax_error("unexpected end of input"));
        }
        self.pos += 1;
        Ok(&self.tokens[self.pos - 1])
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.eat(kind) {
            Ok(())
        } else {
            let found = match self.peek() {
                Some(kind) => format!("{kind}"),
                None => "end of input".to_owned(),
            };
            Err(self.syntax_error(format!("expected {kind} but found {found}")))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(TokenKind::Ident(name)) if name == keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), Error> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.syntax_error(format!("expected '{keyword}'")))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        match self.peek() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.syntax_error("expected an identifier")),
        }
    }

    fn expect_integer(&mut self) -> Result<i64, Error> {
        match self.peek() {
            Some(TokenKind::Number(text)) => {
                let number = text
                    .parse::<i64>()
                    .map_err(|_| self.syntax_error(format!("invalid number '{text}'")))?;
                self.pos += 1;
                Ok(number)
            }
            _ => Err(self.syntax_error("expected a number")),
        }
    }

    fn parse_module(&mut self) -> Result<Module, Error> {
        let name = self.expect_ident()?;
        let mut module = Module::new(name);
        self.expect_keyword("DEFINITIONS")?;

        if self.eat_keyword("EXPLICIT") {
            self.expect_keyword("TAGS")?;
        } else if self.eat_keyword("IMPLICIT") {
            self.expect_keyword("TAGS")?;
            module.tag_default = TagDefault::Implicit;
        } else if self.eat_keyword("AUTOMATIC") {
            self.expect_keyword("TAGS")?;
            module.tag_default = TagDefault::Automatic;
        }
        if self.eat_keyword("EXTENSIBILITY") {
            self.expect_keyword("IMPLIED")?;
            module.extensibility_implied = true;
        }

        self.expect(&TokenKind::Assign)?;
        self.expect_keyword("BEGIN")?;

        if self.eat_keyword("EXPORTS") {
            while self.peek() != Some(&TokenKind::Semicolon) {
                self.next()?;
            }
            self.expect(&TokenKind::Semicolon)?;
        }
        if self.eat_keyword("IMPORTS") {
            self.parse_imports(&mut module)?;
        }

        while !self.at_keyword("END") {
            self.parse_assignment(&mut module)?;
        }
        self.expect_keyword("END")?;

        Ok(module)
    }

    fn parse_imports(&mut self, module: &mut Module) -> Result<(), Error> {
        let mut symbols = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::Semicolon) => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::Ident(name)) if name == "FROM" => {
                    self.pos += 1;
                    let from = self.expect_ident()?;
                    module
                        .imports
                        .entry(from)
                        .or_default()
                        .append(&mut symbols);
                }
                Some(TokenKind::Ident(_)) => {
                    symbols.push(self.expect_ident()?);
                    // An imported enumeration may spell `Name {}`; nothing in
                    // the subset needs the braces.
                    if self.peek() == Some(&TokenKind::LBrace) {
                        self.skip_braces()?;
                    }
                }
                _ => return Err(self.syntax_error("expected an import list")),
            }
        }
    }

    fn skip_braces(&mut self) -> Result<(), Error> {
        self.expect(&TokenKind::LBrace)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.next()?.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_assignment(&mut self, module: &mut Module) -> Result<(), Error> {
        let name = match self.peek() {
            Some(TokenKind::Ident(name)) => name.clone(),
            _ => return Err(self.syntax_error("expected a type or value assignment")),
        };

        if name.starts_with(char::is_uppercase) && self.peek_at(1) == Some(&TokenKind::Assign) {
            self.pos += 2;
            let descriptor = self.parse_type()?;
            module.types.insert(name, descriptor);
        } else {
            self.pos += 1;
            let ty = self.parse_type()?;
            self.expect(&TokenKind::Assign)?;
            let value = self.parse_value()?;
            module.values.insert(name, ValueAssignment { ty, value });
        }
        Ok(())
    }

    fn parse_type(&mut self) -> Result<TypeDescriptor, Error> {
        let tag = self.parse_tag_directive()?;
        let mut descriptor = self.parse_type_kernel()?;
        descriptor.tag = tag;
        while self.peek() == Some(&TokenKind::LParen) {
            self.parse_constraint(&mut descriptor)?;
        }
        Ok(descriptor)
    }

    fn parse_tag_directive(&mut self) -> Result<Option<TagDirective>, Error> {
        if self.peek() != Some(&TokenKind::LBracket) {
            return Ok(None);
        }
        if self.peek_at(1) == Some(&TokenKind::LBracket) {
            return Err(self.unsupported("version brackets '[['"));
        }
        self.pos += 1;

        let class = if self.eat_keyword("UNIVERSAL") {
            Class::Universal
        } else if self.eat_keyword("APPLICATION") {
            Class::Application
        } else if self.eat_keyword("PRIVATE") {
            Class::Private
        } else {
            Class::Context
        };
        let number = self.expect_integer()?;
        let number = u32::try_from(number)
            .map_err(|_| self.syntax_error(format!("invalid tag number {number}")))?;
        self.expect(&TokenKind::RBracket)?;

        let mode = if self.eat_keyword("IMPLICIT") {
            Some(TagMode::Implicit)
        } else if self.eat_keyword("EXPLICIT") {
            Some(TagMode::Explicit)
        } else {
            None
        };

        Ok(Some(TagDirective {
            class,
            number,
            mode,
        }))
    }

    fn parse_type_kernel(&mut self) -> Result<TypeDescriptor, Error> {
        let name = self.expect_ident()?;
        match name.as_str() {
            "SEQUENCE" => return self.parse_sequence_like(true),
            "SET" => return self.parse_sequence_like(false),
            _ => {}
        }
        let kind = match name.as_str() {
            "BOOLEAN" => TypeKind::Boolean,
            "INTEGER" => {
                // Named numbers are accepted and dropped; they never affect
                // the encoding.
                if self.peek() == Some(&TokenKind::LBrace) {
                    self.skip_braces()?;
                }
                TypeKind::Integer
            }
            "BIT" => {
                self.expect_keyword("STRING")?;
                if self.peek() == Some(&TokenKind::LBrace) {
                    self.skip_braces()?;
                }
                TypeKind::BitString
            }
            "OCTET" => {
                self.expect_keyword("STRING")?;
                TypeKind::OctetString
            }
            "NULL" => TypeKind::Null,
            "OBJECT" => {
                self.expect_keyword("IDENTIFIER")?;
                TypeKind::ObjectIdentifier
            }
            "REAL" => TypeKind::Real,
            "ENUMERATED" => TypeKind::Enumerated(self.parse_enumeration()?),
            "UTF8String" => TypeKind::Utf8String,
            "NumericString" => TypeKind::NumericString,
            "PrintableString" => TypeKind::PrintableString,
            "IA5String" => TypeKind::Ia5String,
            "VisibleString" => TypeKind::VisibleString,
            "UniversalString" => TypeKind::UniversalString,
            "BMPString" => TypeKind::BmpString,
            "TeletexString" => TypeKind::TeletexString,
            "UTCTime" => TypeKind::UtcTime,
            "GeneralizedTime" => TypeKind::GeneralizedTime,
            "CHOICE" => TypeKind::Choice(self.parse_members()?),
            "ANY" => {
                if self.eat_keyword("DEFINED") {
                    self.expect_keyword("BY")?;
                    TypeKind::AnyDefinedBy(self.expect_ident()?)
                } else {
                    TypeKind::Any
                }
            }
            "CLASS" | "MACRO" | "INSTANCE" | "EMBEDDED" | "EXTERNAL" | "CHARACTER" => {
                return Err(self.unsupported(format!("'{name}'")));
            }
            _ if name.starts_with(char::is_uppercase) => {
                if self.peek() == Some(&TokenKind::LBrace) {
                    return Err(self.unsupported("parameterized types"));
                }
                TypeKind::Reference(name)
            }
            _ => return Err(self.syntax_error(format!("expected a type but found '{name}'"))),
        };
        Ok(TypeDescriptor::new(kind))
    }

    /// `SEQUENCE`/`SET` continue either with a member list or with
    /// `[SIZE (...)] OF Type`. A size constraint written between the keyword
    /// and `OF` belongs to the OF type itself.
    fn parse_sequence_like(&mut self, is_sequence: bool) -> Result<TypeDescriptor, Error> {
        if self.peek() == Some(&TokenKind::LBrace) {
            let members = self.parse_members()?;
            return Ok(TypeDescriptor::new(if is_sequence {
                TypeKind::Sequence(members)
            } else {
                TypeKind::Set(members)
            }));
        }

        let mut descriptor = TypeDescriptor::new(TypeKind::Null);
        loop {
            if self.peek() == Some(&TokenKind::LParen) {
                self.parse_constraint(&mut descriptor)?;
            } else if self.eat_keyword("SIZE") {
                // `SET SIZE (1..9) OF`: the shorthand without outer
                // parentheses.
                self.expect(&TokenKind::LParen)?;
                let start = self.pos;
                let mut items = Vec::new();
                if self.try_constraint_items(&mut items) && self.eat(&TokenKind::RParen) {
                    descriptor.size.append(&mut items);
                } else {
                    self.pos = start;
                    self.skip_balanced_parens()?;
                }
            } else {
                break;
            }
        }
        self.expect_keyword("OF")?;
        let element = Box::new(self.parse_type()?);
        descriptor.kind = if is_sequence {
            TypeKind::SequenceOf(element)
        } else {
            TypeKind::SetOf(element)
        };
        Ok(descriptor)
    }

    fn parse_enumeration(&mut self) -> Result<BTreeMap<i64, String>, Error> {
        self.expect(&TokenKind::LBrace)?;
        let mut values = BTreeMap::new();
        let mut next_number = 0i64;
        loop {
            match self.peek() {
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    return Ok(values);
                }
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::Ellipsis) => {
                    self.pos += 1;
                }
                Some(TokenKind::Ident(_)) => {
                    let name = self.expect_ident()?;
                    let number = if self.peek() == Some(&TokenKind::LParen) {
                        self.pos += 1;
                        let number = self.expect_integer()?;
                        self.expect(&TokenKind::RParen)?;
                        number
                    } else {
                        next_number
                    };
                    next_number = number + 1;
                    values.insert(number, name);
                }
                _ => return Err(self.syntax_error("expected an enumeration value")),
            }
        }
    }

    fn parse_members(&mut self) -> Result<Vec<MemberItem>, Error> {
        self.expect(&TokenKind::LBrace)?;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(TokenKind::Ellipsis) => {
                    self.pos += 1;
                    items.push(MemberItem::Extension);
                }
                Some(TokenKind::LBracket) if self.peek_at(1) == Some(&TokenKind::LBracket) => {
                    return Err(self.unsupported("version brackets '[['"));
                }
                Some(TokenKind::Ident(name)) if name == "COMPONENTS" => {
                    self.pos += 1;
                    self.expect_keyword("OF")?;
                    let ty = self.parse_type()?;
                    match ty.kind {
                        TypeKind::Reference(name) => items.push(MemberItem::ComponentsOf(name)),
                        _ => return Err(self.unsupported("COMPONENTS OF an inline type")),
                    }
                }
                Some(TokenKind::Ident(name)) if name.starts_with(char::is_lowercase) => {
                    let name = self.expect_ident()?;
                    let ty = self.parse_type()?;
                    let mut member = Member::new(name, ty);
                    if self.eat_keyword("OPTIONAL") {
                        member.optional = true;
                    } else if self.eat_keyword("DEFAULT") {
                        member.default = Some(self.parse_value()?);
                    }
                    items.push(MemberItem::Member(member));
                }
                _ => return Err(self.syntax_error("expected a member")),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Literal, Error> {
        match self.peek() {
            Some(TokenKind::Number(text)) => {
                let text = text.clone();
                self.pos += 1;
                if text.contains('.') {
                    Ok(Literal::Real(text))
                } else {
                    text.parse::<i64>()
                        .map(Literal::Integer)
                        .map_err(|_| self.syntax_error(format!("invalid number '{text}'")))
                }
            }
            Some(TokenKind::QuotedString(text)) => {
                let text = text.clone();
                self.pos += 1;
                Ok(Literal::Text(text))
            }
            Some(TokenKind::BinString(bits)) => {
                let bits = bits.clone();
                self.pos += 1;
                let mut bytes = vec![0u8; bits.len().div_ceil(8)];
                for (i, bit) in bits.chars().enumerate() {
                    match bit {
                        '1' => bytes[i / 8] |= 0x80 >> (i % 8),
                        '0' => {}
                        _ => return Err(self.syntax_error("invalid binary string")),
                    }
                }
                Ok(Literal::Bytes(bytes))
            }
            Some(TokenKind::HexString(digits)) => {
                let digits = digits.clone();
                self.pos += 1;
                let mut bytes = Vec::with_capacity(digits.len().div_ceil(2));
                let mut nibbles = digits.chars();
                while let Some(high) = nibbles.next() {
                    let high = high
                        .to_digit(16)
                        .ok_or_else(|| self.syntax_error("invalid hexadecimal string"))?;
                    let low = match nibbles.next() {
                        Some(low) => low
                            .to_digit(16)
                            .ok_or_else(|| self.syntax_error("invalid hexadecimal string"))?,
                        None => 0,
                    };
                    bytes.push(((high << 4) | low) as u8);
                }
                Ok(Literal::Bytes(bytes))
            }
            Some(TokenKind::LBrace) => self.parse_object_identifier_value(),
            Some(TokenKind::Ident(name)) => {
                let literal = match name.as_str() {
                    "TRUE" => Literal::Boolean(true),
                    "FALSE" => Literal::Boolean(false),
                    "NULL" => Literal::Null,
                    other => Literal::Identifier(other.to_owned()),
                };
                self.pos += 1;
                Ok(literal)
            }
            _ => Err(self.syntax_error("expected a value")),
        }
    }

    /// `{ iso(1) member-body(2) 840 }` and friends; named components without
    /// a number keep their name.
    fn parse_object_identifier_value(&mut self) -> Result<Literal, Error> {
        self.expect(&TokenKind::LBrace)?;
        let mut components = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::RBrace) => {
                    self.pos += 1;
                    return Ok(Literal::ObjectIdentifier(components.join(".")));
                }
                Some(TokenKind::Number(text)) => {
                    components.push(text.clone());
                    self.pos += 1;
                }
                Some(TokenKind::Ident(_)) => {
                    let name = self.expect_ident()?;
                    if self.peek() == Some(&TokenKind::LParen) {
                        self.pos += 1;
                        let number = self.expect_integer()?;
                        self.expect(&TokenKind::RParen)?;
                        components.push(number.to_string());
                    } else {
                        components.push(name);
                    }
                }
                _ => return Err(self.syntax_error("expected an object identifier component")),
            }
        }
    }

    /// Constraints are recorded, never enforced. Anything beyond simple
    /// `SIZE`/value/range constraints is skipped over.
    fn parse_constraint(&mut self, descriptor: &mut TypeDescriptor) -> Result<(), Error> {
        self.expect(&TokenKind::LParen)?;
        let start = self.pos;

        let mut items = Vec::new();
        let committed = if self.eat_keyword("SIZE") {
            self.eat(&TokenKind::LParen)
                && self.try_constraint_items(&mut items)
                && self.eat(&TokenKind::RParen)
                && self.eat(&TokenKind::RParen)
                && {
                    descriptor.size.append(&mut items);
                    true
                }
        } else {
            self.try_constraint_items(&mut items) && self.eat(&TokenKind::RParen) && {
                descriptor.restricted_to.append(&mut items);
                true
            }
        };
        if committed {
            return Ok(());
        }

        // Not a shape this subset records (permitted alphabets, inner
        // subtyping); rewind and skip the balanced region.
        self.pos = start;
        self.skip_balanced_parens()
    }

    /// Consumes up to and including the `)` matching an already-consumed
    /// `(`.
    fn skip_balanced_parens(&mut self) -> Result<(), Error> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next()?.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn try_constraint_items(&mut self, items: &mut Vec<Constraint>) -> bool {
        loop {
            match self.peek() {
                Some(TokenKind::RParen) => return true,
                Some(TokenKind::Comma) | Some(TokenKind::Pipe) | Some(TokenKind::Ellipsis) => {
                    self.pos += 1;
                }
                Some(TokenKind::Ident(name))
                    if matches!(
                        name.as_str(),
                        "FROM" | "WITH" | "INCLUDES" | "PATTERN" | "CONTAINING" | "ALL"
                    ) =>
                {
                    return false;
                }
                _ => {
                    let Ok(low) = self.parse_value() else {
                        return false;
                    };
                    let constraint = if self.eat(&TokenKind::Range) {
                        let Ok(high) = self.parse_value() else {
                            return false;
                        };
                        Constraint::Range(low, high)
                    } else {
                        Constraint::Single(low)
                    };
                    items.push(constraint);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_header_defaults() {
        let modules = parse("Foo DEFINITIONS ::= BEGIN Foo ::= INTEGER END").unwrap();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].name, "Foo");
        assert_eq!(modules[0].tag_default, TagDefault::Explicit);
        assert!(!modules[0].extensibility_implied);
        assert_eq!(modules[0].types["Foo"].kind, TypeKind::Integer);
    }

    #[test]
    fn module_header_variants() {
        let modules = parse(
            "A DEFINITIONS IMPLICIT TAGS ::= BEGIN END \
             B DEFINITIONS AUTOMATIC TAGS EXTENSIBILITY IMPLIED ::= BEGIN END",
        )
        .unwrap();
        assert_eq!(modules[0].tag_default, TagDefault::Implicit);
        assert_eq!(modules[1].tag_default, TagDefault::Automatic);
        assert!(modules[1].extensibility_implied);
    }

    #[test]
    fn tagged_types() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             A ::= [2] INTEGER \
             B ::= [2] IMPLICIT INTEGER \
             C ::= [APPLICATION 10] EXPLICIT OCTET STRING \
             D ::= [PRIVATE 0] REAL \
             END",
        )
        .unwrap();
        let types = &modules[0].types;
        assert_eq!(
            types["A"].tag,
            Some(TagDirective {
                class: Class::Context,
                number: 2,
                mode: None
            })
        );
        assert_eq!(types["B"].tag.as_ref().unwrap().mode, Some(TagMode::Implicit));
        assert_eq!(types["C"].tag.as_ref().unwrap().class, Class::Application);
        assert_eq!(types["D"].tag.as_ref().unwrap().class, Class::Private);
    }

    #[test]
    fn sequence_members() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             Question ::= SEQUENCE { id INTEGER, question IA5String } \
             Sequence2 ::= SEQUENCE { a INTEGER DEFAULT 0 } \
             Sequence3 ::= SEQUENCE { a BOOLEAN, ..., b BOOLEAN OPTIONAL } \
             END",
        )
        .unwrap();
        let types = &modules[0].types;

        let TypeKind::Sequence(items) = &types["Question"].kind else {
            panic!("expected a SEQUENCE");
        };
        assert_eq!(items.len(), 2);
        let MemberItem::Member(id) = &items[0] else {
            panic!("expected a member");
        };
        assert_eq!(id.name, "id");
        assert_eq!(id.ty.kind, TypeKind::Integer);

        let TypeKind::Sequence(items) = &types["Sequence2"].kind else {
            panic!("expected a SEQUENCE");
        };
        let MemberItem::Member(a) = &items[0] else {
            panic!("expected a member");
        };
        assert_eq!(a.default, Some(Literal::Integer(0)));

        let TypeKind::Sequence(items) = &types["Sequence3"].kind else {
            panic!("expected a SEQUENCE");
        };
        assert_eq!(items[1], MemberItem::Extension);
        let MemberItem::Member(b) = &items[2] else {
            panic!("expected a member");
        };
        assert!(b.optional);
    }

    #[test]
    fn choice_and_of_types() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             Pick ::= CHOICE { number INTEGER, text IA5String } \
             Numbers ::= SEQUENCE OF INTEGER \
             Words ::= SET SIZE (1..9) OF IA5String \
             END",
        )
        .unwrap();
        let types = &modules[0].types;
        assert!(matches!(types["Pick"].kind, TypeKind::Choice(ref items) if items.len() == 2));
        assert!(matches!(types["Numbers"].kind, TypeKind::SequenceOf(_)));
        assert!(matches!(types["Words"].kind, TypeKind::SetOf(_)));
    }

    #[test]
    fn enumerations() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             E1 ::= ENUMERATED { one(1), two(2) } \
             E2 ::= ENUMERATED { red, green, blue } \
             E3 ::= ENUMERATED { a(1), ..., b(5) } \
             END",
        )
        .unwrap();
        let types = &modules[0].types;
        assert_eq!(
            types["E1"].kind,
            TypeKind::Enumerated(BTreeMap::from([(1, "one".into()), (2, "two".into())]))
        );
        assert_eq!(
            types["E2"].kind,
            TypeKind::Enumerated(BTreeMap::from([
                (0, "red".into()),
                (1, "green".into()),
                (2, "blue".into())
            ]))
        );
        assert_eq!(
            types["E3"].kind,
            TypeKind::Enumerated(BTreeMap::from([(1, "a".into()), (5, "b".into())]))
        );
    }

    #[test]
    fn imports_and_values() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             IMPORTS Bar, Baz FROM Other Qux FROM Third; \
             internet OBJECT IDENTIFIER ::= { iso(1) org(3) 6 1 } \
             limit INTEGER ::= 64 \
             Wrapper ::= SEQUENCE { bar Bar } \
             END",
        )
        .unwrap();
        let module = &modules[0];
        assert_eq!(module.imports["Other"], ["Bar", "Baz"]);
        assert_eq!(module.imports["Third"], ["Qux"]);
        assert_eq!(
            module.values["internet"].value,
            Literal::ObjectIdentifier("1.3.6.1".into())
        );
        assert_eq!(module.values["limit"].value, Literal::Integer(64));
    }

    #[test]
    fn any_defined_by() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             Fie ::= SEQUENCE { bar INTEGER, fum ANY DEFINED BY bar } \
             Raw ::= ANY \
             END",
        )
        .unwrap();
        let types = &modules[0].types;
        let TypeKind::Sequence(items) = &types["Fie"].kind else {
            panic!("expected a SEQUENCE");
        };
        let MemberItem::Member(fum) = &items[1] else {
            panic!("expected a member");
        };
        assert_eq!(fum.ty.kind, TypeKind::AnyDefinedBy("bar".into()));
        assert_eq!(types["Raw"].kind, TypeKind::Any);
    }

    #[test]
    fn constraints_are_recorded() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             I ::= INTEGER (1..99) \
             S ::= OCTET STRING (SIZE (4 | 9)) \
             T ::= IA5String (\"foo\" | \"bar\") \
             F ::= IA5String (FROM (\"a\"..\"z\")) \
             END",
        )
        .unwrap();
        let types = &modules[0].types;
        assert_eq!(
            types["I"].restricted_to,
            [Constraint::Range(Literal::Integer(1), Literal::Integer(99))]
        );
        assert_eq!(
            types["S"].size,
            [
                Constraint::Single(Literal::Integer(4)),
                Constraint::Single(Literal::Integer(9))
            ]
        );
        assert_eq!(
            types["T"].restricted_to,
            [
                Constraint::Single(Literal::Text("foo".into())),
                Constraint::Single(Literal::Text("bar".into()))
            ]
        );
        // Permitted alphabets are skipped, not recorded.
        assert_eq!(types["F"].restricted_to, []);
    }

    #[test]
    fn components_of() {
        let modules = parse(
            "Foo DEFINITIONS ::= BEGIN \
             Base ::= SEQUENCE { a INTEGER } \
             Full ::= SEQUENCE { COMPONENTS OF Base, b BOOLEAN } \
             END",
        )
        .unwrap();
        let TypeKind::Sequence(items) = &modules[0].types["Full"].kind else {
            panic!("expected a SEQUENCE");
        };
        assert_eq!(items[0], MemberItem::ComponentsOf("Base".into()));
    }

    #[test]
    fn syntax_error_positions() {
        let err = parse("Foo DEFINITIONS ::= BEGIN\nBar ::= SEQUENCE { a }\nEND").unwrap_err();
        match err {
            Error::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unsupported_constructs() {
        let err = parse("Foo DEFINITIONS ::= BEGIN X ::= CLASS { id INTEGER } END").unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));

        let err =
            parse("Foo DEFINITIONS ::= BEGIN X ::= SEQUENCE { a BOOLEAN, [[ b BOOLEAN ]] } END")
                .unwrap_err();
        assert!(matches!(err, Error::Unsupported { .. }));
    }
}
