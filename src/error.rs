use std::{error, fmt};

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn fmt_trail(f: &mut fmt::Formatter<'_>, location: &[String]) -> fmt::Result {
    // Innermost member is pushed first; render outermost first.
    for name in location.iter().rev() {
        write!(f, "{name}: ")?;
    }
    Ok(())
}

/// Encode error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeErrorKind {
    /// The requested type name is not defined by any module.
    UnknownType(String),
    /// The requested type name is defined by more than one module.
    AmbiguousType(String),
    /// A required `SEQUENCE`/`SET` member is absent from the user value.
    MissingMember(String),
    /// The named `CHOICE` alternative does not exist.
    NoSuchAlternative(String),
    /// The `ENUMERATED` identifier is not part of the enumeration.
    NoSuchEnumerationValue { value: String, names: Vec<String> },
    /// No sub-type is registered for this `ANY DEFINED BY` discriminator.
    UnknownDiscriminator(String),
    /// The supplied [`crate::Value`] variant does not fit the schema type.
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },
    /// The supplied value is of the right variant but malformed.
    InvalidValue(String),
    /// The type is self-referential.
    RecursiveType(String),
}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "type '{name}' not found"),
            Self::AmbiguousType(name) => {
                write!(f, "type '{name}' is defined in more than one module")
            }
            Self::MissingMember(name) => write!(f, "member '{name}' not found"),
            Self::NoSuchAlternative(name) => {
                write!(f, "CHOICE alternative '{name}' not found")
            }
            Self::NoSuchEnumerationValue { value, names } => {
                let names = names
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "enumeration value '{value}' not found in [{names}]")
            }
            Self::UnknownDiscriminator(value) => {
                write!(f, "unknown ANY DEFINED BY discriminator {value}")
            }
            Self::UnexpectedValue { expected, found } => {
                write!(f, "expected {expected} but got {found}")
            }
            Self::InvalidValue(message) => f.write_str(message),
            Self::RecursiveType(name) => {
                write!(f, "recursive type '{name}' is not yet implemented")
            }
        }
    }
}

/// Error returned by [`crate::Specification::encode`].
///
/// Carries the trail of member names from the outermost constructed type down
/// to the failing member.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeError {
    kind: EncodeErrorKind,
    location: Vec<String>,
}

impl EncodeError {
    pub(crate) fn new(kind: EncodeErrorKind) -> Self {
        Self {
            kind,
            location: Vec::new(),
        }
    }

    pub(crate) fn add_location(mut self, name: &str) -> Self {
        self.location.push(name.to_owned());
        self
    }

    #[must_use]
    pub fn kind(&self) -> &EncodeErrorKind {
        &self.kind
    }

    /// Member names from the failing member outwards.
    #[must_use]
    pub fn location(&self) -> &[String] {
        &self.location
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_trail(f, &self.location)?;
        self.kind.fmt(f)
    }
}

impl error::Error for EncodeError {}

/// Decode error kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeErrorKind {
    /// The requested type name is not defined by any module.
    UnknownType(String),
    /// The requested type name is defined by more than one module.
    AmbiguousType(String),
    /// The input ended before the announced tag, length or contents.
    NotEnoughData,
    /// The tag on the wire does not match the schema.
    TagMismatch {
        type_name: String,
        expected: Vec<u8>,
        actual: Vec<u8>,
        offset: usize,
    },
    /// The decoded `ENUMERATED` number is not part of the enumeration.
    UnknownEnumerationNumber(i64),
    /// No sub-type is registered for this `ANY DEFINED BY` discriminator.
    UnknownDiscriminator(String),
    /// Indefinite length form where the encoding rules forbid it.
    IndefiniteLength,
    /// Bytes left over after the outermost TLV under DER.
    TrailingBytes(usize),
    /// The type is self-referential.
    RecursiveType(String),
    /// Anything else (malformed contents, overflows).
    Message(String),
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType(name) => write!(f, "type '{name}' not found"),
            Self::AmbiguousType(name) => {
                write!(f, "type '{name}' is defined in more than one module")
            }
            Self::NotEnoughData => f.write_str("Not enough data."),
            Self::TagMismatch {
                type_name,
                expected,
                actual,
                offset,
            } => write!(
                f,
                "expected {type_name} with tag 0x{} but got 0x{} at offset {offset}",
                hex(expected),
                hex(actual)
            ),
            Self::UnknownEnumerationNumber(number) => {
                write!(f, "enumeration number {number} not found")
            }
            Self::UnknownDiscriminator(value) => {
                write!(f, "unknown ANY DEFINED BY discriminator {value}")
            }
            Self::IndefiniteLength => f.write_str("indefinite length form is not allowed"),
            Self::TrailingBytes(count) => {
                write!(f, "found {count} trailing bytes after the decoded value")
            }
            Self::RecursiveType(name) => {
                write!(f, "recursive type '{name}' is not yet implemented")
            }
            Self::Message(message) => f.write_str(message),
        }
    }
}

/// Error returned by [`crate::Specification::decode`].
///
/// Renders as `outer: inner: <message>`, with the member-name trail built up
/// as the error propagates out of nested constructed types.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    location: Vec<String>,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind) -> Self {
        Self {
            kind,
            location: Vec::new(),
        }
    }

    pub(crate) fn not_enough_data() -> Self {
        Self::new(DecodeErrorKind::NotEnoughData)
    }

    pub(crate) fn tag_mismatch(
        type_name: &str,
        expected: &[u8],
        actual: &[u8],
        offset: usize,
    ) -> Self {
        Self::new(DecodeErrorKind::TagMismatch {
            type_name: type_name.to_owned(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            offset,
        })
    }

    pub(crate) fn message(message: impl Into<String>) -> Self {
        Self::new(DecodeErrorKind::Message(message.into()))
    }

    pub(crate) fn add_location(mut self, name: &str) -> Self {
        self.location.push(name.to_owned());
        self
    }

    #[must_use]
    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }

    /// Member names from the failing member outwards.
    #[must_use]
    pub fn location(&self) -> &[String] {
        &self.location
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_trail(f, &self.location)?;
        self.kind.fmt(f)
    }
}

impl error::Error for DecodeError {}

#[test]
fn trail_rendering() {
    let err = DecodeError::tag_mismatch("SEQUENCE", &[0x30], &[0x31], 150)
        .add_location("issuer")
        .add_location("tbsCertificate");
    assert_eq!(
        err.to_string(),
        "tbsCertificate: issuer: expected SEQUENCE with tag 0x30 but got 0x31 at offset 150"
    );

    let err = DecodeError::not_enough_data();
    assert_eq!(err.to_string(), "Not enough data.");

    let err = DecodeError::tag_mismatch("SEQUENCE", &[0x30], &[], 3).add_location("tbsCertificate");
    assert_eq!(
        err.to_string(),
        "tbsCertificate: expected SEQUENCE with tag 0x30 but got 0x at offset 3"
    );
}
