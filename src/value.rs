use std::collections::BTreeMap;
use std::fmt;

/// A decoded or encodable ASN.1 value.
///
/// One variant per family of ASN.1 types: all of the character string types
/// map onto [`Value::Text`], the opaque string types (`BMPString`,
/// `UniversalString`, `TeletexString`) and `OCTET STRING` onto
/// [`Value::Bytes`], and the constructed types onto [`Value::List`],
/// [`Value::Record`] and [`Value::Choice`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `BOOLEAN`
    Boolean(bool),
    /// `INTEGER` and the numeric side of `ENUMERATED`
    Integer(i64),
    /// `REAL`
    Real(f64),
    /// `NULL`
    Null,
    /// `BIT STRING` as payload bytes plus the number of significant bits
    BitString {
        data: Vec<u8>,
        bit_length: usize,
    },
    /// `OCTET STRING`, `BMPString`, `UniversalString`, `TeletexString`,
    /// and raw `ANY` TLVs
    Bytes(Vec<u8>),
    /// Character string types, time types, and `ENUMERATED` identifiers
    Text(String),
    /// `OBJECT IDENTIFIER` in dotted form, e.g. `"1.3.6.2"`
    ObjectIdentifier(String),
    /// `SEQUENCE OF` / `SET OF`
    List(Vec<Value>),
    /// `SEQUENCE` / `SET` members keyed by member name
    Record(BTreeMap<String, Value>),
    /// `CHOICE` as the selected alternative's name and inner value
    Choice(String, Box<Value>),
}

impl Value {
    /// Builds a [`Value::Record`] from `(name, value)` pairs.
    pub fn record<I, S>(members: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Self::Record(
            members
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        )
    }

    /// Builds a [`Value::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Builds a [`Value::Bytes`].
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Builds a [`Value::ObjectIdentifier`] from a dotted string.
    pub fn oid(oid: impl Into<String>) -> Self {
        Self::ObjectIdentifier(oid.into())
    }

    /// Builds a [`Value::BitString`].
    pub fn bit_string(data: impl Into<Vec<u8>>, bit_length: usize) -> Self {
        Self::BitString {
            data: data.into(),
            bit_length,
        }
    }

    /// Builds a [`Value::Choice`].
    pub fn choice(name: impl Into<String>, value: Value) -> Self {
        Self::Choice(name.into(), Box::new(value))
    }

    /// Builds a [`Value::List`].
    pub fn list(values: impl Into<Vec<Value>>) -> Self {
        Self::List(values.into())
    }

    /// If it is a `Record`, returns the member map. Returns `None` otherwise.
    #[must_use]
    pub fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Record(members) => Some(members),
            _ => None,
        }
    }

    /// If it is a `List`, returns the elements. Returns `None` otherwise.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    /// If it is an `Integer`, returns it. Returns `None` otherwise.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// If it is a `Text`, returns it. Returns `None` otherwise.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The `ANY DEFINED BY` discriminator this value selects, if any.
    #[must_use]
    pub fn discriminant(&self) -> Option<Discriminant> {
        match self {
            Self::Integer(number) => Some(Discriminant::Integer(*number)),
            Self::ObjectIdentifier(oid) => Some(Discriminant::ObjectIdentifier(oid.clone())),
            _ => None,
        }
    }

    /// Short label used in error messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "a BOOLEAN value",
            Self::Integer(_) => "an INTEGER value",
            Self::Real(_) => "a REAL value",
            Self::Null => "NULL",
            Self::BitString { .. } => "a BIT STRING value",
            Self::Bytes(_) => "a byte string",
            Self::Text(_) => "a character string",
            Self::ObjectIdentifier(_) => "an OBJECT IDENTIFIER value",
            Self::List(_) => "a list",
            Self::Record(_) => "a record",
            Self::Choice(..) => "a CHOICE value",
        }
    }
}

/// Key of an `ANY DEFINED BY` choice table: the decoded value of the
/// discriminator member, which is either an `INTEGER` or an
/// `OBJECT IDENTIFIER`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Discriminant {
    Integer(i64),
    ObjectIdentifier(String),
}

impl fmt::Display for Discriminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(number) => number.fmt(f),
            Self::ObjectIdentifier(oid) => oid.fmt(f),
        }
    }
}
