//! Codec nodes: the compiled, immutable graph walked by encode and decode.
//!
//! One node per ASN.1 type. A node owns its effective tag (the identifier
//! octets emitted on encode and required on decode) and a [`Kind`] carrying
//! the per-type data. Constructed kinds hold `Arc` edges to their child
//! nodes; cycles are cut at compile time by [`Kind::Recursive`] placeholders,
//! which fail at encode/decode call time.

use std::collections::BTreeMap;
use std::sync::Arc;

use bitflags::bitflags;

use crate::error::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};
use crate::spec::EncodingRules;
use crate::tlv::{self, Length, Reader};
use crate::value::{Discriminant, Value};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct MemberFlags: u8 {
        const OPTIONAL = 1;
        /// Lies between extensibility markers; absent members are skipped
        /// instead of rejected.
        const EXTENSION = 2;
    }
}

/// One member edge of a `SEQUENCE`/`SET` node.
#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub name: String,
    pub node: Arc<Node>,
    pub flags: MemberFlags,
    pub default: Option<Value>,
}

impl Member {
    fn is_skippable(&self) -> bool {
        self.flags
            .intersects(MemberFlags::OPTIONAL | MemberFlags::EXTENSION)
            || self.default.is_some()
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Kind {
    Boolean,
    Integer,
    Real,
    Null,
    ObjectIdentifier,
    BitString,
    OctetString,
    Utf8String,
    NumericString,
    PrintableString,
    Ia5String,
    VisibleString,
    UniversalString,
    BmpString,
    TeletexString,
    UtcTime,
    GeneralizedTime,
    Enumerated {
        by_name: BTreeMap<String, i64>,
        by_number: BTreeMap<i64, String>,
    },
    Sequence(Vec<Member>),
    Set(Vec<Member>),
    SequenceOf(Arc<Node>),
    SetOf(Arc<Node>),
    /// Tagless; borrows each alternative's tag.
    Choice(Vec<(String, Arc<Node>)>),
    /// An EXPLICIT tag wrapper around the inner node's complete TLV.
    Explicit(Arc<Node>),
    /// Raw TLV pass-through.
    Any,
    /// Sub-type selected by a sibling member's decoded value. `None` choices
    /// degrade to plain `ANY`.
    AnyDefinedBy {
        field: String,
        choices: Option<BTreeMap<Discriminant, Arc<Node>>>,
    },
    /// Placeholder cut into reference cycles.
    Recursive(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Name used in tag-mismatch messages: the universal type name, or
    /// `Tag` for explicit wrappers.
    pub type_name: String,
    /// Identifier octets on the wire. Empty for `CHOICE`/`ANY`, which have
    /// no tag of their own.
    pub tag: Vec<u8>,
    pub kind: Kind,
}

/// How far a definite or indefinite contents region extends.
#[derive(Debug, Clone, Copy)]
enum Region {
    /// Absolute end offset. May lie beyond the input when the length field
    /// overstates the data; reads past the end fail individually.
    Definite(usize),
    Indefinite,
}

impl Node {
    pub(crate) fn new(type_name: &str, tag: Vec<u8>, kind: Kind) -> Self {
        Self {
            type_name: type_name.to_owned(),
            tag,
            kind,
        }
    }

    /// Whether the constructed bit belongs in an IMPLICIT replacement tag.
    pub(crate) fn is_constructed(&self) -> bool {
        match &self.kind {
            Kind::Sequence(_)
            | Kind::Set(_)
            | Kind::SequenceOf(_)
            | Kind::SetOf(_)
            | Kind::Explicit(_)
            | Kind::Recursive(_) => true,
            _ => false,
        }
    }

    /// The kind behind any explicit-tag wrappers, for interpreting DEFAULT
    /// literals.
    pub(crate) fn base_kind(&self) -> &Kind {
        match &self.kind {
            Kind::Explicit(inner) => inner.base_kind(),
            other => other,
        }
    }

    // ------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------

    pub(crate) fn encode(&self, value: &Value, rules: EncodingRules) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        self.encode_into(value, rules, &mut out)?;
        Ok(out)
    }

    fn encode_into(
        &self,
        value: &Value,
        rules: EncodingRules,
        out: &mut Vec<u8>,
    ) -> Result<(), EncodeError> {
        match &self.kind {
            Kind::Choice(alternatives) => {
                let Value::Choice(name, inner) = value else {
                    return Err(self.unexpected_value("a CHOICE value", value));
                };
                let Some((_, node)) = alternatives.iter().find(|(n, _)| n == name) else {
                    return Err(EncodeError::new(EncodeErrorKind::NoSuchAlternative(
                        name.clone(),
                    )));
                };
                node.encode_into(inner, rules, out)
                    .map_err(|e| e.add_location(name))
            }
            Kind::Any
            | Kind::AnyDefinedBy { choices: None, .. } => {
                let Value::Bytes(raw) = value else {
                    return Err(self.unexpected_value("a raw TLV byte string", value));
                };
                out.extend_from_slice(raw);
                Ok(())
            }
            Kind::AnyDefinedBy { field, .. } => Err(EncodeError::new(
                EncodeErrorKind::InvalidValue(format!(
                    "ANY DEFINED BY {field} needs its enclosing SEQUENCE"
                )),
            )),
            Kind::Recursive(name) => Err(EncodeError::new(EncodeErrorKind::RecursiveType(
                name.clone(),
            ))),
            _ => {
                let contents = self.encode_contents(value, rules)?;
                out.extend_from_slice(&self.tag);
                tlv::encode_length(contents.len(), out);
                out.extend_from_slice(&contents);
                Ok(())
            }
        }
    }

    fn encode_contents(&self, value: &Value, rules: EncodingRules) -> Result<Vec<u8>, EncodeError> {
        match &self.kind {
            Kind::Boolean => match value {
                Value::Boolean(b) => Ok(vec![if *b { 0xff } else { 0x00 }]),
                _ => Err(self.unexpected_value("a BOOLEAN value", value)),
            },
            Kind::Integer => match value {
                Value::Integer(number) => Ok(signed_be_bytes(*number)),
                _ => Err(self.unexpected_value("an INTEGER value", value)),
            },
            Kind::Real => match value {
                Value::Real(number) => Ok(encode_real_contents(*number)),
                _ => Err(self.unexpected_value("a REAL value", value)),
            },
            Kind::Null => match value {
                Value::Null => Ok(Vec::new()),
                _ => Err(self.unexpected_value("NULL", value)),
            },
            Kind::ObjectIdentifier => match value {
                Value::ObjectIdentifier(oid) => encode_oid_contents(oid),
                _ => Err(self.unexpected_value("an OBJECT IDENTIFIER value", value)),
            },
            Kind::BitString => match value {
                Value::BitString { data, bit_length } => {
                    let unused = (8 - bit_length % 8) % 8;
                    let mut contents = Vec::with_capacity(1 + data.len());
                    contents.push(unused as u8);
                    contents.extend_from_slice(data);
                    Ok(contents)
                }
                _ => Err(self.unexpected_value("a BIT STRING value", value)),
            },
            Kind::OctetString | Kind::UniversalString | Kind::BmpString | Kind::TeletexString => {
                match value {
                    Value::Bytes(bytes) => Ok(bytes.clone()),
                    _ => Err(self.unexpected_value("a byte string", value)),
                }
            }
            Kind::Utf8String
            | Kind::NumericString
            | Kind::PrintableString
            | Kind::Ia5String
            | Kind::VisibleString => match value {
                Value::Text(text) => Ok(text.as_bytes().to_vec()),
                _ => Err(self.unexpected_value("a character string", value)),
            },
            Kind::UtcTime => match value {
                Value::Text(text) => {
                    let mut contents = text.as_bytes().to_vec();
                    contents.push(b'Z');
                    Ok(contents)
                }
                _ => Err(self.unexpected_value("a character string", value)),
            },
            Kind::GeneralizedTime => match value {
                Value::Text(text) => Ok(text.as_bytes().to_vec()),
                _ => Err(self.unexpected_value("a character string", value)),
            },
            Kind::Enumerated { by_name, by_number } => match value {
                Value::Text(name) => match by_name.get(name) {
                    Some(number) => Ok(signed_be_bytes(*number)),
                    None => Err(EncodeError::new(EncodeErrorKind::NoSuchEnumerationValue {
                        value: name.clone(),
                        names: by_number.values().cloned().collect(),
                    })),
                },
                _ => Err(self.unexpected_value("an enumeration identifier", value)),
            },
            Kind::Sequence(members) => match value {
                Value::Record(record) => encode_members(members, record, rules, false),
                _ => Err(self.unexpected_value("a record", value)),
            },
            Kind::Set(members) => match value {
                Value::Record(record) => {
                    encode_members(members, record, rules, rules == EncodingRules::Der)
                }
                _ => Err(self.unexpected_value("a record", value)),
            },
            Kind::SequenceOf(element) | Kind::SetOf(element) => match value {
                Value::List(values) => {
                    let mut contents = Vec::new();
                    for item in values {
                        element.encode_into(item, rules, &mut contents)?;
                    }
                    Ok(contents)
                }
                _ => Err(self.unexpected_value("a list", value)),
            },
            Kind::Explicit(inner) => inner.encode(value, rules),
            // Handled in encode_into.
            Kind::Choice(_) | Kind::Any | Kind::AnyDefinedBy { .. } | Kind::Recursive(_) => {
                Err(EncodeError::new(EncodeErrorKind::InvalidValue(
                    "tagless type has no contents encoding".to_owned(),
                )))
            }
        }
    }

    fn unexpected_value(&self, expected: &'static str, found: &Value) -> EncodeError {
        EncodeError::new(EncodeErrorKind::UnexpectedValue {
            expected,
            found: found.kind_name(),
        })
    }

    // ------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------

    pub(crate) fn decode(
        &self,
        reader: &mut Reader<'_>,
        rules: EncodingRules,
    ) -> Result<Value, DecodeError> {
        match &self.kind {
            Kind::Recursive(name) => Err(DecodeError::new(DecodeErrorKind::RecursiveType(
                name.clone(),
            ))),
            Kind::Choice(alternatives) => decode_choice(alternatives, reader, rules),
            Kind::Any | Kind::AnyDefinedBy { choices: None, .. } => decode_any(reader),
            Kind::AnyDefinedBy { field, .. } => Err(DecodeError::message(format!(
                "ANY DEFINED BY {field} needs its enclosing SEQUENCE"
            ))),
            _ => {
                self.expect_tag(reader)?;
                self.decode_after_tag(reader, rules)
            }
        }
    }

    fn expect_tag(&self, reader: &mut Reader<'_>) -> Result<(), DecodeError> {
        let offset = reader.pos();
        let actual = reader.peek_slice(self.tag.len());
        if actual != self.tag {
            return Err(DecodeError::tag_mismatch(
                &self.type_name,
                &self.tag,
                actual,
                offset,
            ));
        }
        reader.advance(self.tag.len())
    }

    /// Whether the upcoming tag selects this node, without consuming input.
    fn matches_tag(&self, reader: &Reader<'_>) -> bool {
        match &self.kind {
            Kind::Choice(alternatives) => alternatives
                .iter()
                .any(|(_, node)| node.matches_tag(reader)),
            Kind::Any | Kind::AnyDefinedBy { .. } | Kind::Recursive(_) => !reader.is_at_end(),
            _ => reader.peek_slice(self.tag.len()) == self.tag,
        }
    }

    fn decode_after_tag(
        &self,
        reader: &mut Reader<'_>,
        rules: EncodingRules,
    ) -> Result<Value, DecodeError> {
        match &self.kind {
            Kind::Sequence(members) | Kind::Set(members) => {
                let region = read_region(reader, rules)?;
                let value = decode_members(members, reader, rules, region)?;
                finish_region(reader, region)?;
                Ok(value)
            }
            Kind::SequenceOf(element) | Kind::SetOf(element) => {
                let region = read_region(reader, rules)?;
                let mut values = Vec::new();
                match region {
                    Region::Definite(end) => {
                        while reader.pos() < end {
                            values.push(element.decode(reader, rules)?);
                        }
                    }
                    Region::Indefinite => {
                        while !reader.at_end_of_contents() {
                            values.push(element.decode(reader, rules)?);
                        }
                        reader.read_end_of_contents()?;
                    }
                }
                Ok(Value::List(values))
            }
            Kind::Explicit(inner) => {
                let region = read_region(reader, rules)?;
                let value = inner.decode(reader, rules)?;
                finish_region(reader, region)?;
                Ok(value)
            }
            _ => {
                let contents = self.read_primitive_contents(reader)?;
                self.decode_primitive_contents(contents)
            }
        }
    }

    fn read_primitive_contents<'input>(
        &self,
        reader: &mut Reader<'input>,
    ) -> Result<&'input [u8], DecodeError> {
        match reader.read_length()? {
            Length::Definite(length) => reader.read_bytes(length),
            Length::Indefinite => Err(DecodeError::message(format!(
                "{} cannot use the indefinite length form",
                self.type_name
            ))),
        }
    }

    fn decode_primitive_contents(&self, contents: &[u8]) -> Result<Value, DecodeError> {
        match &self.kind {
            Kind::Boolean => {
                let [byte] = contents else {
                    return Err(DecodeError::message(
                        "BOOLEAN contents must be a single octet",
                    ));
                };
                Ok(Value::Boolean(*byte != 0))
            }
            Kind::Integer => Ok(Value::Integer(decode_integer_contents(contents)?)),
            Kind::Real => Ok(Value::Real(decode_real_contents(contents)?)),
            Kind::Null => Ok(Value::Null),
            Kind::ObjectIdentifier => decode_oid_contents(contents),
            Kind::BitString => {
                let Some((&unused, data)) = contents.split_first() else {
                    return Ok(Value::BitString {
                        data: Vec::new(),
                        bit_length: 0,
                    });
                };
                let bits = data.len() * 8;
                if unused > 7 || usize::from(unused) > bits {
                    return Err(DecodeError::message("invalid BIT STRING unused bit count"));
                }
                Ok(Value::BitString {
                    data: data.to_vec(),
                    bit_length: bits - usize::from(unused),
                })
            }
            Kind::OctetString | Kind::UniversalString | Kind::BmpString | Kind::TeletexString => {
                Ok(Value::Bytes(contents.to_vec()))
            }
            Kind::Utf8String
            | Kind::NumericString
            | Kind::PrintableString
            | Kind::Ia5String
            | Kind::VisibleString
            | Kind::GeneralizedTime
            | Kind::UtcTime => {
                let mut text = String::from_utf8(contents.to_vec())
                    .map_err(|_| DecodeError::message("invalid character data"))?;
                if matches!(self.kind, Kind::UtcTime | Kind::GeneralizedTime)
                    && text.ends_with('Z')
                {
                    text.pop();
                }
                Ok(Value::Text(text))
            }
            Kind::Enumerated { by_number, .. } => {
                let number = decode_integer_contents(contents)?;
                match by_number.get(&number) {
                    Some(name) => Ok(Value::Text(name.clone())),
                    None => Err(DecodeError::new(DecodeErrorKind::UnknownEnumerationNumber(
                        number,
                    ))),
                }
            }
            _ => Err(DecodeError::message("constructed type decoded as primitive")),
        }
    }
}

fn read_region(reader: &mut Reader<'_>, rules: EncodingRules) -> Result<Region, DecodeError> {
    match reader.read_length()? {
        Length::Definite(length) => Ok(Region::Definite(reader.pos().saturating_add(length))),
        Length::Indefinite => {
            if rules == EncodingRules::Der {
                Err(DecodeError::new(DecodeErrorKind::IndefiniteLength))
            } else {
                Ok(Region::Indefinite)
            }
        }
    }
}

/// Skips whatever the member loop left unread: unknown extension additions
/// for definite lengths, everything up to the end-of-contents octets for
/// indefinite ones.
fn finish_region(reader: &mut Reader<'_>, region: Region) -> Result<(), DecodeError> {
    match region {
        Region::Definite(end) => {
            if reader.pos() < end {
                reader.advance(end - reader.pos())?;
            }
            Ok(())
        }
        Region::Indefinite => {
            while !reader.at_end_of_contents() {
                tlv::skip_value(reader)?;
            }
            reader.read_end_of_contents()
        }
    }
}

fn region_exhausted(reader: &Reader<'_>, region: Region) -> bool {
    match region {
        Region::Definite(end) => reader.pos() >= end || reader.is_at_end(),
        Region::Indefinite => reader.at_end_of_contents(),
    }
}

fn encode_members(
    members: &[Member],
    record: &BTreeMap<String, Value>,
    rules: EncodingRules,
    sort_by_tag: bool,
) -> Result<Vec<u8>, EncodeError> {
    let mut chunks: Vec<Vec<u8>> = Vec::with_capacity(members.len());
    for member in members {
        let Some(value) = record.get(&member.name) else {
            if member.is_skippable() {
                continue;
            }
            return Err(EncodeError::new(EncodeErrorKind::MissingMember(
                member.name.clone(),
            )));
        };
        if member.default.as_ref() == Some(value) {
            continue;
        }

        let mut chunk = Vec::new();
        if let Kind::AnyDefinedBy {
            field,
            choices: Some(choices),
        } = &member.node.kind
        {
            let discriminant = record
                .get(field)
                .and_then(Value::discriminant)
                .ok_or_else(|| EncodeError::new(EncodeErrorKind::MissingMember(field.clone())))?;
            let node = choices.get(&discriminant).ok_or_else(|| {
                EncodeError::new(EncodeErrorKind::UnknownDiscriminator(
                    discriminant.to_string(),
                ))
            })?;
            node.encode_into(value, rules, &mut chunk)
                .map_err(|e| e.add_location(&member.name))?;
        } else {
            member
                .node
                .encode_into(value, rules, &mut chunk)
                .map_err(|e| e.add_location(&member.name))?;
        }
        chunks.push(chunk);
    }

    if sort_by_tag {
        // Identifier octets lead each chunk, so a plain byte sort yields the
        // ascending tag order DER requires of SET members.
        chunks.sort();
    }
    Ok(chunks.concat())
}

fn decode_members(
    members: &[Member],
    reader: &mut Reader<'_>,
    rules: EncodingRules,
    region: Region,
) -> Result<Value, DecodeError> {
    let mut record = BTreeMap::new();
    for member in members {
        let exhausted = region_exhausted(reader, region);

        if let Kind::AnyDefinedBy {
            field,
            choices: Some(choices),
        } = &member.node.kind
        {
            if exhausted {
                if member.is_skippable() {
                    continue;
                }
                return Err(DecodeError::not_enough_data().add_location(&member.name));
            }
            let discriminant = record
                .get(field)
                .and_then(Value::discriminant)
                .ok_or_else(|| {
                    DecodeError::message(format!("no decoded discriminator member '{field}'"))
                })?;
            let node = choices.get(&discriminant).ok_or_else(|| {
                DecodeError::new(DecodeErrorKind::UnknownDiscriminator(
                    discriminant.to_string(),
                ))
            })?;
            let value = node
                .decode(reader, rules)
                .map_err(|e| e.add_location(&member.name))?;
            record.insert(member.name.clone(), value);
            continue;
        }

        let matches = !exhausted && member.node.matches_tag(reader);
        if matches || !member.is_skippable() {
            let value = member
                .node
                .decode(reader, rules)
                .map_err(|e| e.add_location(&member.name))?;
            record.insert(member.name.clone(), value);
        } else if let Some(default) = &member.default {
            record.insert(member.name.clone(), default.clone());
        }
        // Absent OPTIONAL and extension members are simply left out.
    }
    Ok(Value::Record(record))
}

fn decode_choice(
    alternatives: &[(String, Arc<Node>)],
    reader: &mut Reader<'_>,
    rules: EncodingRules,
) -> Result<Value, DecodeError> {
    let Some(last) = alternatives.last() else {
        return Err(DecodeError::message("CHOICE has no alternatives"));
    };
    let (name, node) = alternatives
        .iter()
        .find(|(_, node)| node.matches_tag(reader))
        // No alternative matches: decoding the last one surfaces its
        // tag-mismatch error with the right offset and bytes.
        .unwrap_or(last);
    let value = node.decode(reader, rules)?;
    Ok(Value::Choice(name.clone(), Box::new(value)))
}

fn decode_any(reader: &mut Reader<'_>) -> Result<Value, DecodeError> {
    let start = reader.pos();
    let mut probe = reader.clone();
    tlv::skip_value(&mut probe)?;
    let bytes = reader.read_bytes(probe.pos() - start)?;
    Ok(Value::Bytes(bytes.to_vec()))
}

// ----------------------------------------------------------------------
// Contents codecs shared by several kinds
// ----------------------------------------------------------------------

/// Two's-complement big-endian without redundant leading octets.
pub(crate) fn signed_be_bytes(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn decode_integer_contents(contents: &[u8]) -> Result<i64, DecodeError> {
    if contents.len() > 8 {
        return Err(DecodeError::message(format!(
            "INTEGER of {} octets does not fit in 64 bits",
            contents.len()
        )));
    }
    let mut value: i64 = match contents.first() {
        Some(byte) if byte & 0x80 != 0 => -1,
        _ => 0,
    };
    for byte in contents {
        value = (value << 8) | i64::from(*byte);
    }
    Ok(value)
}

fn encode_oid_contents(oid: &str) -> Result<Vec<u8>, EncodeError> {
    let invalid =
        || EncodeError::new(EncodeErrorKind::InvalidValue(format!(
            "invalid OBJECT IDENTIFIER '{oid}'"
        )));

    let mut arcs = oid.split('.').map(|arc| arc.parse::<u32>());
    let first = arcs.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
    let second = arcs.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
    if first > 2 || (first < 2 && second > 39) {
        return Err(invalid());
    }

    let mut contents = Vec::new();
    tlv::encode_base128(first * 40 + second, &mut contents);
    for arc in arcs {
        tlv::encode_base128(arc.map_err(|_| invalid())?, &mut contents);
    }
    Ok(contents)
}

fn decode_oid_contents(contents: &[u8]) -> Result<Value, DecodeError> {
    if contents.is_empty() {
        return Err(DecodeError::message("empty OBJECT IDENTIFIER contents"));
    }
    let mut arcs: Vec<u64> = Vec::new();
    let mut accumulator: u64 = 0;
    for (index, byte) in contents.iter().enumerate() {
        accumulator = (accumulator << 7) | u64::from(byte & 0x7f);
        if byte & 0x80 == 0 {
            if arcs.is_empty() {
                let (first, second) = match accumulator {
                    0..=39 => (0, accumulator),
                    40..=79 => (1, accumulator - 40),
                    _ => (2, accumulator - 80),
                };
                arcs.push(first);
                arcs.push(second);
            } else {
                arcs.push(accumulator);
            }
            accumulator = 0;
        } else if index == contents.len() - 1 {
            return Err(DecodeError::message("truncated OBJECT IDENTIFIER arc"));
        }
    }
    let oid = arcs
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".");
    Ok(Value::ObjectIdentifier(oid))
}

/// X.690 binary REAL with base 2 and a mantissa normalized to odd.
fn encode_real_contents(value: f64) -> Vec<u8> {
    if value == 0.0 {
        return if value.is_sign_negative() {
            vec![0x43]
        } else {
            Vec::new()
        };
    }
    if value.is_nan() {
        return vec![0x42];
    }
    if value.is_infinite() {
        return vec![if value > 0.0 { 0x40 } else { 0x41 }];
    }

    let bits = value.to_bits();
    let negative = bits >> 63 != 0;
    let biased = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    let (mut mantissa, mut exponent) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased - 1075)
    };
    while mantissa & 1 == 0 {
        mantissa >>= 1;
        exponent += 1;
    }

    let exponent_bytes = signed_be_bytes(i64::from(exponent));
    let mut contents = Vec::with_capacity(1 + exponent_bytes.len() + 8);
    contents.push(0x80 | if negative { 0x40 } else { 0x00 } | (exponent_bytes.len() as u8 - 1));
    contents.extend_from_slice(&exponent_bytes);
    let mantissa_bytes = mantissa.to_be_bytes();
    let skip = mantissa_bytes.iter().take_while(|b| **b == 0).count();
    contents.extend_from_slice(&mantissa_bytes[skip..]);
    contents
}

fn decode_real_contents(contents: &[u8]) -> Result<f64, DecodeError> {
    let Some((&leading, rest)) = contents.split_first() else {
        return Ok(0.0);
    };

    if leading & 0x80 != 0 {
        let sign = if leading & 0x40 != 0 { -1.0 } else { 1.0 };
        let base: f64 = match (leading >> 4) & 0x3 {
            0 => 2.0,
            1 => 8.0,
            2 => 16.0,
            _ => return Err(DecodeError::message("reserved REAL base")),
        };
        let scale = i32::from((leading >> 2) & 0x3);
        let (exponent_len, rest) = if leading & 0x3 == 0x3 {
            let Some((&len, rest)) = rest.split_first() else {
                return Err(DecodeError::message("truncated REAL exponent"));
            };
            (usize::from(len), rest)
        } else {
            (usize::from(leading & 0x3) + 1, rest)
        };
        if rest.len() < exponent_len || exponent_len > 8 {
            return Err(DecodeError::message("truncated REAL exponent"));
        }
        let exponent = decode_integer_contents(&rest[..exponent_len])?;
        let mantissa_bytes = &rest[exponent_len..];
        if mantissa_bytes.len() > 8 {
            return Err(DecodeError::message("REAL mantissa does not fit in 64 bits"));
        }
        let mut mantissa: u64 = 0;
        for byte in mantissa_bytes {
            mantissa = (mantissa << 8) | u64::from(*byte);
        }
        let exponent = i32::try_from(exponent)
            .map_err(|_| DecodeError::message("REAL exponent out of range"))?;
        Ok(sign * mantissa as f64 * 2f64.powi(scale) * base.powi(exponent))
    } else if leading & 0x40 != 0 {
        match leading {
            0x40 => Ok(f64::INFINITY),
            0x41 => Ok(f64::NEG_INFINITY),
            0x42 => Ok(f64::NAN),
            0x43 => Ok(-0.0),
            _ => Err(DecodeError::message("reserved REAL special value")),
        }
    } else {
        // ISO 6093 decimal form; the leading octet only selects NR1/2/3.
        let text = std::str::from_utf8(rest)
            .map_err(|_| DecodeError::message("invalid decimal REAL"))?
            .trim()
            .replace(',', ".");
        text.parse::<f64>()
            .map_err(|_| DecodeError::message("invalid decimal REAL"))
    }
}

#[test]
fn shortest_signed_integers() {
    assert_eq!(signed_be_bytes(0), [0x00]);
    assert_eq!(signed_be_bytes(1), [0x01]);
    assert_eq!(signed_be_bytes(127), [0x7f]);
    assert_eq!(signed_be_bytes(128), [0x00, 0x80]);
    assert_eq!(signed_be_bytes(256), [0x01, 0x00]);
    assert_eq!(signed_be_bytes(-1), [0xff]);
    assert_eq!(signed_be_bytes(-128), [0x80]);
    assert_eq!(signed_be_bytes(-129), [0xff, 0x7f]);
    assert_eq!(signed_be_bytes(-32769), [0xff, 0x7f, 0xff]);

    for value in [0i64, 1, -1, 127, -128, 255, -256, 32767, i64::MIN, i64::MAX] {
        assert_eq!(decode_integer_contents(&signed_be_bytes(value)).unwrap(), value);
    }
}

#[test]
fn oid_contents() {
    fn round_trip(oid: &str, expected: &[u8]) {
        let contents = encode_oid_contents(oid).unwrap();
        assert_eq!(contents, expected);
        assert_eq!(
            decode_oid_contents(&contents).unwrap(),
            Value::ObjectIdentifier(oid.to_owned())
        );
    }

    round_trip("1.2", &[0x2a]);
    round_trip("1.3.2", &[0x2b, 0x02]);
    round_trip("1.3.6.1.5.5.7.48.1", &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x30, 0x01]);
    round_trip("2.5.4.3", &[0x55, 0x04, 0x03]);
    round_trip("2.999.1", &[0x88, 0x37, 0x01]);

    assert!(encode_oid_contents("1").is_err());
    assert!(encode_oid_contents("3.1").is_err());
    assert!(encode_oid_contents("1.40").is_err());
    assert!(encode_oid_contents("1.2.x").is_err());
    assert!(decode_oid_contents(&[0x2b, 0x86]).is_err());
}

#[test]
fn real_contents() {
    assert_eq!(encode_real_contents(0.0), []);
    assert_eq!(encode_real_contents(1.0), [0x80, 0x00, 0x01]);
    assert_eq!(encode_real_contents(-1.0), [0xc0, 0x00, 0x01]);
    assert_eq!(encode_real_contents(8.0), [0x80, 0x03, 0x01]);
    assert_eq!(encode_real_contents(0.5), [0x80, 0xff, 0x01]);

    for value in [0.0, 1.0, -1.0, 0.5, 3.25, -1024.125, 1.0e10, f64::INFINITY] {
        let contents = encode_real_contents(value);
        assert_eq!(decode_real_contents(&contents).unwrap(), value);
    }
    assert_eq!(decode_real_contents(&[0x41]).unwrap(), f64::NEG_INFINITY);
    assert!(decode_real_contents(&[0x42]).unwrap().is_nan());
    // NR3 decimal form as written by other encoders.
    assert_eq!(decode_real_contents(b"\x03150.0E-2").unwrap(), 1.5);
}
