//! The compiled [`Specification`] facade and its construction entry points.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::codec::Node;
use crate::compiler::{self, Error as CompileError};
use crate::error::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};
use crate::schema::ast;
use crate::schema::parser;
use crate::tlv::{self, Reader};
use crate::value::{Discriminant, Value};

/// The transfer syntax a specification encodes to and decodes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingRules {
    /// Basic Encoding Rules: permissive on decode, accepts the indefinite
    /// length form and trailing data.
    #[default]
    Ber,
    /// Distinguished Encoding Rules: SET members sorted by tag on encode,
    /// indefinite lengths and trailing data rejected on decode.
    Der,
}

/// `ANY DEFINED BY` choice tables, keyed by the path of the open member:
/// `[module, type, member...]` mapping each discriminator value to the name
/// of the type it selects.
pub type AnyDefinedByChoices = HashMap<Vec<String>, BTreeMap<Discriminant, String>>;

/// Options accepted by every `compile_*` entry point.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    rules: EncodingRules,
    any_defined_by_choices: AnyDefinedByChoices,
}

impl CompileOptions {
    #[must_use]
    pub fn ber() -> Self {
        Self {
            rules: EncodingRules::Ber,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn der() -> Self {
        Self {
            rules: EncodingRules::Der,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_any_defined_by_choices(mut self, choices: AnyDefinedByChoices) -> Self {
        self.any_defined_by_choices = choices;
        self
    }

    #[must_use]
    pub fn rules(&self) -> EncodingRules {
        self.rules
    }

    pub(crate) fn any_defined_by_choices(&self) -> &AnyDefinedByChoices {
        &self.any_defined_by_choices
    }
}

/// Reads, concatenates and compiles ASN.1 schema files.
pub fn compile_files<P: AsRef<Path>>(
    paths: &[P],
    options: CompileOptions,
) -> Result<Specification, CompileError> {
    let mut source = String::new();
    for path in paths {
        source.push_str(&fs::read_to_string(path)?);
        source.push('\n');
    }
    compile_string(&source, options)
}

/// Compiles ASN.1 source text.
pub fn compile_string(source: &str, options: CompileOptions) -> Result<Specification, CompileError> {
    compile_modules(parser::parse(source)?, options)
}

/// Compiles modules supplied in the parsed [`ast`] form, bypassing the
/// parser.
pub fn compile_modules(
    modules: Vec<ast::Module>,
    options: CompileOptions,
) -> Result<Specification, CompileError> {
    compiler::compile(modules, options)
}

/// A compiled, immutable view of a set of ASN.1 modules.
///
/// Encode and decode take no locks and share no mutable state, so a
/// specification can be used from any number of threads once built.
#[derive(Debug)]
pub struct Specification {
    rules: EncodingRules,
    /// `None` when two modules define the same type name; the per-module
    /// view keeps working.
    types: Option<BTreeMap<String, TypeCodec>>,
    modules: BTreeMap<String, ModuleCodecs>,
}

impl Specification {
    pub(crate) fn new(
        rules: EncodingRules,
        types: Option<BTreeMap<String, TypeCodec>>,
        modules: BTreeMap<String, ModuleCodecs>,
    ) -> Self {
        Self {
            rules,
            types,
            modules,
        }
    }

    #[must_use]
    pub fn rules(&self) -> EncodingRules {
        self.rules
    }

    /// All compiled types across modules, or `None` when a type name is
    /// defined by more than one module.
    #[must_use]
    pub fn types(&self) -> Option<&BTreeMap<String, TypeCodec>> {
        self.types.as_ref()
    }

    /// Per-module types and value assignments.
    #[must_use]
    pub fn modules(&self) -> &BTreeMap<String, ModuleCodecs> {
        &self.modules
    }

    /// Encodes `value` as the named top-level type.
    pub fn encode(&self, type_name: &str, value: &Value) -> Result<Vec<u8>, EncodeError> {
        let codec = self.find(type_name).map_err(|lookup| {
            EncodeError::new(match lookup {
                Lookup::Unknown => EncodeErrorKind::UnknownType(type_name.to_owned()),
                Lookup::Ambiguous => EncodeErrorKind::AmbiguousType(type_name.to_owned()),
            })
        })?;
        codec.encode(value)
    }

    /// Decodes `data` as the named top-level type.
    pub fn decode(&self, type_name: &str, data: &[u8]) -> Result<Value, DecodeError> {
        let codec = self.find(type_name).map_err(|lookup| {
            DecodeError::new(match lookup {
                Lookup::Unknown => DecodeErrorKind::UnknownType(type_name.to_owned()),
                Lookup::Ambiguous => DecodeErrorKind::AmbiguousType(type_name.to_owned()),
            })
        })?;
        codec.decode(data)
    }

    /// Total size of the outermost TLV in `data`, from its tag and length
    /// octets alone.
    pub fn decode_length(&self, data: &[u8]) -> Result<usize, DecodeError> {
        tlv::decode_length(data)
    }

    fn find(&self, type_name: &str) -> Result<&TypeCodec, Lookup> {
        if let Some(types) = &self.types {
            return types.get(type_name).ok_or(Lookup::Unknown);
        }
        // The flat view is gone; the name is still usable when exactly one
        // module defines it.
        let mut found = None;
        for module in self.modules.values() {
            if let Some(codec) = module.types.get(type_name) {
                if found.is_some() {
                    return Err(Lookup::Ambiguous);
                }
                found = Some(codec);
            }
        }
        found.ok_or(Lookup::Unknown)
    }
}

enum Lookup {
    Unknown,
    Ambiguous,
}

/// One compiled top-level type.
#[derive(Debug, Clone)]
pub struct TypeCodec {
    node: Arc<Node>,
    rules: EncodingRules,
}

impl TypeCodec {
    pub(crate) fn new(node: Arc<Node>, rules: EncodingRules) -> Self {
        Self { node, rules }
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, EncodeError> {
        self.node.encode(value, self.rules)
    }

    pub fn decode(&self, data: &[u8]) -> Result<Value, DecodeError> {
        let mut reader = Reader::new(data);
        let value = self.node.decode(&mut reader, self.rules)?;
        if self.rules == EncodingRules::Der && !reader.is_at_end() {
            return Err(DecodeError::new(DecodeErrorKind::TrailingBytes(
                data.len() - reader.pos(),
            )));
        }
        Ok(value)
    }
}

/// The compiled types and the value assignments of one module.
#[derive(Debug)]
pub struct ModuleCodecs {
    types: BTreeMap<String, TypeCodec>,
    values: BTreeMap<String, ast::ValueAssignment>,
}

impl ModuleCodecs {
    pub(crate) fn new(
        types: BTreeMap<String, TypeCodec>,
        values: BTreeMap<String, ast::ValueAssignment>,
    ) -> Self {
        Self { types, values }
    }

    #[must_use]
    pub fn types(&self) -> &BTreeMap<String, TypeCodec> {
        &self.types
    }

    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, ast::ValueAssignment> {
        &self.values
    }
}
