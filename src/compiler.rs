//! Resolves parsed modules into the codec node graph behind a
//! [`Specification`].
//!
//! Named types are built once and memoized; forward references resolve
//! through the memo table, and reference cycles are cut by inserting
//! [`Kind::Recursive`] placeholder nodes at the reference site.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::{error, fmt, io};

use crate::codec::{Kind, Member as CodecMember, MemberFlags, Node};
use crate::schema::ast::{
    Class, Literal, MemberItem, Module, TagDefault, TagDirective, TagMode, TypeDescriptor, TypeKind,
};
use crate::schema::parser;
use crate::spec::{CompileOptions, ModuleCodecs, Specification, TypeCodec};
use crate::tlv::{self, UniversalTag};
use crate::value::Value;

/// Compile error.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse(parser::Error),
    DuplicateModule(String),
    UnknownReference { module: String, name: String },
    InvalidComponentsOf { module: String, name: String },
    InvalidDefault { type_name: String, member: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => err.fmt(f),
            Self::Parse(err) => err.fmt(f),
            Self::DuplicateModule(name) => write!(f, "module '{name}' is defined twice"),
            Self::UnknownReference { module, name } => {
                write!(f, "cannot resolve type '{name}' in module '{module}'")
            }
            Self::InvalidComponentsOf { module, name } => write!(
                f,
                "COMPONENTS OF '{name}' in module '{module}' does not name a SEQUENCE or SET"
            ),
            Self::InvalidDefault { type_name, member } => write!(
                f,
                "member '{member}' of '{type_name}' has a DEFAULT that does not fit its type"
            ),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<parser::Error> for Error {
    fn from(err: parser::Error) -> Self {
        Self::Parse(err)
    }
}

/// Builds a [`Specification`] from already-parsed modules.
pub(crate) fn compile(modules: Vec<Module>, options: CompileOptions) -> Result<Specification, Error> {
    let mut by_name: BTreeMap<String, Module> = BTreeMap::new();
    for module in modules {
        let name = module.name.clone();
        if by_name.insert(name.clone(), module).is_some() {
            return Err(Error::DuplicateModule(name));
        }
    }

    let mut compiler = Compiler {
        modules: &by_name,
        options: &options,
        cache: HashMap::new(),
        building: Vec::new(),
    };

    let mut flat: BTreeMap<String, TypeCodec> = BTreeMap::new();
    let mut ambiguous = false;
    let mut module_codecs = BTreeMap::new();
    for (module_name, module) in &by_name {
        let mut types = BTreeMap::new();
        for type_name in module.types.keys() {
            let node = compiler.named_node(module_name, type_name)?;
            let codec = TypeCodec::new(node, options.rules());
            if flat.insert(type_name.clone(), codec.clone()).is_some() {
                ambiguous = true;
            }
            types.insert(type_name.clone(), codec);
        }
        module_codecs.insert(
            module_name.clone(),
            ModuleCodecs::new(types, module.values.clone()),
        );
    }

    Ok(Specification::new(
        options.rules(),
        if ambiguous { None } else { Some(flat) },
        module_codecs,
    ))
}

struct Compiler<'a> {
    modules: &'a BTreeMap<String, Module>,
    options: &'a CompileOptions,
    cache: HashMap<(String, String), Arc<Node>>,
    /// Named types currently being built, for cycle detection.
    building: Vec<(String, String)>,
}

impl<'a> Compiler<'a> {
    fn unknown(&self, module: &str, name: &str) -> Error {
        Error::UnknownReference {
            module: module.to_owned(),
            name: name.to_owned(),
        }
    }

    fn named_node(&mut self, module_name: &str, type_name: &str) -> Result<Arc<Node>, Error> {
        let key = (module_name.to_owned(), type_name.to_owned());
        if let Some(node) = self.cache.get(&key) {
            return Ok(node.clone());
        }
        if self.building.contains(&key) {
            return Ok(Arc::new(Node::new(
                type_name,
                Vec::new(),
                Kind::Recursive(type_name.to_owned()),
            )));
        }

        let modules = self.modules;
        let module = modules
            .get(module_name)
            .ok_or_else(|| self.unknown(module_name, type_name))?;
        let descriptor = module
            .types
            .get(type_name)
            .ok_or_else(|| self.unknown(module_name, type_name))?;

        self.building.push(key.clone());
        let mut path = vec![module_name.to_owned(), type_name.to_owned()];
        let result = self.build_type(module, descriptor, &mut path);
        self.building.pop();

        let node = result?;
        self.cache.insert(key, node.clone());
        Ok(node)
    }

    fn build_type(
        &mut self,
        module: &'a Module,
        descriptor: &TypeDescriptor,
        path: &mut Vec<String>,
    ) -> Result<Arc<Node>, Error> {
        use UniversalTag as T;

        let node = match &descriptor.kind {
            TypeKind::Boolean => universal_primitive("BOOLEAN", T::Boolean, Kind::Boolean),
            TypeKind::Integer => universal_primitive("INTEGER", T::Integer, Kind::Integer),
            TypeKind::Real => universal_primitive("REAL", T::Real, Kind::Real),
            TypeKind::Null => universal_primitive("NULL", T::Null, Kind::Null),
            TypeKind::BitString => universal_primitive("BIT STRING", T::BitString, Kind::BitString),
            TypeKind::OctetString => {
                universal_primitive("OCTET STRING", T::OctetString, Kind::OctetString)
            }
            TypeKind::ObjectIdentifier => universal_primitive(
                "OBJECT IDENTIFIER",
                T::ObjectIdentifier,
                Kind::ObjectIdentifier,
            ),
            TypeKind::Utf8String => {
                universal_primitive("UTF8String", T::Utf8String, Kind::Utf8String)
            }
            TypeKind::NumericString => {
                universal_primitive("NumericString", T::NumericString, Kind::NumericString)
            }
            TypeKind::PrintableString => {
                universal_primitive("PrintableString", T::PrintableString, Kind::PrintableString)
            }
            TypeKind::Ia5String => universal_primitive("IA5String", T::Ia5String, Kind::Ia5String),
            TypeKind::VisibleString => {
                universal_primitive("VisibleString", T::VisibleString, Kind::VisibleString)
            }
            TypeKind::UniversalString => universal_primitive(
                "UniversalString",
                T::UniversalString,
                Kind::UniversalString,
            ),
            TypeKind::BmpString => universal_primitive("BMPString", T::BmpString, Kind::BmpString),
            TypeKind::TeletexString => {
                universal_primitive("TeletexString", T::TeletexString, Kind::TeletexString)
            }
            TypeKind::UtcTime => universal_primitive("UTCTime", T::UtcTime, Kind::UtcTime),
            TypeKind::GeneralizedTime => {
                universal_primitive("GeneralizedTime", T::GeneralizedTime, Kind::GeneralizedTime)
            }
            TypeKind::Enumerated(values) => {
                let by_name = values
                    .iter()
                    .map(|(number, name)| (name.clone(), *number))
                    .collect();
                universal_primitive(
                    "ENUMERATED",
                    T::Enumerated,
                    Kind::Enumerated {
                        by_name,
                        by_number: values.clone(),
                    },
                )
            }
            TypeKind::Sequence(items) => {
                let members = self.build_members(module, items, path)?;
                universal_constructed("SEQUENCE", T::Sequence, Kind::Sequence(members))
            }
            TypeKind::Set(items) => {
                let members = self.build_members(module, items, path)?;
                universal_constructed("SET", T::Set, Kind::Set(members))
            }
            TypeKind::SequenceOf(element) => {
                let element = self.build_type(module, element, path)?;
                universal_constructed("SEQUENCE", T::Sequence, Kind::SequenceOf(element))
            }
            TypeKind::SetOf(element) => {
                let element = self.build_type(module, element, path)?;
                universal_constructed("SET", T::Set, Kind::SetOf(element))
            }
            TypeKind::Choice(items) => {
                let alternatives = self.build_alternatives(module, items, path)?;
                Arc::new(Node::new("CHOICE", Vec::new(), Kind::Choice(alternatives)))
            }
            TypeKind::Any => Arc::new(Node::new("ANY", Vec::new(), Kind::Any)),
            TypeKind::AnyDefinedBy(field) => {
                let choices = match self.options.any_defined_by_choices().get(path.as_slice()) {
                    Some(table) => {
                        let mut resolved = BTreeMap::new();
                        for (discriminant, type_name) in table {
                            resolved
                                .insert(discriminant.clone(), self.type_by_name(module, type_name)?);
                        }
                        Some(resolved)
                    }
                    None => None,
                };
                Arc::new(Node::new(
                    "ANY",
                    Vec::new(),
                    Kind::AnyDefinedBy {
                        field: field.clone(),
                        choices,
                    },
                ))
            }
            TypeKind::Reference(name) => self.resolve_reference(module, name)?,
        };

        Ok(match &descriptor.tag {
            Some(directive) => apply_tag(module.tag_default, directive, node),
            None => node,
        })
    }

    fn resolve_reference(&mut self, module: &'a Module, name: &str) -> Result<Arc<Node>, Error> {
        if module.types.contains_key(name) {
            let module_name = module.name.clone();
            return self.named_node(&module_name, name);
        }
        for (from, symbols) in &module.imports {
            if symbols.iter().any(|symbol| symbol == name) {
                let from = from.clone();
                return self.named_node(&from, name);
            }
        }
        Err(self.unknown(&module.name, name))
    }

    /// Resolves the target of an `ANY DEFINED BY` choice table, which may
    /// name a universal type directly.
    fn type_by_name(&mut self, module: &'a Module, name: &str) -> Result<Arc<Node>, Error> {
        match builtin_node(name) {
            Some(node) => Ok(node),
            None => self.resolve_reference(module, name),
        }
    }

    fn build_members(
        &mut self,
        module: &'a Module,
        items: &[MemberItem],
        path: &mut Vec<String>,
    ) -> Result<Vec<CodecMember>, Error> {
        let items = self.splice_components(module, items)?;
        let automatic = automatic_tagging(module, &items);

        let mut members = Vec::new();
        let mut markers = 0usize;
        let mut auto_number = 0u32;
        for item in &items {
            match item {
                MemberItem::Extension => markers += 1,
                // Spliced away above.
                MemberItem::ComponentsOf(_) => {}
                MemberItem::Member(member) => {
                    path.push(member.name.clone());
                    let result = self.build_type(module, &member.ty, path);
                    path.pop();
                    let mut node = result?;
                    if automatic {
                        let directive = TagDirective {
                            class: Class::Context,
                            number: auto_number,
                            mode: Some(TagMode::Implicit),
                        };
                        node = apply_tag(module.tag_default, &directive, node);
                        auto_number += 1;
                    }

                    let mut flags = MemberFlags::empty();
                    if member.optional {
                        flags |= MemberFlags::OPTIONAL;
                    }
                    if markers == 1 {
                        flags |= MemberFlags::EXTENSION;
                    }
                    let default = match &member.default {
                        Some(literal) => Some(self.default_value(
                            module,
                            &node,
                            literal,
                            path.get(1).map_or("", String::as_str),
                            &member.name,
                        )?),
                        None => None,
                    };
                    members.push(CodecMember {
                        name: member.name.clone(),
                        node,
                        flags,
                        default,
                    });
                }
            }
        }
        Ok(members)
    }

    fn build_alternatives(
        &mut self,
        module: &'a Module,
        items: &[MemberItem],
        path: &mut Vec<String>,
    ) -> Result<Vec<(String, Arc<Node>)>, Error> {
        let automatic = automatic_tagging(module, items);

        let mut alternatives = Vec::new();
        let mut auto_number = 0u32;
        for item in items {
            match item {
                MemberItem::Extension => {}
                MemberItem::ComponentsOf(name) => {
                    return Err(Error::InvalidComponentsOf {
                        module: module.name.clone(),
                        name: name.clone(),
                    });
                }
                MemberItem::Member(member) => {
                    path.push(member.name.clone());
                    let result = self.build_type(module, &member.ty, path);
                    path.pop();
                    let mut node = result?;
                    if automatic {
                        let directive = TagDirective {
                            class: Class::Context,
                            number: auto_number,
                            mode: Some(TagMode::Implicit),
                        };
                        node = apply_tag(module.tag_default, &directive, node);
                        auto_number += 1;
                    }
                    alternatives.push((member.name.clone(), node));
                }
            }
        }
        Ok(alternatives)
    }

    /// Replaces `COMPONENTS OF X` items with the root members of `X`.
    fn splice_components(
        &self,
        module: &'a Module,
        items: &[MemberItem],
    ) -> Result<Vec<MemberItem>, Error> {
        if !items
            .iter()
            .any(|item| matches!(item, MemberItem::ComponentsOf(_)))
        {
            return Ok(items.to_vec());
        }
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                MemberItem::ComponentsOf(name) => {
                    out.extend(self.root_members(module, name, 0)?);
                }
                other => out.push(other.clone()),
            }
        }
        Ok(out)
    }

    fn root_members(
        &self,
        module: &'a Module,
        name: &str,
        depth: usize,
    ) -> Result<Vec<MemberItem>, Error> {
        let invalid = || Error::InvalidComponentsOf {
            module: module.name.clone(),
            name: name.to_owned(),
        };
        if depth > 16 {
            return Err(invalid());
        }
        let (target_module, descriptor) = self.find_descriptor(module, name)?;
        match &descriptor.kind {
            TypeKind::Sequence(items) | TypeKind::Set(items) => {
                let roots: Vec<MemberItem> = items
                    .iter()
                    .take_while(|item| !matches!(item, MemberItem::Extension))
                    .cloned()
                    .collect();
                self.splice_components(target_module, &roots)
            }
            TypeKind::Reference(inner) => self.root_members(target_module, inner, depth + 1),
            _ => Err(invalid()),
        }
    }

    fn find_descriptor(
        &self,
        module: &'a Module,
        name: &str,
    ) -> Result<(&'a Module, &'a TypeDescriptor), Error> {
        let modules = self.modules;
        let current = modules
            .get(&module.name)
            .ok_or_else(|| self.unknown(&module.name, name))?;
        if let Some(descriptor) = current.types.get(name) {
            return Ok((current, descriptor));
        }
        for (from, symbols) in &current.imports {
            if symbols.iter().any(|symbol| symbol == name) {
                let target = modules
                    .get(from)
                    .ok_or_else(|| self.unknown(from, name))?;
                if let Some(descriptor) = target.types.get(name) {
                    return Ok((target, descriptor));
                }
            }
        }
        Err(self.unknown(&module.name, name))
    }

    /// Converts a DEFAULT literal into the [`Value`] inserted when the
    /// member is absent.
    fn default_value(
        &self,
        module: &'a Module,
        node: &Node,
        literal: &Literal,
        type_name: &str,
        member: &str,
    ) -> Result<Value, Error> {
        let invalid = || Error::InvalidDefault {
            type_name: type_name.to_owned(),
            member: member.to_owned(),
        };
        Ok(match (node.base_kind(), literal) {
            (Kind::Boolean, Literal::Boolean(b)) => Value::Boolean(*b),
            (Kind::Integer, Literal::Integer(number)) => Value::Integer(*number),
            (Kind::Real, Literal::Integer(number)) => Value::Real(*number as f64),
            (Kind::Real, Literal::Real(text)) => {
                Value::Real(text.parse().map_err(|_| invalid())?)
            }
            (Kind::Null, Literal::Null) => Value::Null,
            (Kind::Enumerated { .. }, Literal::Identifier(name)) => Value::Text(name.clone()),
            (Kind::ObjectIdentifier, Literal::ObjectIdentifier(oid)) => {
                Value::ObjectIdentifier(oid.clone())
            }
            (Kind::BitString, Literal::Bytes(bytes)) => Value::BitString {
                data: bytes.clone(),
                bit_length: bytes.len() * 8,
            },
            (
                Kind::OctetString
                | Kind::UniversalString
                | Kind::BmpString
                | Kind::TeletexString,
                Literal::Bytes(bytes),
            ) => Value::Bytes(bytes.clone()),
            (
                Kind::Utf8String
                | Kind::NumericString
                | Kind::PrintableString
                | Kind::Ia5String
                | Kind::VisibleString
                | Kind::UtcTime
                | Kind::GeneralizedTime,
                Literal::Text(text),
            ) => Value::Text(text.clone()),
            (_, Literal::Identifier(name)) => {
                // A value reference defined elsewhere in the module.
                let assignment = module.values.get(name).ok_or_else(invalid)?;
                self.default_value(module, node, &assignment.value, type_name, member)?
            }
            _ => return Err(invalid()),
        })
    }
}

fn automatic_tagging(module: &Module, items: &[MemberItem]) -> bool {
    module.tag_default == TagDefault::Automatic
        && items.iter().all(|item| match item {
            MemberItem::Member(member) => member.ty.tag.is_none(),
            _ => true,
        })
}

/// Applies a tag directive: IMPLICIT replaces the node's identifier octets,
/// EXPLICIT wraps the node in an outer constructed TLV. Tagless types
/// (CHOICE, ANY) can only be wrapped.
fn apply_tag(tag_default: TagDefault, directive: &TagDirective, inner: Arc<Node>) -> Arc<Node> {
    let mode = directive.mode.unwrap_or(match tag_default {
        TagDefault::Explicit => TagMode::Explicit,
        TagDefault::Implicit | TagDefault::Automatic => TagMode::Implicit,
    });
    let mode = if inner.tag.is_empty() {
        TagMode::Explicit
    } else {
        mode
    };

    match mode {
        TagMode::Implicit => Arc::new(Node::new(
            &inner.type_name,
            tlv::identifier(directive.class, inner.is_constructed(), directive.number),
            inner.kind.clone(),
        )),
        TagMode::Explicit => Arc::new(Node::new(
            "Tag",
            tlv::identifier(directive.class, true, directive.number),
            Kind::Explicit(inner),
        )),
    }
}

fn universal_primitive(name: &str, tag: UniversalTag, kind: Kind) -> Arc<Node> {
    Arc::new(Node::new(
        name,
        tlv::identifier(Class::Universal, false, u32::from(u8::from(tag))),
        kind,
    ))
}

fn universal_constructed(name: &str, tag: UniversalTag, kind: Kind) -> Arc<Node> {
    Arc::new(Node::new(
        name,
        tlv::identifier(Class::Universal, true, u32::from(u8::from(tag))),
        kind,
    ))
}

/// Universal types addressable by name from `ANY DEFINED BY` choice tables.
fn builtin_node(name: &str) -> Option<Arc<Node>> {
    use UniversalTag as T;
    Some(match name {
        "BOOLEAN" => universal_primitive(name, T::Boolean, Kind::Boolean),
        "INTEGER" => universal_primitive(name, T::Integer, Kind::Integer),
        "REAL" => universal_primitive(name, T::Real, Kind::Real),
        "NULL" => universal_primitive(name, T::Null, Kind::Null),
        "BIT STRING" => universal_primitive(name, T::BitString, Kind::BitString),
        "OCTET STRING" => universal_primitive(name, T::OctetString, Kind::OctetString),
        "OBJECT IDENTIFIER" => {
            universal_primitive(name, T::ObjectIdentifier, Kind::ObjectIdentifier)
        }
        "UTF8String" => universal_primitive(name, T::Utf8String, Kind::Utf8String),
        "NumericString" => universal_primitive(name, T::NumericString, Kind::NumericString),
        "PrintableString" => universal_primitive(name, T::PrintableString, Kind::PrintableString),
        "IA5String" => universal_primitive(name, T::Ia5String, Kind::Ia5String),
        "VisibleString" => universal_primitive(name, T::VisibleString, Kind::VisibleString),
        "UniversalString" => universal_primitive(name, T::UniversalString, Kind::UniversalString),
        "BMPString" => universal_primitive(name, T::BmpString, Kind::BmpString),
        "TeletexString" => universal_primitive(name, T::TeletexString, Kind::TeletexString),
        "UTCTime" => universal_primitive(name, T::UtcTime, Kind::UtcTime),
        "GeneralizedTime" => universal_primitive(name, T::GeneralizedTime, Kind::GeneralizedTime),
        _ => return None,
    })
}
