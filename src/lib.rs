//! Schema-driven ASN.1 BER/DER codec in Rust
//!
//! Compile one or more ASN.1 modules into a [`Specification`], then encode
//! [`Value`]s into X.690 byte strings and back:
//!
//! ```
//! use asn1_codec::{compile_string, CompileOptions, Value};
//!
//! let foo = compile_string(
//!     "Foo DEFINITIONS ::= BEGIN \
//!      Question ::= SEQUENCE { id INTEGER, question IA5String } \
//!      END",
//!     CompileOptions::ber(),
//! )
//! .unwrap();
//!
//! let question = Value::record([
//!     ("id", Value::Integer(1)),
//!     ("question", Value::text("Is 1+1=3?")),
//! ]);
//! let encoded = foo.encode("Question", &question).unwrap();
//! assert_eq!(encoded[..2], [0x30, 0x0e]);
//! assert_eq!(foo.decode("Question", &encoded).unwrap(), question);
//! ```

/// Codec node graph walked by encode and decode
mod codec;
/// Schema compiler
pub mod compiler;
/// Encode and decode errors
pub mod error;
/// Specification facade and compile entry points
pub mod spec;
mod tlv;
/// User-facing value model
pub mod value;

/// Schema front end
pub mod schema {
    /// Parsed module form, also accepted by [`crate::compile_modules`]
    pub mod ast;
    /// Tokenizer
    pub mod lexer;
    /// ASN.1 subset parser
    pub mod parser;
}

pub use self::compiler::Error as CompileError;
pub use self::error::{DecodeError, DecodeErrorKind, EncodeError, EncodeErrorKind};
pub use self::spec::{
    compile_files, compile_modules, compile_string, AnyDefinedByChoices, CompileOptions,
    EncodingRules, ModuleCodecs, Specification, TypeCodec,
};
pub use self::tlv::{Class, UniversalTag};
pub use self::value::{Discriminant, Value};
