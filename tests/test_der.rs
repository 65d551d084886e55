use std::collections::BTreeMap;

use asn1_codec::{compile_files, compile_string, CompileOptions, DecodeErrorKind, Specification, Value};

fn round_trip(spec: &Specification, type_name: &str, value: &Value, encoded: &[u8]) {
    assert_eq!(
        spec.encode(type_name, value).unwrap(),
        encoded,
        "encoding {type_name}"
    );
    assert_eq!(
        &spec.decode(type_name, encoded).unwrap(),
        value,
        "decoding {type_name}"
    );
}

#[test]
fn test_all_types() {
    let all_types = compile_files(&["tests/fixtures/all_types.asn"], CompileOptions::der()).unwrap();

    let datas: Vec<(&str, Value, Vec<u8>)> = vec![
        ("Boolean", Value::Boolean(true), b"\x01\x01\xff".to_vec()),
        ("Boolean", Value::Boolean(false), b"\x01\x01\x00".to_vec()),
        ("Integer", Value::Integer(32768), b"\x02\x03\x00\x80\x00".to_vec()),
        ("Integer", Value::Integer(-32769), b"\x02\x03\xff\x7f\xff".to_vec()),
        ("Bitstring", Value::bit_string(*b"\x80", 1), b"\x03\x02\x07\x80".to_vec()),
        ("Octetstring", Value::bytes(*b"\x00"), b"\x04\x01\x00".to_vec()),
        ("Null", Value::Null, b"\x05\x00".to_vec()),
        ("Objectidentifier", Value::oid("1.2"), b"\x06\x01\x2a".to_vec()),
        ("Enumerated", Value::text("one"), b"\x0a\x01\x01".to_vec()),
        ("Utf8string", Value::text("foo"), b"\x0c\x03foo".to_vec()),
        ("Sequence", Value::Record(BTreeMap::new()), b"\x30\x00".to_vec()),
        (
            "Sequence2",
            Value::record([("a", Value::Integer(0))]),
            b"\x30\x00".to_vec(),
        ),
        (
            "Sequence2",
            Value::record([("a", Value::Integer(1))]),
            b"\x30\x03\x02\x01\x01".to_vec(),
        ),
        ("Set", Value::Record(BTreeMap::new()), b"\x31\x00".to_vec()),
        (
            "Set2",
            Value::record([("a", Value::Integer(1))]),
            b"\x31\x00".to_vec(),
        ),
        (
            "Set2",
            Value::record([("a", Value::Integer(2))]),
            b"\x31\x03\x02\x01\x02".to_vec(),
        ),
        ("Utctime", Value::text("010203040506"), b"\x17\x0d010203040506Z".to_vec()),
        ("SequenceOf", Value::List(Vec::new()), b"0\x00".to_vec()),
        ("SetOf", Value::List(Vec::new()), b"1\x00".to_vec()),
    ];
    for (type_name, value, encoded) in &datas {
        round_trip(&all_types, type_name, value, encoded);
    }
}

#[test]
fn test_automatic_tags() {
    let all_types = compile_files(
        &["tests/fixtures/all_types_automatic_tags.asn"],
        CompileOptions::der(),
    )
    .unwrap();

    let value = Value::record([
        ("a", Value::Integer(1)),
        ("c", Value::Integer(2)),
        ("d", Value::Boolean(true)),
    ]);
    round_trip(
        &all_types,
        "Sequence14",
        &value,
        b"\x30\x09\x80\x01\x01\x82\x01\x02\x83\x01\xff",
    );
}

#[test]
fn test_decode_length() {
    let foo = compile_files(&["tests/fixtures/foo.asn"], CompileOptions::der()).unwrap();

    let datas: [(&[u8], usize); 4] = [
        (b"0\x0e\x02\x01\x01\x16\x09Is 1+1=3?", 16),
        (b"0\x10\x02\x02\x01\x16\x09Is 1+10=14?", 18),
        (b"0\x0d", 15),
        (b"0\x84\x00\x00\x00\xb8", 190),
    ];
    for (encoded, expected) in datas {
        assert_eq!(foo.decode_length(encoded).unwrap(), expected);
    }

    let datas: [&[u8]; 3] = [b"0", b"", b"0\x84\x00\x00\x00"];
    for encoded in datas {
        let err = foo.decode_length(encoded).unwrap_err();
        assert_eq!(err.to_string(), "Not enough data.");
    }
}

#[test]
fn test_set_members_sorted_by_tag() {
    let spec = compile_string(
        "Foo DEFINITIONS ::= BEGIN \
         Pair ::= SET { b [1] IMPLICIT INTEGER, a [0] IMPLICIT INTEGER } \
         END",
        CompileOptions::der(),
    )
    .unwrap();

    // DER emits SET members in ascending tag order regardless of the
    // schema order.
    let value = Value::record([("a", Value::Integer(1)), ("b", Value::Integer(2))]);
    assert_eq!(
        spec.encode("Pair", &value).unwrap(),
        b"\x31\x06\x80\x01\x01\x81\x01\x02"
    );
}

#[test]
fn test_indefinite_length_rejected() {
    let foo = compile_files(&["tests/fixtures/foo.asn"], CompileOptions::der()).unwrap();

    let err = foo
        .decode("Question", b"0\x80\x02\x01\x01\x16\x09Is 1+1=3?\x00\x00")
        .unwrap_err();
    assert_eq!(err.kind(), &DecodeErrorKind::IndefiniteLength);
    assert_eq!(err.to_string(), "indefinite length form is not allowed");
}

#[test]
fn test_trailing_bytes_rejected() {
    let foo = compile_files(&["tests/fixtures/foo.asn"], CompileOptions::der()).unwrap();

    let err = foo
        .decode("Question", b"0\x0e\x02\x01\x01\x16\x09Is 1+1=3?\xaa\xbb")
        .unwrap_err();
    assert_eq!(err.kind(), &DecodeErrorKind::TrailingBytes(2));
}

#[test]
fn test_recursive_type() {
    let all_types = compile_files(&["tests/fixtures/all_types.asn"], CompileOptions::der()).unwrap();

    let nested = Value::record([(
        "a",
        Value::list([Value::record([("a", Value::List(Vec::new()))])]),
    )]);
    let err = all_types.encode("Sequence12", &nested).unwrap_err();
    assert_eq!(
        err.to_string(),
        "a: recursive type 'Sequence12' is not yet implemented"
    );
}
