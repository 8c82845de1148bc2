//! ASCII dialect: parser grammar, nested containers, projection onto mappings and records.

use plistcodec::value::MAX_DEPTH;
use plistcodec::{ascii, plist_record, AsciiDecoder, PlistError, Value};
use std::collections::{BTreeMap, HashMap};

fn strings(items: &[&str]) -> Value {
    Value::Array(items.iter().map(|s| Value::from(*s)).collect())
}

#[derive(Debug, Default)]
struct Cities {
    names: Vec<String>,
    country: String,
    untouched: String,
}

plist_record!(Cities {
    names => "names",
    country => "country",
    untouched => _,
});

#[test]
fn test_string_array_keeps_literal_order() {
    let v = ascii::value_from_slice(br#"("San Francisco", "New York")"#).expect("decode");
    assert_eq!(v, strings(&["San Francisco", "New York"]));
}

#[test]
fn test_bare_value_is_string_in_mapping() {
    let mut m: HashMap<String, Value> = HashMap::new();
    ascii::from_slice(b"{ hey = 1; }", &mut m).expect("decode");
    assert_eq!(m.len(), 1);
    assert_eq!(m.get("hey"), Some(&Value::from("1")));
}

#[test]
fn test_quoted_key_and_escaped_quote() {
    let mut m: BTreeMap<String, Value> = BTreeMap::new();
    ascii::from_slice(br#"{ "hey\"" = 42; "two words" = <0aff>; }"#, &mut m).expect("decode");
    assert_eq!(m.get("hey\""), Some(&Value::from("42")));
    assert_eq!(m.get("two words"), Some(&Value::Data(vec![0x0a, 0xff])));
}

#[test]
fn test_nested_dictionary_in_array_is_retained() {
    let v = ascii::value_from_slice(b"{ k = (a, { x = y; }); }").expect("decode");
    let items = v.get("k").and_then(Value::as_array).expect("array");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Value::from("a"));
    assert_eq!(items[1].get("x"), Some(&Value::from("y")));
}

#[test]
fn test_nested_arrays_and_dicts() {
    let src = b"{\n\tinner = { list = ((a), (b, c)); };\n\tempty = ();\n}\n";
    let v = ascii::value_from_slice(src).expect("decode");
    let list = v.get("inner").and_then(|i| i.get("list")).expect("list");
    assert_eq!(list, &Value::Array(vec![strings(&["a"]), strings(&["b", "c"])]));
    assert_eq!(v.get("empty"), Some(&Value::Array(Vec::new())));
}

#[test]
fn test_trailing_comma_is_accepted() {
    let v = ascii::value_from_slice(b"(a, b,)").expect("decode");
    assert_eq!(v, strings(&["a", "b"]));
}

#[test]
fn test_crlf_input() {
    let v = ascii::value_from_slice(b"{\r\n  a = b;\r\n}\r\n").expect("decode");
    assert_eq!(v.get("a"), Some(&Value::from("b")));
}

#[test]
fn test_record_projection() {
    let src = br#"{ names = ("Seoul", "Lima"); country = none; untouched = "ignored"; extra = x; }"#;
    let mut c = Cities { untouched: "kept".into(), ..Default::default() };
    AsciiDecoder::new(&src[..]).decode(&mut c).expect("decode");
    assert_eq!(c.names, vec!["Seoul".to_string(), "Lima".to_string()]);
    assert_eq!(c.country, "none");
    assert_eq!(c.untouched, "kept", "fields bound with _ are never decoded");
}

#[test]
fn test_scalar_kind_mismatch_is_error() {
    let mut c = Cities::default();
    let err = ascii::from_slice(b"{ country = (a); }", &mut c).unwrap_err();
    assert!(matches!(err, PlistError::TypeMismatch { .. }), "got {:?}", err);
}

#[test]
fn test_record_needs_dictionary_root() {
    let mut c = Cities::default();
    let err = ascii::from_slice(b"(a, b)", &mut c).unwrap_err();
    assert!(matches!(err, PlistError::TypeMismatch { .. }), "got {:?}", err);
}

fn structure_err(src: &[u8]) {
    let err = ascii::value_from_slice(src).unwrap_err();
    assert!(
        matches!(err, PlistError::Structure(_)),
        "{:?}: got {:?}",
        String::from_utf8_lossy(src),
        err
    );
}

#[test]
fn test_grammar_violations_are_structure_errors() {
    structure_err(b"hello");
    structure_err(b"= x");
    structure_err(b"(a b)");
    structure_err(b"(a,,b)");
    structure_err(b"{ a b; }");
    structure_err(b"{ a = b }");
    structure_err(b"{ (a) = b; }");
    structure_err(b"{ a = ; }");
}

#[test]
fn test_truncated_input_is_structure_error() {
    structure_err(b"{ a = b;");
    structure_err(b"(a, b");
    structure_err(b"{ a = \"open");
    structure_err(b"{ a = <ab");
}

#[test]
fn test_empty_input_is_end_of_stream() {
    let err = ascii::value_from_slice(b"   \n").unwrap_err();
    assert!(matches!(err, PlistError::EndOfStream), "got {:?}", err);
}

#[test]
fn test_lexical_errors_surface() {
    let err = ascii::value_from_slice(br#"{ a = "bad\tescape"; }"#).unwrap_err();
    assert!(matches!(err, PlistError::Lexical(_)), "got {:?}", err);
    let err = ascii::value_from_slice(b"{ a = <abc>; }").unwrap_err();
    assert!(matches!(err, PlistError::Lexical(_)), "got {:?}", err);
}

#[test]
fn test_deep_nesting_is_refused() {
    let src = "(".repeat(100_000);
    let err = ascii::value_from_slice(src.as_bytes()).unwrap_err();
    assert!(matches!(&err, PlistError::Structure(msg) if msg.contains("nesting too deep")), "got {:?}", err);

    let src = format!("{}{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
    ascii::value_from_slice(src.as_bytes()).expect("nesting at the limit");
    let src = format!("{}{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
    structure_err(src.as_bytes());
}

#[test]
fn test_trailing_input_after_root() {
    structure_err(b"(a) junk");
    structure_err(b"{ a = b; } }");
    structure_err(b"(a)(b)");
    let v = ascii::value_from_slice(b"(a)\n  \n").expect("trailing whitespace");
    assert_eq!(v, strings(&["a"]));
}
