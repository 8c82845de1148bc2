//! XML dialect: preamble, element decoding, empty-value policy, strict mode, record projection.

use chrono::{TimeZone, Utc};
use plistcodec::value::MAX_DEPTH;
use plistcodec::xml::{self, PLIST_DOCTYPE};
use plistcodec::{plist_record, Mode, PlistError, Value, XmlDecoder};
use std::collections::{BTreeMap, HashMap};

fn doc(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n<plist version=\"1.0\">\n{}\n</plist>\n",
        PLIST_DOCTYPE, body
    )
}

fn value_of(body: &str) -> Value {
    xml::value_from_slice(doc(body).as_bytes())
        .expect("decode")
        .expect("non-empty plist")
}

fn structure_message(err: PlistError) -> String {
    match err {
        PlistError::Structure(msg) => msg,
        other => panic!("expected structure error, got {:?}", other),
    }
}

#[derive(Debug, Default, PartialEq)]
struct Entitlements {
    get_task_allow: bool,
}

plist_record!(Entitlements {
    get_task_allow => "get-task-allow",
});

#[derive(Debug, Default)]
struct RecursiveEntitlements {
    get_task_allow: bool,
    entitlements: Entitlements,
}

plist_record!(RecursiveEntitlements {
    get_task_allow => "get-task-allow",
    entitlements => "Entitlements",
});

#[derive(Debug, Default)]
struct ConcreteArray {
    array: Vec<i32>,
}

plist_record!(ConcreteArray { array => "Array" });

#[derive(Debug, Default)]
struct AnyArray {
    array: Vec<Value>,
}

plist_record!(AnyArray { array => "Array" });

const ENTITLEMENTS: &str = "<dict>\n\t<key>get-task-allow</key>\n\t<true/>\n</dict>";

#[test]
fn test_entitlements_into_mapping() {
    let mut map: HashMap<String, Value> = HashMap::new();
    xml::from_slice(doc(ENTITLEMENTS).as_bytes(), &mut map).expect("decode");
    assert_eq!(map.get("get-task-allow"), Some(&Value::Boolean(true)));
}

#[test]
fn test_entitlements_into_record() {
    let mut e = Entitlements::default();
    xml::from_slice(doc(ENTITLEMENTS).as_bytes(), &mut e).expect("decode");
    assert!(e.get_task_allow);
}

#[test]
fn test_weird_whitespace_between_elements() {
    let body = "   <dict>\n\n  <key>get-task-allow</key>\t\t\n   <true/>   \n\n</dict>  ";
    let mut e = Entitlements::default();
    xml::from_slice(doc(body).as_bytes(), &mut e).expect("decode");
    assert!(e.get_task_allow);
}

#[test]
fn test_recursive_record() {
    let body = "<dict><key>get-task-allow</key><true/><key>Entitlements</key><dict><key>get-task-allow</key><true/></dict></dict>";
    let mut r = RecursiveEntitlements::default();
    xml::from_slice(doc(body).as_bytes(), &mut r).expect("decode");
    assert!(r.get_task_allow);
    assert!(r.entitlements.get_task_allow);
}

#[test]
fn test_nested_record_requires_dictionary() {
    let body = "<dict><key>Entitlements</key><string>nope</string></dict>";
    let mut r = RecursiveEntitlements::default();
    let err = xml::from_slice(doc(body).as_bytes(), &mut r).unwrap_err();
    assert!(matches!(err, PlistError::TypeMismatch { .. }), "got {:?}", err);
}

#[test]
fn test_date_is_normalized_to_utc() {
    let v = value_of("<dict><key>now</key><date>2012-01-29T14:07:25+01:00</date></dict>");
    let expected = Utc.with_ymd_and_hms(2012, 1, 29, 13, 7, 25).single().expect("date");
    assert_eq!(v.get("now").and_then(Value::as_date), Some(&expected));
}

#[test]
fn test_decode_everything_array() {
    let body = "<array>\n<integer>42</integer>\n<real>50</real>\n<date>2012-01-29T13:07:25Z</date>\n<data>////</data>\n<string>hello</string>\n<dict><key>hey</key><string>ok</string></dict>\n</array>";
    let v = value_of(body);
    let items = v.as_array().expect("array");
    assert_eq!(items.len(), 6);
    assert_eq!(items[0], Value::Integer(42));
    assert_eq!(items[1], Value::Real(50.0));
    let expected = Utc.with_ymd_and_hms(2012, 1, 29, 13, 7, 25).single().expect("date");
    assert_eq!(items[2], Value::Date(expected));
    assert_eq!(items[3], Value::Data(vec![0xff, 0xff, 0xff]));
    assert_eq!(items[4], Value::from("hello"));
    assert_eq!(items[5].get("hey").and_then(Value::as_str), Some("ok"));
}

#[test]
fn test_concrete_array_narrows_integers() {
    let body = "<dict><key>Array</key><array><integer>0</integer><integer>1</integer><integer>2</integer></array></dict>";
    let mut ca = ConcreteArray::default();
    xml::from_slice(doc(body).as_bytes(), &mut ca).expect("decode");
    assert_eq!(ca.array, vec![0, 1, 2]);
}

#[test]
fn test_any_array_keeps_mixed_kinds() {
    let body = "<dict><key>Array</key><array><integer>0</integer><string>hello</string><data>d29ybGQ=</data></array></dict>";
    let mut a = AnyArray::default();
    xml::from_slice(doc(body).as_bytes(), &mut a).expect("decode");
    assert_eq!(
        a.array,
        vec![Value::Integer(0), Value::from("hello"), Value::Data(b"world".to_vec())]
    );
}

#[test]
fn test_mixed_array_into_integers_is_mismatch() {
    let body = "<dict><key>Array</key><array><integer>0</integer><string>hello</string></array></dict>";
    let mut ca = ConcreteArray { array: vec![7] };
    let err = xml::from_slice(doc(body).as_bytes(), &mut ca).unwrap_err();
    assert!(matches!(err, PlistError::TypeMismatch { .. }), "got {:?}", err);
    assert_eq!(ca.array, vec![7], "vector is assigned only when fully converted");
}

#[test]
fn test_empty_array_clears_field() {
    let body = "<dict><key>Array</key><array/></dict>";
    let mut ca = ConcreteArray { array: vec![1, 2, 3] };
    xml::from_slice(doc(body).as_bytes(), &mut ca).expect("decode");
    assert!(ca.array.is_empty());
}

#[test]
fn test_empty_integer_real_date_need_character_data() {
    for tag in ["integer", "real", "date"] {
        for body in [format!("<{}></{}>", tag, tag), format!("<{}/>", tag)] {
            let err = xml::value_from_slice(doc(&body).as_bytes()).unwrap_err();
            let msg = structure_message(err);
            assert!(msg.contains("expected character data"), "{}: {}", body, msg);
        }
    }
}

#[test]
fn test_empty_data_string_array_dict_are_valid() {
    assert_eq!(value_of("<data></data>"), Value::Data(Vec::new()));
    assert_eq!(value_of("<data/>"), Value::Data(Vec::new()));
    assert_eq!(value_of("<string></string>"), Value::from(""));
    assert_eq!(value_of("<string/>"), Value::from(""));
    assert_eq!(value_of("<array></array>"), Value::Array(Vec::new()));
    assert_eq!(value_of("<dict></dict>"), Value::Dictionary(BTreeMap::new()));
}

#[test]
fn test_empty_plist_yields_nothing() {
    let src = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n<plist version=\"1.0\"/>\n", PLIST_DOCTYPE);
    assert_eq!(xml::value_from_slice(src.as_bytes()).expect("decode"), None);
    let src = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}\n<plist version=\"1.0\"></plist>\n", PLIST_DOCTYPE);
    assert_eq!(xml::value_from_slice(src.as_bytes()).expect("decode"), None);
    let mut e = Entitlements { get_task_allow: true };
    xml::from_slice(src.as_bytes(), &mut e).expect("decode");
    assert!(e.get_task_allow, "empty plist leaves the target untouched");
}

#[test]
fn test_scalar_root_in_permissive_mode() {
    assert_eq!(value_of("<string>hey what up?</string>"), Value::from("hey what up?"));
    assert_eq!(value_of("<false/>"), Value::Boolean(false));
}

#[test]
fn test_strict_mode_rejects_scalar_root() {
    let src = doc("<string>hey what up?</string>");
    let err = XmlDecoder::with_mode(src.as_bytes(), Mode::Strict).decode_value().unwrap_err();
    assert!(matches!(err, PlistError::Structure(_)), "got {:?}", err);
}

#[test]
fn test_strict_mode_rejects_stray_text() {
    let src = doc("<dict>junk<key>a</key><true/></dict>");
    let err = XmlDecoder::with_mode(src.as_bytes(), Mode::Strict).decode_value().unwrap_err();
    assert!(matches!(err, PlistError::Structure(_)), "got {:?}", err);
    let v = XmlDecoder::new(src.as_bytes()).decode_value().expect("permissive").expect("root");
    assert_eq!(v.get("a"), Some(&Value::Boolean(true)));
}

#[test]
fn test_strict_mode_accepts_well_formed_dict() {
    let src = doc(ENTITLEMENTS);
    let v = XmlDecoder::with_mode(src.as_bytes(), Mode::Strict)
        .decode_value()
        .expect("decode")
        .expect("root");
    assert_eq!(v.get("get-task-allow"), Some(&Value::Boolean(true)));
}

#[test]
fn test_entities_and_wrapped_base64() {
    let v = value_of("<array><string>a &lt; b &amp; c</string><data>\n\taGVs\n\tbG8=\n</data></array>");
    let items = v.as_array().expect("array");
    assert_eq!(items[0], Value::from("a < b & c"));
    assert_eq!(items[1], Value::Data(b"hello".to_vec()));
}

#[test]
fn test_malformed_scalars_are_lexical() {
    for body in ["<integer>4x2</integer>", "<real>fast</real>", "<date>yesterday</date>", "<data>!!!</data>"] {
        let err = xml::value_from_slice(doc(body).as_bytes()).unwrap_err();
        assert!(matches!(err, PlistError::Lexical(_)), "{}: {:?}", body, err);
    }
}

#[test]
fn test_missing_declaration_is_structure_error() {
    let src = format!("{}\n<plist version=\"1.0\"><dict/></plist>", PLIST_DOCTYPE);
    let err = xml::value_from_slice(src.as_bytes()).unwrap_err();
    assert!(matches!(err, PlistError::Structure(_)), "got {:?}", err);
}

#[test]
fn test_wrong_plist_version() {
    let src = format!("<?xml version=\"1.0\"?>\n{}\n<plist version=\"2.0\"><dict/></plist>", PLIST_DOCTYPE);
    let err = xml::value_from_slice(src.as_bytes()).unwrap_err();
    assert!(matches!(err, PlistError::Structure(_)), "got {:?}", err);
}

#[test]
fn test_key_without_value() {
    let err = xml::value_from_slice(doc("<dict><key>a</key></dict>").as_bytes()).unwrap_err();
    assert!(structure_message(err).contains("missing value"));
}

#[test]
fn test_mismatched_end_tag_is_xml_error() {
    let err = xml::value_from_slice(doc("<array><string>x</array>").as_bytes()).unwrap_err();
    assert!(
        matches!(err, PlistError::Xml(_) | PlistError::Structure(_)),
        "got {:?}",
        err
    );
}

#[test]
fn test_deep_nesting_is_refused() {
    let body = format!("{}{}", "<array>".repeat(100_000), "</array>".repeat(100_000));
    let err = xml::value_from_slice(doc(&body).as_bytes()).unwrap_err();
    assert!(structure_message(err).contains("nesting too deep"));

    let body = format!("{}<dict/>{}", "<array>".repeat(MAX_DEPTH), "</array>".repeat(MAX_DEPTH));
    xml::value_from_slice(doc(&body).as_bytes()).expect("nesting at the limit");

    let body = format!(
        "{}{}",
        "<dict><key>k</key>".repeat(MAX_DEPTH + 1),
        "<true/></dict>".to_string() + &"</dict>".repeat(MAX_DEPTH)
    );
    let err = xml::value_from_slice(doc(&body).as_bytes()).unwrap_err();
    assert!(structure_message(err).contains("nesting too deep"));
}
