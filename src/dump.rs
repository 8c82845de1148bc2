//! Format decoded values for display (multi-line dump text).

use crate::value::Value;
use chrono::SecondsFormat;

fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Raw scalar text for leaves; containers fall back to their kind name.
pub fn format_scalar(v: &Value) -> String {
    match v {
        Value::String(s) => format!("{:?}", s),
        Value::Data(b) => format!("hex({})", hex_string(b)),
        Value::Boolean(b) => format!("{}", b),
        Value::Integer(x) => format!("{}", x),
        Value::Real(x) => format!("{}", x),
        Value::Date(d) => d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        Value::Array(_) | Value::Dictionary(_) => v.kind().to_string(),
    }
}

/// Format a value for display; nested containers are indented two spaces per level.
pub fn value_to_dump(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::Dictionary(m) => {
            if m.is_empty() {
                return format!("{}{{}}", pad);
            }
            let mut lines: Vec<String> = vec![format!("{}{{", pad)];
            for (k, val) in m {
                let sub = value_to_dump(val, indent + 1);
                lines.push(format!("{}  {}: {}", pad, k, sub.trim_start()));
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        Value::Array(items) => {
            if items.is_empty() {
                return format!("{}[]", pad);
            }
            let mut lines: Vec<String> = vec![format!("{}[", pad)];
            for (i, item) in items.iter().enumerate() {
                let sub = value_to_dump(item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        scalar => format!("{}{}", pad, format_scalar(scalar)),
    }
}
