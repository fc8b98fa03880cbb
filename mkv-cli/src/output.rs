//! Reply rendering for the terminal.

use mkv_manager::{ServerSpec, Value};
use serde_json::json;

/// Renders a reply the way interactive store shells do.
pub fn render(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, 0, &mut out);
    out
}

fn render_into(value: &Value, indent: usize, out: &mut String) {
    match value {
        Value::Nil => out.push_str("(nil)"),
        Value::Simple(text) => out.push_str(&String::from_utf8_lossy(text)),
        Value::Error(text) => {
            out.push_str("(error) ");
            out.push_str(&String::from_utf8_lossy(text));
        }
        Value::Integer(number) => out.push_str(&format!("(integer) {}", number)),
        Value::Bulk(data) => out.push_str(&format!("{:?}", String::from_utf8_lossy(data))),
        Value::Array(items) if items.is_empty() => out.push_str("(empty array)"),
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push('\n');
                    out.push_str(&" ".repeat(indent));
                }
                let label = format!("{}) ", idx + 1);
                out.push_str(&label);
                render_into(item, indent + label.len(), out);
            }
        }
    }
}

/// Converts a reply to JSON; nil becomes `null`, error replies become
/// `{"error": ...}`.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Nil => serde_json::Value::Null,
        Value::Simple(text) | Value::Bulk(text) => json!(String::from_utf8_lossy(text)),
        Value::Error(text) => json!({ "error": String::from_utf8_lossy(text) }),
        Value::Integer(number) => json!(number),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
    }
}

/// One-line summary of a server entry; the password is never printed.
pub fn describe_server(spec: &ServerSpec) -> String {
    format!(
        "{}\t{}:{}\tdb={}\t{}{}",
        spec.name,
        spec.host,
        spec.port,
        spec.database,
        if spec.persistent { "persistent" } else { "transient" },
        if spec.auth_password().is_some() { "\tauth" } else { "" },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_scalars() {
        assert_eq!(render(&Value::Nil), "(nil)");
        assert_eq!(render(&Value::Simple(b"PONG".to_vec())), "PONG");
        assert_eq!(render(&Value::Integer(-2)), "(integer) -2");
        assert_eq!(render(&Value::Bulk(b"hi".to_vec())), "\"hi\"");
        assert_eq!(render(&Value::Bulk(Vec::new())), "\"\"");
    }

    #[test]
    fn renders_nested_arrays() {
        let value = Value::Array(vec![
            Value::Bulk(b"a".to_vec()),
            Value::Array(vec![Value::Integer(1), Value::Nil]),
        ]);
        assert_eq!(render(&value), "1) \"a\"\n2) 1) (integer) 1\n   2) (nil)");
        assert_eq!(render(&Value::Array(Vec::new())), "(empty array)");
    }

    #[test]
    fn converts_to_json() {
        let value = Value::Array(vec![
            Value::Nil,
            Value::Integer(3),
            Value::Bulk(b"x".to_vec()),
            Value::Error(b"ERR nope".to_vec()),
        ]);
        assert_eq!(to_json(&value), json!([null, 3, "x", { "error": "ERR nope" }]));
    }

    #[test]
    fn describe_hides_password() {
        let spec = ServerSpec::new("sessions", "10.0.0.7")
            .with_password("secret")
            .with_database(2)
            .persistent(true);
        let line = describe_server(&spec);
        assert_eq!(line, "sessions\t10.0.0.7:6379\tdb=2\tpersistent\tauth");
        assert!(!line.contains("secret"));
    }
}
