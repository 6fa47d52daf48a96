//! S-expression plist helpers shared by config loading, trace parsing and
//! event output.
//!
//! Keys are written `:key` and matched in both `Value::Keyword("key")`
//! (elisp parser) and `Value::Symbol(":key")` (default parser) forms.

use lexpr::Value;

/// Find the value following `:key` in a plist.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Extract a scalar plist value rendered as a string.
///
/// Keywords lose their leading colon, `t`/`nil` stay as written.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    let val = get_value(value, key)?;
    match val {
        Value::Keyword(v) => Some(v.to_string()),
        Value::Symbol(v) => {
            let s = v.to_string();
            Some(s.strip_prefix(':').unwrap_or(&s).to_string())
        }
        Value::String(v) => Some(v.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "t" } else { "nil" }.to_string()),
        Value::Null | Value::Nil => Some("nil".to_string()),
        _ => Some(val.to_string()),
    }
}

/// Extract an integer value from an s-expression plist.
pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a boolean value from an s-expression plist.
/// Treats "nil" (and the empty list) as false, anything else as true.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil" && s != "#f")
}

/// Extract a floating-point value from an s-expression plist.
pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Elements of a proper list (or vector). Anything else yields no items.
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    match value {
        Value::Vector(items) => out.extend(items.iter()),
        _ => {
            let mut current = value;
            while let Value::Cons(pair) = current {
                out.push(pair.car());
                current = pair.cdr();
            }
        }
    }
    out
}

/// Numeric value as `f32`.
pub fn as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        _ => None,
    }
}

/// Parse `(x y)` into a point.
pub fn parse_point(value: &Value) -> Option<[f32; 2]> {
    let items = list_items(value);
    if items.len() != 2 {
        return None;
    }
    Some([as_f32(items[0])?, as_f32(items[1])?])
}

/// Parse `((x y) ...)` into a point list. Any malformed point fails the whole list.
pub fn parse_points(value: &Value) -> Option<Vec<[f32; 2]>> {
    list_items(value).into_iter().map(parse_point).collect()
}

/// Render a point list as `((x y) ...)`.
pub fn format_points(points: &[[f32; 2]]) -> String {
    let mut s = String::from("(");
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        s.push_str(&format!("({:.4} {:.4})", p[0], p[1]));
    }
    s.push(')');
    s
}

/// `t` / `nil`.
pub fn bool_sexp(b: bool) -> &'static str {
    if b {
        "t"
    } else {
        "nil"
    }
}

/// Quoted string or `nil`.
pub fn opt_string_sexp(s: Option<&str>) -> String {
    match s {
        Some(s) => format!("\"{}\"", escape_string(s)),
        None => "nil".to_string(),
    }
}

/// Escape a string for s-expression output.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Format an event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}
