// Lenient JSON field access shared by the clients.
//
// Printer firmwares are sloppy about types: numeric fields arrive as
// numbers, numeric strings, or null depending on firmware version.

use serde_json::Value;

/// Coerce a JSON value to `f64`: numbers pass through, numeric strings
/// are parsed, everything else (including absence) becomes `0.0`.
pub(crate) fn num(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// String field access: empty string when absent or not a string.
pub(crate) fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
