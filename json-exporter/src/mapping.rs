//! Mapping from path expressions and JSON values to Prometheus gauges.

use serde_json::Value;

/// Derive the gauge name for a path expression.
///
/// The name is the final `.`-separated segment, taken verbatim:
/// `a.b.c` becomes `c` and `items[0]` stays `items[0]` (which then fails
/// [`is_valid_metric_name`]). A bare `$` and any path ending in an index
/// therefore cannot name a gauge; end such paths on a member instead
/// (`items[0].depth`).
pub fn metric_name_for_path(expression: &str) -> &str {
    expression.rsplit('.').next().unwrap_or(expression)
}

/// Check a name against the exposition grammar `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Render any JSON value as text.
///
/// Numbers keep their JSON form, strings are used verbatim and everything
/// else is compact JSON (`true`, `null`, `[1,2]`, ...).
pub fn render_value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Coerce a resolved JSON value into a gauge value.
///
/// Commas are treated as decimal separators, so `"5,5"` yields `5.5`.
/// Returns `None` when the text is not a float.
pub fn coerce_to_f64(value: &Value) -> Option<f64> {
    let text = render_value_text(value).replace(',', ".");
    text.parse::<f64>().ok()
}
