use serde_json::Value;
use tokenboard_core::TokenDelta;

/// Metric name reported by instrumented agents for token usage.
pub const DEFAULT_TOKEN_USAGE_METRIC: &str = "claude_code.token.usage";

/// Counters live in signed SQLite columns; anything above this would flip
/// negative on the way in.
const MAX_COUNTER: u64 = i64::MAX as u64;

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Data point values arrive as `asInt` (a JSON number or, per OTLP JSON
/// encoding, a decimal string) or `asDouble`. Anything negative or
/// unparseable contributes nothing.
fn data_point_value(point: &Value) -> Option<u64> {
    if let Some(as_int) = point.get("asInt") {
        if let Some(value) = as_int.as_u64() {
            return Some(value);
        }
        if let Some(raw) = as_int.as_str() {
            return raw.parse::<u64>().ok();
        }
        return None;
    }
    let as_double = point.get("asDouble")?.as_f64()?;
    if as_double < 0.0 || !as_double.is_finite() {
        return None;
    }
    Some(as_double as u64)
}

fn data_point_type<'a>(point: &'a Value) -> Option<&'a str> {
    array(point, "attributes")
        .iter()
        .find(|attr| attr.get("key").and_then(Value::as_str) == Some("type"))?
        .get("value")?
        .get("stringValue")?
        .as_str()
}

/// Reduces an OTLP-shaped metrics envelope to the four token counters.
///
/// Only metrics named `metric_name` count; everything else in the envelope
/// is unrelated telemetry and is skipped. Data points with a missing or
/// unrecognized type attribute are dropped silently: partial or malformed
/// points must not fail the report. An envelope with no matching points
/// reduces to an all-zero delta, which signals "nothing to record".
pub fn extract_token_delta(envelope: &Value, metric_name: &str) -> TokenDelta {
    let mut delta = TokenDelta::default();
    for resource in array(envelope, "resourceMetrics") {
        for scope in array(resource, "scopeMetrics") {
            for metric in array(scope, "metrics") {
                if metric.get("name").and_then(Value::as_str) != Some(metric_name) {
                    continue;
                }
                let Some(sum) = metric.get("sum") else {
                    continue;
                };
                for point in array(sum, "dataPoints") {
                    let Some(value) = data_point_value(point) else {
                        continue;
                    };
                    let slot = match data_point_type(point) {
                        Some("input") => &mut delta.input_tokens,
                        Some("output") => &mut delta.output_tokens,
                        Some("cacheRead") => &mut delta.cache_read_tokens,
                        Some("cacheCreation") => &mut delta.cache_write_tokens,
                        _ => continue,
                    };
                    *slot = slot.saturating_add(value).min(MAX_COUNTER);
                }
            }
        }
    }
    delta
}
