//! Best-effort extraction of an [`AnalysisRecord`] from free-form model text.
//!
//! This never fails: if no candidate span parses as a JSON object the record is
//! built from fixed fallback values.

use crate::domain::analysis::{
    AnalysisRecord, NOT_AVAILABLE, NOT_SPECIFIED, RECOMMENDATION_LONG, RECOMMENDATION_SHORT,
};
use serde_json::{Map, Value};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

const FALLBACK_CERTAINTY: i64 = 75;
const FALLBACK_LEVEL: &str = "See report";
const FALLBACK_RISK_REWARD: &str = "2:1";

/// Contents of the first ```` ```json ```` fenced block.
pub fn fenced_json_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &text[start..];
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let end = rest.find(FENCE_CLOSE)?;
    let inner = &rest[..end];
    Some(inner.strip_suffix('\n').unwrap_or(inner))
}

/// First `{` to last `}`.
pub fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Candidate spans in priority order.
pub fn candidates(text: &str) -> Vec<&str> {
    let mut out = Vec::with_capacity(3);
    out.extend(fenced_json_block(text));
    out.extend(brace_span(text));
    out.push(text);
    out
}

/// First candidate that parses as a JSON object.
pub fn extract_object(text: &str) -> Option<Map<String, Value>> {
    candidates(text)
        .into_iter()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

pub fn interpret(raw: &str) -> AnalysisRecord {
    match extract_object(raw) {
        Some(object) => from_object(&object, raw),
        None => {
            tracing::warn!(len = raw.len(), "no JSON object in completion; using fallback record");
            fallback(raw)
        }
    }
}

/// Maps a parsed object onto the record, substituting sentinels for absent or
/// falsy fields.
pub fn from_object(object: &Map<String, Value>, raw: &str) -> AnalysisRecord {
    let text = |key: &str, default: &str| {
        object
            .get(key)
            .and_then(truthy_text)
            .unwrap_or_else(|| default.to_string())
    };

    AnalysisRecord {
        recommendation: text("recommendation", NOT_AVAILABLE),
        certainty: object.get("certainty").and_then(certainty).unwrap_or(0),
        entry_price: text("entryPrice", NOT_SPECIFIED),
        stop_loss: text("stopLoss", NOT_SPECIFIED),
        take_profit: text("takeProfit", NOT_SPECIFIED),
        risk_reward_ratio: text("riskRewardRatio", NOT_AVAILABLE),
        report: object
            .get("report")
            .and_then(truthy_text)
            .unwrap_or_else(|| raw.to_string()),
    }
}

pub fn fallback(raw: &str) -> AnalysisRecord {
    let recommendation = if raw.to_uppercase().contains(RECOMMENDATION_LONG) {
        RECOMMENDATION_LONG
    } else {
        RECOMMENDATION_SHORT
    };

    AnalysisRecord {
        recommendation: recommendation.to_string(),
        certainty: FALLBACK_CERTAINTY,
        entry_price: FALLBACK_LEVEL.to_string(),
        stop_loss: FALLBACK_LEVEL.to_string(),
        take_profit: FALLBACK_LEVEL.to_string(),
        risk_reward_ratio: FALLBACK_RISK_REWARD.to_string(),
        report: raw.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    if !is_truthy(value) {
        return None;
    }
    Some(match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn certainty(value: &Value) -> Option<i64> {
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            let s = s.strip_suffix('%').unwrap_or(s).trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}
