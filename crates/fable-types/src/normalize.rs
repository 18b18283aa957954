//! Normalization for loosely-shaped LLM payloads.
//!
//! World-generation and turn payloads arrive from a model, so scalar fields
//! drift: compliance scalars come back as percentages or level words, item
//! maps come back as lists of objects, language codes come back in a dozen
//! spellings. These helpers coerce such values into canonical shapes before
//! strict deserialization. Unrecognized input is left alone for the strict
//! layer to reject.

use std::collections::BTreeMap;

use serde_json::Value;

/// Extract a number from a JSON value, tolerating `"70%"` and `"about 3"`.
pub fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(_) => None,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let text = s.trim().to_lowercase();
            if text.is_empty() {
                return None;
            }
            if let Some(body) = text.strip_suffix('%') {
                return body.trim().parse::<f64>().ok().map(|n| n / 100.0);
            }
            let text = text.replace(',', "");
            extract_first_number(&text)
        }
        _ => None,
    }
}

fn extract_first_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut start = None;
    for (i, &b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() || (b == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            start = Some(i);
            break;
        }
    }
    let start = start?;
    let mut end = start + 1;
    let mut seen_dot = false;
    while end < bytes.len() {
        let b = bytes[end];
        if b.is_ascii_digit() {
            end += 1;
        } else if b == b'.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    text.get(start..end)?.trim_end_matches('.').parse().ok()
}

/// Map level words (`low`/`medium`/`high`) to unit-interval values.
fn level_word(text: &str) -> Option<f64> {
    match text {
        "low" => Some(0.2),
        "medium" | "med" | "average" => Some(0.5),
        "high" => Some(0.8),
        "very high" => Some(0.9),
        _ => None,
    }
}

/// Normalize a compliance scalar into [0, 1].
///
/// Values in (1, 10] are treated as a 0-10 scale, values in (10, 100] as a
/// percentage. Level words map through a fixed table. Returns `None` when
/// the value cannot be interpreted.
pub fn normalize_unit(value: &Value) -> Option<f64> {
    let parsed = parse_number(value).or_else(|| {
        value
            .as_str()
            .and_then(|s| level_word(s.trim().to_lowercase().as_str()))
    })?;

    let mut normalized = parsed;
    if normalized > 1.0 {
        if normalized <= 10.0 {
            normalized /= 10.0;
        } else if normalized <= 100.0 {
            normalized /= 100.0;
        }
    }
    Some((normalized.clamp(0.0, 1.0) * 1000.0).round() / 1000.0)
}

/// Keyword table for disposition words.
const DISPOSITION_KEYWORDS: &[(&str, f64)] = &[
    ("very hostile", -5.0),
    ("hostile", -4.0),
    ("hate", -5.0),
    ("angry", -3.0),
    ("suspicious", -2.0),
    ("wary", -2.0),
    ("skeptical", -1.0),
    ("cautious", -1.0),
    ("neutral", 0.0),
    ("friendly", 2.0),
    ("warm", 2.0),
    ("kind", 2.0),
    ("helpful", 3.0),
    ("trusting", 3.0),
    ("ally", 4.0),
];

/// Normalize a disposition value into an integer in [-5, 5].
///
/// Accepts numbers on a 0-10 or -10..10 scale and attitude keywords
/// (averaged when several match). Returns `None` when uninterpretable.
pub fn normalize_disposition(value: &Value) -> Option<i32> {
    let parsed = parse_number(value).or_else(|| {
        let text = value.as_str()?.trim().to_lowercase();
        let scores: Vec<f64> = DISPOSITION_KEYWORDS
            .iter()
            .filter(|(word, _)| text.contains(word))
            .map(|(_, score)| *score)
            .collect();
        if scores.is_empty() {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            let count = scores.len() as f64;
            Some(scores.iter().sum::<f64>() / count)
        }
    })?;

    let mut normalized = parsed;
    if !(-5.0..=5.0).contains(&normalized) {
        if (0.0..=10.0).contains(&normalized) {
            normalized -= 5.0;
        } else if (-10.0..=10.0).contains(&normalized) {
            normalized /= 2.0;
        }
    }
    #[allow(clippy::cast_possible_truncation)]
    let rounded = normalized.round() as i32;
    Some(rounded.clamp(-5, 5))
}

/// Coerce an item map from either `{"herb": 2}` or
/// `[{"item": "herb", "count": 2}]` shape. Non-positive and unparseable
/// entries are dropped.
pub fn coerce_item_map(value: &Value) -> BTreeMap<String, u32> {
    let mut result = BTreeMap::new();
    match value {
        Value::Object(map) => {
            for (key, raw) in map {
                if let Some(amount) = positive_count(raw) {
                    result.insert(key.clone(), amount);
                }
            }
        }
        Value::Array(items) => {
            for entry in items {
                let Value::Object(map) = entry else { continue };
                let name = map
                    .get("item")
                    .or_else(|| map.get("name"))
                    .and_then(Value::as_str);
                let Some(name) = name else { continue };
                let count = map
                    .get("count")
                    .or_else(|| map.get("qty"))
                    .or_else(|| map.get("quantity"));
                let amount = match count {
                    Some(raw) => positive_count(raw),
                    None => Some(1),
                };
                if let Some(amount) = amount {
                    result.insert(name.to_owned(), amount);
                }
            }
        }
        _ => {}
    }
    result
}

fn positive_count(value: &Value) -> Option<u32> {
    let parsed = parse_number(value)?;
    let rounded = parsed.round();
    if rounded > 0.0 && rounded <= f64::from(u32::MAX) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let amount = rounded as u32;
        Some(amount)
    } else {
        None
    }
}

/// Normalize a narrative language value to `"en"` or `"zh"`.
pub fn normalize_narrative_language(value: &str) -> Option<&'static str> {
    match value.trim().to_lowercase().as_str() {
        "zh" | "zh-cn" | "zh_hans" | "chinese" | "中文" | "cn" => Some("zh"),
        "en" | "en-us" | "english" | "英文" => Some("en"),
        _ => None,
    }
}

/// Canonicalize an item name: lowercase ASCII, spaces and dashes collapse
/// to underscores. CJK text passes through unchanged apart from trimming.
pub fn normalize_item_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.trim().chars() {
        if c == ' ' || c == '-' || c == '_' {
            if !last_was_sep && !out.is_empty() {
                out.push('_');
            }
            last_was_sep = true;
        } else {
            out.extend(c.to_lowercase());
            last_was_sep = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}
