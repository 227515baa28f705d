// src/utils/normalize.rs

//! Coercion of loosely shaped JSON (from clients and from the AI model) into
//! the strict values the database stores.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Matches a leading option label such as "A) ", "b. ", "3: " or "(C) ".
static OPTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\(?(?:[A-Ha-h]|[1-8])[\)\.:]\s+").expect("option label pattern is valid")
});

/// Keys looked up when an option arrives as an object instead of a string.
const OPTION_TEXT_KEYS: [&str; 4] = ["text", "option", "label", "value"];

/// Coerces an identifier that may arrive as a number or a numeric string.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn strip_label(option: &str) -> String {
    OPTION_LABEL.replace(option.trim(), "").trim().to_string()
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => OPTION_TEXT_KEYS
            .iter()
            .find_map(|key| map.get(*key))
            .and_then(scalar_text),
        _ => None,
    }
}

/// Coerces heterogeneous option shapes into a clean list of strings.
///
/// Accepted: arrays of scalars or `{text|option|label|value}` objects, a string
/// holding a JSON array, a newline or pipe separated string, or an object
/// keyed by option letters (values taken in key order).
pub fn coerce_string_array(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(parsed @ Value::Array(_)) = serde_json::from_str::<Value>(trimmed) {
                    return coerce_string_array(&parsed);
                }
            }
            let separator = if trimmed.contains('\n') { '\n' } else { '|' };
            trimmed.split(separator).map(str::to_string).collect()
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            entries.into_iter().filter_map(|(_, v)| scalar_text(v)).collect()
        }
        _ => Vec::new(),
    };

    raw.iter()
        .map(|s| strip_label(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolves an answer against its options and returns the canonical option text.
///
/// The answer may be the option text itself (trimmed, case-insensitive, label
/// tolerated), a single option letter, or a zero-based index.
pub fn resolve_answer(answer: &Value, options: &[String]) -> Option<String> {
    resolve_answer_index(answer, options).map(|idx| options[idx].clone())
}

/// Same as `resolve_answer`, returning the position of the matching option.
pub fn resolve_answer_index(answer: &Value, options: &[String]) -> Option<usize> {
    match answer {
        Value::Number(_) => {
            let idx = usize::try_from(coerce_id(answer)?).ok()?;
            (idx < options.len()).then_some(idx)
        }
        Value::String(s) => {
            let trimmed = s.trim();
            let stripped = strip_label(trimmed);
            if let Some(found) = options.iter().position(|o| {
                o.trim().eq_ignore_ascii_case(trimmed) || o.trim().eq_ignore_ascii_case(&stripped)
            }) {
                return Some(found);
            }

            let mut chars = trimmed.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) if letter.is_ascii_alphabetic() => {
                    let idx = (letter.to_ascii_uppercase() as u8 - b'A') as usize;
                    (idx < options.len()).then_some(idx)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// True when a submitted answer matches the stored one.
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    submitted.trim().eq_ignore_ascii_case(expected.trim())
}
