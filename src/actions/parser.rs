//! Parser for action calls in the model's answer.
//!
//! Accepted calls:
//!
//! ```text
//! do(action="Launch", app="微信")
//! do(action="Tap", element=[540, 1200])
//! do(action="Swipe", start=[540, 1600], end=[540, 400])
//! do(action="Type", text="hello")
//! do(action="Wait", duration="2 seconds")
//! finish(message="done")
//! fail(reason="login required")
//! ```
//!
//! Only the first call in the answer is parsed; anything after it is ignored.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;

use super::action::Action;

/// Pause used when a wait action has no readable duration.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(1);

/// Upper bound for a single wait.
const MAX_WAIT: Duration = Duration::from_secs(60);

const CALL_NAMES: [&str; 3] = ["do", "finish", "fail"];

/// Key for an argument given without `name=`.
const POSITIONAL: &str = "_positional";

const PREVIEW_CHARS: usize = 200;

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Action parse errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("No action call found in response: {0}")]
    NoAction(String),
    #[error("Unterminated action call: {0}")]
    Unterminated(String),
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Missing required parameter '{param}' for {action}")]
    MissingParameter { action: String, param: &'static str },
    #[error("Invalid value for '{param}': {value}")]
    InvalidParameter { param: &'static str, value: String },
}

/// Parse the first action call found in a model answer.
pub fn parse_action(response: &str) -> Result<Action, ParseError> {
    let (call, content) = first_call(response)?;
    let args = parse_arguments(content);

    match call {
        "finish" => Ok(Action::Finish {
            message: text_arg(&args, &["message", POSITIONAL])
                .unwrap_or_else(|| "Task completed".to_string()),
        }),
        "fail" => Ok(Action::Fail {
            reason: text_arg(&args, &["reason", "message", POSITIONAL])
                .unwrap_or_else(|| "Model gave up on the task".to_string()),
        }),
        _ => parse_do_action(&args),
    }
}

fn parse_do_action(args: &Map<String, Value>) -> Result<Action, ParseError> {
    let name = args
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| ParseError::MissingParameter {
            action: "do".to_string(),
            param: "action",
        })?;

    match name {
        "Launch" => {
            let app = text_arg(args, &["app"]).ok_or_else(|| missing(name, "app"))?;
            Ok(Action::LaunchApp { app })
        }
        "Tap" => {
            let (x, y) = point_arg(args, name, "element")?;
            Ok(Action::Tap { x, y })
        }
        "Swipe" => {
            let (x1, y1) = point_arg(args, name, "start")?;
            let (x2, y2) = point_arg(args, name, "end")?;
            Ok(Action::Swipe { x1, y1, x2, y2 })
        }
        "Type" | "Type_Name" => Ok(Action::TypeText {
            text: text_arg(args, &["text"]).unwrap_or_default(),
        }),
        "Wait" => Ok(Action::Wait {
            duration: wait_duration(args.get("duration")),
        }),
        other => Err(ParseError::UnknownAction(other.to_string())),
    }
}

fn missing(action: &str, param: &'static str) -> ParseError {
    ParseError::MissingParameter {
        action: action.to_string(),
        param,
    }
}

/// Locate the earliest `do(`, `finish(` or `fail(` call and return its name
/// and the text between its parentheses.
fn first_call(response: &str) -> Result<(&'static str, &str), ParseError> {
    let (start, name) = CALL_NAMES
        .iter()
        .filter_map(|name| find_call_start(response, name).map(|idx| (idx, *name)))
        .min_by_key(|(idx, _)| *idx)
        .ok_or_else(|| ParseError::NoAction(preview(response)))?;

    let open = start + name.len() + 1;
    let close = matching_paren(&response[open..])
        .ok_or_else(|| ParseError::Unterminated(preview(&response[start..])))?;

    Ok((name, &response[open..open + close]))
}

/// Byte offset of `name(` where it is not the tail of a longer identifier.
fn find_call_start(haystack: &str, name: &str) -> Option<usize> {
    let pattern = format!("{}(", name);
    haystack
        .match_indices(&pattern)
        .map(|(idx, _)| idx)
        .find(|&idx| {
            haystack[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_'))
        })
}

/// Offset of the parenthesis closing an already opened call.
fn matching_paren(content: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in content.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }

    None
}

/// Split `key=value, key=[a, b], "positional"` into a map.
fn parse_arguments(content: &str) -> Map<String, Value> {
    let mut args = Map::new();
    let mut key = String::new();
    let mut value = String::new();
    let mut quoted = false;
    let mut in_string = false;
    let mut escaped = false;
    let mut string_char = '"';
    let mut list_depth = 0usize;
    let mut parsing_key = true;

    for c in content.chars() {
        if in_string {
            if escaped {
                value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == string_char {
                in_string = false;
            } else {
                value.push(c);
            }
            continue;
        }

        if list_depth > 0 {
            value.push(c);
            match c {
                '[' => list_depth += 1,
                ']' => list_depth -= 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                in_string = true;
                quoted = true;
                string_char = c;
            }
            '[' => {
                list_depth = 1;
                value.push(c);
            }
            '=' if parsing_key => parsing_key = false,
            ',' => {
                store_argument(&mut args, &key, &value, quoted, !parsing_key);
                key.clear();
                value.clear();
                quoted = false;
                parsing_key = true;
            }
            _ if c.is_whitespace() => {
                // Keep inner spaces of unquoted values, drop the rest.
                if !parsing_key && !quoted && !value.is_empty() {
                    value.push(c);
                }
            }
            _ => {
                if parsing_key {
                    key.push(c);
                } else {
                    value.push(c);
                }
            }
        }
    }

    store_argument(&mut args, &key, &value, quoted, !parsing_key);
    args
}

fn store_argument(
    args: &mut Map<String, Value>,
    key: &str,
    value: &str,
    quoted: bool,
    has_key: bool,
) {
    if !has_key {
        let text = if quoted {
            value.to_string()
        } else {
            format!("{}{}", key, value).trim().to_string()
        };
        if !text.is_empty() && !args.contains_key(POSITIONAL) {
            args.insert(POSITIONAL.to_string(), json!(text));
        }
        return;
    }

    let key = key.trim();
    if key.is_empty() {
        return;
    }

    let parsed = if quoted {
        json!(value)
    } else {
        parse_value(value.trim())
    };
    args.insert(key.to_string(), parsed);
}

/// Parse an unquoted value: a list, a number, or bare text.
fn parse_value(raw: &str) -> Value {
    if raw.starts_with('[') && raw.ends_with(']') && raw.len() >= 2 {
        let inner = &raw[1..raw.len() - 1];
        let items: Vec<Value> = inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| parse_value(s.trim_matches(|c| c == '"' || c == '\'')))
            .collect();
        return json!(items);
    }

    if let Ok(n) = raw.parse::<i64>() {
        return json!(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return json!(f);
    }

    json!(raw)
}

fn text_arg(args: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match args.get(*key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn point_arg(
    args: &Map<String, Value>,
    action: &str,
    param: &'static str,
) -> Result<(i64, i64), ParseError> {
    let value = args.get(param).ok_or_else(|| missing(action, param))?;
    let invalid = || ParseError::InvalidParameter {
        param,
        value: value.to_string(),
    };

    let items = value.as_array().ok_or_else(invalid)?;
    if items.len() != 2 {
        return Err(invalid());
    }

    let coord = |v: &Value| {
        v.as_i64()
            .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
    };

    match (coord(&items[0]), coord(&items[1])) {
        (Some(x), Some(y)) => Ok((x, y)),
        _ => Err(invalid()),
    }
}

fn wait_duration(value: Option<&Value>) -> Duration {
    let seconds = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => NUMBER.find(s).and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    };

    match seconds {
        Some(secs) if secs.is_finite() && secs >= 0.0 => {
            Duration::from_secs_f64(secs.min(MAX_WAIT.as_secs_f64()))
        }
        _ => DEFAULT_WAIT,
    }
}

fn preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tap() {
        let action = parse_action(r#"do(action="Tap", element=[100, 200])"#).unwrap();
        assert_eq!(action, Action::Tap { x: 100, y: 200 });
    }

    #[test]
    fn test_parse_finish() {
        let action = parse_action(r#"finish(message="Task completed")"#).unwrap();
        assert_eq!(
            action,
            Action::Finish {
                message: "Task completed".to_string()
            }
        );
    }

    #[test]
    fn test_parse_positional_finish() {
        let action = parse_action(r#"finish("done")"#).unwrap();
        assert_eq!(action, Action::Finish { message: "done".to_string() });
    }

    #[test]
    fn test_parse_fail() {
        let action = parse_action(r#"fail(reason="Login required")"#).unwrap();
        assert_eq!(
            action,
            Action::Fail {
                reason: "Login required".to_string()
            }
        );
    }

    #[test]
    fn test_parse_launch_with_chinese_name() {
        let action = parse_action(r#"do(action="Launch", app="微信")"#).unwrap();
        assert_eq!(action, Action::LaunchApp { app: "微信".to_string() });
    }

    #[test]
    fn test_parse_swipe() {
        let action =
            parse_action(r#"do(action="Swipe", start=[540, 1600], end=[540, 400])"#).unwrap();
        assert_eq!(
            action,
            Action::Swipe {
                x1: 540,
                y1: 1600,
                x2: 540,
                y2: 400
            }
        );
    }

    #[test]
    fn test_quoted_numbers_stay_text() {
        let action = parse_action(r#"do(action="Type", text="12306")"#).unwrap();
        assert_eq!(action, Action::TypeText { text: "12306".to_string() });
    }

    #[test]
    fn test_text_with_commas_and_parens() {
        let action = parse_action(r#"do(action="Type", text="hi, (you) \"there\"")"#).unwrap();
        assert_eq!(
            action,
            Action::TypeText {
                text: r#"hi, (you) "there""#.to_string()
            }
        );
    }

    #[test]
    fn test_negative_coordinates_survive_parsing() {
        let action = parse_action(r#"do(action="Tap", element=[-5, 10])"#).unwrap();
        assert_eq!(action, Action::Tap { x: -5, y: 10 });
    }

    #[test]
    fn test_only_first_call_is_taken() {
        let response = "do(action=\"Tap\", element=[1, 2])\ndo(action=\"Tap\", element=[3, 4])";
        assert_eq!(parse_action(response).unwrap(), Action::Tap { x: 1, y: 2 });

        let response = "finish(message=\"a\") do(action=\"Tap\", element=[3, 4])";
        assert_eq!(
            parse_action(response).unwrap(),
            Action::Finish { message: "a".to_string() }
        );
    }

    #[test]
    fn test_leading_prose_is_skipped() {
        let response = "I will undo(nothing) first, then do(action=\"Wait\", duration=\"2 seconds\")";
        assert_eq!(
            parse_action(response).unwrap(),
            Action::Wait {
                duration: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn test_wait_durations() {
        let wait = |s: &str| match parse_action(s).unwrap() {
            Action::Wait { duration } => duration,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(wait(r#"do(action="Wait", duration="1.5 seconds")"#), Duration::from_millis(1500));
        assert_eq!(wait(r#"do(action="Wait", duration=3)"#), Duration::from_secs(3));
        assert_eq!(wait(r#"do(action="Wait")"#), DEFAULT_WAIT);
        assert_eq!(wait(r#"do(action="Wait", duration="600 seconds")"#), MAX_WAIT);
    }

    #[test]
    fn test_unknown_action() {
        let err = parse_action(r#"do(action="Teleport")"#).unwrap_err();
        assert_eq!(err, ParseError::UnknownAction("Teleport".to_string()));
    }

    #[test]
    fn test_missing_element() {
        let err = parse_action(r#"do(action="Tap")"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingParameter { param: "element", .. }));
    }

    #[test]
    fn test_invalid_element() {
        let err = parse_action(r#"do(action="Tap", element=[1])"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidParameter { param: "element", .. }));
    }

    #[test]
    fn test_unterminated_call() {
        let err = parse_action(r#"do(action="Tap", element=[1, 2]"#).unwrap_err();
        assert!(matches!(err, ParseError::Unterminated(_)));
    }

    #[test]
    fn test_no_call() {
        let err = parse_action("I am not sure what to do").unwrap_err();
        assert!(matches!(err, ParseError::NoAction(_)));
    }
}
