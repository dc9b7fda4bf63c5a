//! Decoding of inbound game frames
//!
//! Upstream frames are JSON arrays shaped `[type, {fields}]`. Only the field
//! mapping matters: its `cmd` code says whether a round was announced
//! (`1008`, carries `sid`) or settled (`1003`, carries `gBB` and `d1..d3`).

use serde_json::Value;
use sicbo_core::{Result, SessionId};

/// Command code announcing a new round
pub const CMD_SESSION_OPENED: i64 = 1008;
/// Command code carrying the dice of a finished round
pub const CMD_ROUND_SETTLED: i64 = 1003;

/// Decoded meaning of one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    SessionOpened { session_id: SessionId },
    RoundSettled { dice: [i64; 3] },
    Unrecognized,
}

/// Parse a text frame and classify it
pub fn decode_text(text: &str) -> Result<FeedEvent> {
    let value: Value = serde_json::from_str(text)?;
    Ok(classify(&value))
}

/// Classify an already-parsed frame
pub fn classify(frame: &Value) -> FeedEvent {
    let Some(fields) = frame
        .as_array()
        .and_then(|items| items.get(1))
        .and_then(Value::as_object)
    else {
        return FeedEvent::Unrecognized;
    };

    match fields.get("cmd").and_then(Value::as_i64) {
        Some(CMD_SESSION_OPENED) => match fields.get("sid").and_then(session_id) {
            Some(session_id) => FeedEvent::SessionOpened { session_id },
            None => FeedEvent::Unrecognized,
        },
        Some(CMD_ROUND_SETTLED) if fields.get("gBB").is_some_and(is_truthy) => {
            let die = |key: &str| fields.get(key).and_then(Value::as_i64);
            match (die("d1"), die("d2"), die("d3")) {
                (Some(d1), Some(d2), Some(d3)) if summable([d1, d2, d3]) => {
                    FeedEvent::RoundSettled { dice: [d1, d2, d3] }
                }
                _ => FeedEvent::Unrecognized,
            }
        }
        _ => FeedEvent::Unrecognized,
    }
}

/// Serialize an outbound subscription step
pub fn encode_step(step: &Value) -> String {
    step.to_string()
}

/// Session ids arrive as numbers, occasionally as numeric strings. Zero is
/// treated as absent.
fn session_id(value: &Value) -> Option<SessionId> {
    let id = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (id != 0).then_some(SessionId::new(id))
}

/// Faces are not range-checked, but their total must fit in an `i64`
fn summable(dice: [i64; 3]) -> bool {
    dice.iter()
        .try_fold(0i64, |total, d| total.checked_add(*d))
        .is_some()
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
