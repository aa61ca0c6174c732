use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

use crate::GachaPullSession;

/// Stream entry field carrying the JSON message.
pub const STREAM_DATA_FIELD: &str = "data";

/// `type` discriminator of a gacha pull batch.
pub const GACHA_EVENT_TYPE: &str = "gacha_event";

#[derive(Debug, ThisError)]
pub enum StreamMessageError {
    #[error("stream entry has no `{STREAM_DATA_FIELD}` field")]
    MissingData,
    #[error("malformed stream message: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported stream message type: {0}")]
    UnsupportedType(String),
    #[error("gacha event carries no item ids")]
    NoItems,
}

/// One gacha request's pulls as published on the event stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GachaEvent {
    pub session: GachaPullSession,
    pub item_ids: Vec<i64>,
}

#[derive(Serialize)]
struct Tagged<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    event: &'a GachaEvent,
}

impl GachaEvent {
    pub fn to_json(&self) -> Result<String, StreamMessageError> {
        Ok(serde_json::to_string(&Tagged {
            kind: GACHA_EVENT_TYPE,
            event: self,
        })?)
    }

    /// Parses the `data` field of a stream entry.
    pub fn from_json(data: &str) -> Result<Self, StreamMessageError> {
        let mut value: Value = serde_json::from_str(data)?;
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if kind != GACHA_EVENT_TYPE {
            return Err(StreamMessageError::UnsupportedType(kind));
        }
        if let Some(object) = value.as_object_mut() {
            object.remove("type");
        }
        let event: GachaEvent = serde_json::from_value(value)?;
        if event.item_ids.is_empty() {
            return Err(StreamMessageError::NoItems);
        }
        Ok(event)
    }
}
