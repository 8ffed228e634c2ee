/// WebSocket message types for real-time notifications
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{CommentPayload, LikePayload};

/// Events pushed from server to client
///
/// On the wire every event is `{"type": <tag>, "payload": <object>}`; clients switch on
/// `type` to decode `payload`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Event {
    /// Someone liked a post owned by the recipient
    NewLike(LikePayload),

    /// Someone commented on a post owned by the recipient
    NewComment(CommentPayload),
}

impl Event {
    pub fn new_like(like: LikePayload) -> Self {
        Event::NewLike(like)
    }

    pub fn new_comment(comment: CommentPayload) -> Self {
        Event::NewComment(comment)
    }

    /// Wire tag of this event
    pub fn kind(&self) -> &'static str {
        match self {
            Event::NewLike(_) => "new_like",
            Event::NewComment(_) => "new_comment",
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Frame received from a client
///
/// The protocol is push-only, so inbound frames are only decoded far enough to be logged.
/// A frame is well formed when it is JSON `null` or an object whose `type`, if present, is a
/// string or `null`. Unknown keys are ignored and `payload` may hold any JSON value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundFrame {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl InboundFrame {
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        let frame: Option<InboundFrame> = serde_json::from_slice(raw)?;
        Ok(frame.unwrap_or_default())
    }
}
