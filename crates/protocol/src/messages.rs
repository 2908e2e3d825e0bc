//! WebSocket message framing.
//!
//! Every frame in both directions is a JSON object with a string `type`
//! discriminator. All other fields form the payload. There is no envelope
//! versioning, no sequence numbering and no acknowledgement.

use serde::{Deserialize, Serialize};

/// Named fields of a message, without the `type` discriminator.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Name of the discriminator field on the wire.
pub const TYPE_FIELD: &str = "type";

/// Message-type discriminators used by the game server.
pub mod kinds {
    // Client -> server
    pub const VIDEO_FRAME: &str = "video_frame";
    pub const PLAYER_READY: &str = "player_ready";
    pub const RESTART_GAME: &str = "restart_game";

    // Server -> client
    pub const PLAYER_JOINED: &str = "player_joined";
    pub const PLAYER_LEFT: &str = "player_left";
    pub const GAME_START: &str = "game_start";
    pub const ERROR: &str = "error";
    pub const GESTURE_DETECTED: &str = "gesture_detected";
    pub const OPPONENT_FRAME: &str = "opponent_frame";
    pub const GAME_RESTARTED: &str = "game_restarted";
    pub const COUNTDOWN: &str = "countdown";
    pub const ROUND_START: &str = "round_start";
    pub const ROUND_RESULT: &str = "round_result";
    pub const NEXT_ROUND: &str = "next_round";
    pub const GAME_END: &str = "game_end";

    /// Every type the server sends.
    pub const SERVER_EVENTS: &[&str] = &[
        PLAYER_JOINED,
        PLAYER_LEFT,
        GAME_START,
        ERROR,
        GESTURE_DETECTED,
        OPPONENT_FRAME,
        PLAYER_READY,
        GAME_RESTARTED,
        COUNTDOWN,
        ROUND_START,
        ROUND_RESULT,
        NEXT_ROUND,
        GAME_END,
    ];
}

/// A single tagged record as carried on the WebSocket.
///
/// The payload never contains the `type` key: it is consumed by `kind` when
/// parsing and stripped by the constructors when building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    payload: Payload,
}

impl WireMessage {
    /// Create a message with an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Payload::new(),
        }
    }

    /// Create a message from a kind and an existing payload.
    pub fn from_parts(kind: impl Into<String>, mut payload: Payload) -> Self {
        payload.remove(TYPE_FIELD);
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Add a payload field. A field named `type` is ignored.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let key = key.into();
        if key != TYPE_FIELD {
            self.payload.insert(key, value.into());
        }
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Parse a raw text frame.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize into a raw text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Rebuild the full JSON object, discriminator included.
    pub fn to_value(&self) -> serde_json::Value {
        let mut object = self.payload.clone();
        object.insert(
            TYPE_FIELD.to_string(),
            serde_json::Value::String(self.kind.clone()),
        );
        serde_json::Value::Object(object)
    }
}
