//! Outbound game message construction
//!
//! Centralizes the shape of every message the player sends, so callers never
//! spell out field names by hand.

use rpsonline_protocol::{kinds, WireMessage};

/// Builder for outbound game messages
///
/// # Usage
///
/// ```rust,ignore
/// let msg = ClientMessageBuilder::video_frame(&encoded);
/// channel.send(&msg);
/// ```
pub struct ClientMessageBuilder;

impl ClientMessageBuilder {
    /// Create a VideoFrame message carrying a base64 JPEG (bare or data URL)
    pub fn video_frame(frame: &str) -> WireMessage {
        WireMessage::new(kinds::VIDEO_FRAME).with("frame", frame)
    }

    /// Create a PlayerReady message
    pub fn player_ready() -> WireMessage {
        WireMessage::new(kinds::PLAYER_READY)
    }

    /// Create a RestartGame message
    pub fn restart_game() -> WireMessage {
        WireMessage::new(kinds::RESTART_GAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_video_frame_carries_frame_field() {
        let msg = ClientMessageBuilder::video_frame("abc");
        assert_eq!(msg.to_value(), json!({"type": "video_frame", "frame": "abc"}));
    }

    #[test]
    fn test_control_messages_have_no_payload() {
        assert_eq!(
            ClientMessageBuilder::player_ready().to_value(),
            json!({"type": "player_ready"})
        );
        assert_eq!(
            ClientMessageBuilder::restart_game().to_value(),
            json!({"type": "restart_game"})
        );
    }
}
