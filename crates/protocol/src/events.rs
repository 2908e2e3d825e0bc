//! Typed view over server-originated messages.
//!
//! The channel itself dispatches raw `WireMessage` payloads by type string;
//! consumers that prefer exhaustive matching can lift a message into a
//! `ServerEvent` instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::messages::WireMessage;

/// Hand gesture recognised by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gesture {
    Rock,
    Paper,
    Scissors,
    None,
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundVerdict {
    Win,
    Draw,
    Timeout,
    Unknown,
}

/// Result block of a `round_result` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub result: RoundVerdict,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub moves: BTreeMap<String, String>,
}

/// Messages from the game server to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    PlayerJoined {
        player_id: String,
        players_count: u32,
    },
    PlayerLeft {
        player_id: String,
        players_count: u32,
    },
    GameStart {
        message: String,
    },
    /// Server-side error, or the synthetic event raised locally when
    /// reconnection gives up.
    Error {
        message: String,
    },
    GestureDetected {
        gesture: Gesture,
        confidence: f64,
    },
    OpponentFrame {
        frame: String,
        player_id: String,
    },
    PlayerReady {
        player_id: String,
    },
    GameRestarted {
        message: String,
    },
    Countdown {
        count: u32,
    },
    RoundStart {
        message: String,
    },
    RoundResult {
        moves: BTreeMap<String, String>,
        result: RoundOutcome,
        scores: BTreeMap<String, u32>,
    },
    NextRound {
        message: String,
    },
    GameEnd {
        winner: String,
        final_scores: BTreeMap<String, u32>,
    },
    /// Any message type this client does not know about.
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Lift a parsed wire message into a typed event.
    pub fn from_message(message: &WireMessage) -> Result<Self, serde_json::Error> {
        serde_json::from_value(message.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ServerEvent {
        let msg = WireMessage::from_json(text).expect("valid frame");
        ServerEvent::from_message(&msg).expect("typed event")
    }

    #[test]
    fn test_countdown() {
        assert_eq!(
            parse(r#"{"type":"countdown","count":3}"#),
            ServerEvent::Countdown { count: 3 }
        );
    }

    #[test]
    fn test_gesture_detected() {
        assert_eq!(
            parse(r#"{"type":"gesture_detected","gesture":"scissors","confidence":0.91}"#),
            ServerEvent::GestureDetected {
                gesture: Gesture::Scissors,
                confidence: 0.91
            }
        );
    }

    #[test]
    fn test_round_result_with_draw() {
        let event = parse(
            r#"{"type":"round_result",
                "moves":{"p1":"rock","p2":"rock"},
                "result":{"result":"draw","winner":null,"moves":{"p1":"rock","p2":"rock"}},
                "scores":{"p1":1,"p2":2}}"#,
        );

        match event {
            ServerEvent::RoundResult {
                result, scores, ..
            } => {
                assert_eq!(result.result, RoundVerdict::Draw);
                assert!(result.winner.is_none());
                assert_eq!(scores.get("p2"), Some(&2));
            }
            other => panic!("Expected RoundResult, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_not_an_error() {
        assert_eq!(parse(r#"{"type":"spectator_joined","id":"x"}"#), ServerEvent::Unknown);
    }
}
