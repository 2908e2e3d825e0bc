//! RPS Online Protocol - Shared wire types for server and player communication
//!
//! This crate contains the types exchanged with the game server:
//! - The tagged JSON record carried over the WebSocket (`WireMessage`)
//! - Message-type discriminators for both directions
//! - A typed view over server events (`ServerEvent`)
//! - HTTP DTOs for room management
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde and serde_json
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Open framing** - Unknown message types pass through untouched

pub mod dto;
pub mod events;
pub mod messages;

// =============================================================================
// WebSocket Message Types
// =============================================================================
pub use events::{Gesture, RoundOutcome, RoundVerdict, ServerEvent};
pub use messages::{kinds, Payload, WireMessage};

// =============================================================================
// HTTP DTOs
// =============================================================================
pub use dto::{CreateRoomRequest, HealthStatus, RoomCreated, RoomStatus};
