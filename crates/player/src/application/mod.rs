//! Application layer: session setup and camera use cases.
//!
//! Services depend on port traits, not concrete infrastructure.

pub mod services;

pub use services::{CameraService, SessionService};
