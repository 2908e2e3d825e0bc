//! Application services
//!
//! This module contains application services that implement the setup use
//! cases of the RPS Online player: reaching the server, creating or joining
//! a room, and acquiring the camera.

pub mod camera_service;
pub mod session_service;

pub use camera_service::{
    camera_constraints, default_constraints, stop_camera, CameraQuality, CameraService,
    CameraSupport,
};
pub use session_service::{generate_player_id, SessionService};
