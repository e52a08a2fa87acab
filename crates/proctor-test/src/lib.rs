//! Proctor Test Harness - Simulated host and scenario testing
//!
//! This crate provides:
//! - A simulated permission/device platform
//! - A scripted face detector
//! - Recording sink, overlay surface and supervisor host
//! - A scenario harness driven by tokio's paused clock
//! - Seeded permission-flapping chaos runs

pub mod platform;
pub mod detector;
pub mod host;
pub mod harness;
pub mod chaos;

#[cfg(test)]
mod scenarios;

pub use platform::*;
pub use detector::*;
pub use host::*;
pub use harness::*;
pub use chaos::*;
