//! Proctor Media - Permissions and capture devices
//!
//! This crate provides:
//! - Host capability traits (permission queries, media acquisition, video sinks)
//! - Permission polling with change notification
//! - Capture session lifetime (acquire, bind, release)

pub mod host;
pub mod permission;
pub mod capture;

pub use host::*;
pub use permission::*;
pub use capture::*;
