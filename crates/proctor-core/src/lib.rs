//! Proctor Core - Fundamental types for exam supervision
//!
//! This crate defines the types shared by every supervision component:
//! - Capture generations and media constraints
//! - Device permission snapshots
//! - Supervision lifecycle states
//! - Detection samples and violation events
//! - The error taxonomy

pub mod id;
pub mod permission;
pub mod state;
pub mod sample;
pub mod violation;
pub mod error;

pub use id::*;
pub use permission::*;
pub use state::*;
pub use sample::*;
pub use violation::*;
pub use error::*;
