//! Proctor Runtime - Supervisor orchestration
//!
//! Composes permission monitoring, capture and face presence into a single
//! supervision state:
//!
//! ```text
//! Idle → AwaitingPermissions ⇄ Active ⇄ Degraded
//!                 ↘            ↓          ↙
//!                        Terminated
//! ```
//!
//! `Terminated` is absorbing. Re-entering the exam flow spawns a new
//! supervisor.

pub mod config;
pub mod transition;
pub mod supervisor;
pub mod telemetry;

pub use config::*;
pub use transition::*;
pub use supervisor::*;
pub use telemetry::{init_tracing, LogFormat};
