//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind listener → hand to server.rs
//!
//! Serving (server.rs):
//!     Idle → Serving → Draining → Stopped
//!     background tasks stopped and joined on the way to Stopped
//!
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Serving runs on a background task; start returns once listening
//! - Shutdown has timeout: connections still open at the deadline are closed
//! - SIGKILL cannot be caught and skips the drain entirely

pub mod server;
pub mod signals;
pub mod startup;

pub use server::{LifecycleError, ServerLifecycle, ServerState};
pub use signals::Interruption;
