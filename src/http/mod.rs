//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (lifecycle::server)
//!     → request.rs (request id, logging, panic boundary)
//!     → server.rs (route table)
//!         → session.rs (terminal endpoint → session bridge)
//!         → assets.rs (embedded UI: terminal assets, public site)
//!         → health, readiness, metrics handlers
//! ```

pub mod assets;
pub mod request;
pub mod server;
pub mod session;

pub use assets::ContentRoot;
pub use request::{RequestLogEntry, X_REQUEST_ID};
pub use server::{AppState, Gateway};
pub use session::{ConnectionId, LoggerFactory, SessionBridge, SessionOptions, Unattached};
