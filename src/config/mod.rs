//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (existence check, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → handed by reference to the gateway and the lifecycle
//! ```
//!
//! # Design Decisions
//! - Config is read exactly once at startup; there is no reload
//! - Missing keys decode to the field's zero value
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{Config, LogFormat, LogLevel, DEFAULT_SHUTDOWN_TIMEOUT};
pub use validation::ValidationError;
