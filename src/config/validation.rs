//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the spawn command is present
//! - Check the bind address and port resolve to a socket address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::ToSocketAddrs;

use crate::config::schema::Config;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("command must not be empty")]
    MissingCommand,

    #[error("invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },
}

pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.command.trim().is_empty() {
        errors.push(ValidationError::MissingCommand);
    }

    let address = config.listen_address();
    if let Err(reason) = resolve(&address) {
        errors.push(ValidationError::InvalidListenAddress { address, reason });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Host names are resolved the same way the listener will resolve them.
fn resolve(address: &str) -> Result<(), String> {
    match address.to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(_) => Ok(()),
            None => Err("no addresses found".to_string()),
        },
        Err(e) => Err(e.to_string()),
    }
}
