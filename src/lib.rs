// src/lib.rs - Main library file for the Cuckoo Cycle solver

//! Multi-threaded Cuckoo Cycle proof-of-work solver.
//!
//! Given a 32-byte header and a nonce, the solver derives a pair of SipHash
//! keys, enumerates candidate edges of a large implicit bipartite graph, trims
//! away edges that cannot belong to a cycle, and searches the survivors for
//! simple cycles of exactly `proof_size` edges. A solution is the ascending
//! list of edge nonces forming such a cycle.
//!
//! The crate also ships a queue-driven [`service::SolverService`] so a host
//! process can feed headers in and drain solutions out without managing solver
//! threads itself.

#![warn(missing_docs)]

/// Configuration module for solver settings
pub mod config;
/// Solver core: edge oracle, trimming engine, cycle finder
pub mod cuckoo;
/// Queue-driven solver service for host integration
pub mod service;

// Re-export main types for convenience
pub use config::Settings;
pub use cuckoo::{CuckooError, Params, SipKeys, Solution, SolverMode};
pub use service::{ServiceError, SolverService};

use hex::FromHexError;
use thiserror::Error;

/// Main error type for the solver crate
#[derive(Error, Debug)]
pub enum SolverError {
    /// Solver core errors
    #[error("Solver error: {0}")]
    Cuckoo(#[from] CuckooError),

    /// Solver service errors
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO operation errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Implement conversion from hex decode errors
impl From<FromHexError> for SolverError {
    fn from(err: FromHexError) -> Self {
        SolverError::Config(format!("Hex decode error: {}", err))
    }
}

/// Result type alias for solver operations
pub type Result<T> = std::result::Result<T, SolverError>;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize the solver with logging
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("{} v{}", NAME, VERSION);
    Ok(())
}
