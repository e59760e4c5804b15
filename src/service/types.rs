use thiserror::Error;

#[derive(Error, Debug)]
/// Solver service error types
pub enum ServiceError {
    /// start() called while the dispatcher is running
    #[error("service already running")]
    AlreadyRunning,
    /// stop() called with no dispatcher running
    #[error("service not running")]
    NotRunning,
    /// The dispatcher thread could not be spawned
    #[error("failed to spawn dispatcher: {0}")]
    Spawn(String),
    /// No property with the requested name
    #[error("no such property: {0}")]
    PropertyNotFound(String),
    /// Property value rejected by its declared range
    #[error("property {name} value {value} outside {min}..={max}")]
    PropertyOutOfRange {
        /// Property name
        name: String,
        /// Rejected value
        value: u32,
        /// Inclusive minimum
        min: u32,
        /// Inclusive maximum
        max: u32,
    },
    /// The bounded property table is full
    #[error("property table full")]
    TooManyProperties,
}

/// One queued solve request
#[derive(Debug, Clone)]
pub struct QueueInput {
    /// 32-byte header to solve
    pub header: [u8; 32],
    /// Opaque tag echoed back with every solution
    pub nonce: [u8; 8],
}

/// One completed solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueOutput {
    /// Opaque tag from the originating request
    pub nonce: [u8; 8],
    /// Edge nonces of the solution cycle, ascending
    pub nonces: Vec<u32>,
}
