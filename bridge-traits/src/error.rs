use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// Attempted to remove an edge that was never connected.
    #[error("No such connection: {from} -> {to}")]
    NoSuchConnection { from: u64, to: u64 },

    /// The native object is not in a state that allows the operation
    /// (e.g. starting a source twice, seeking before metadata is loaded).
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
