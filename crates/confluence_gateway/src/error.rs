use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Input-absent advisory: nothing selected, nothing sent, no state change.
    #[error("no files selected for upload")]
    NoFiles,

    #[error("invalid track slot: {0} (slots are 1..=5)")]
    InvalidSlot(usize),

    /// The service refused the request. `message` is surfaced verbatim.
    #[error("service rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
