use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid track slot: {0} (slots are 1..=5)")]
    InvalidSlot(usize),

    #[error("slot 1 is the timeline anchor and carries no offset or crossfade")]
    AnchorSlot,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
