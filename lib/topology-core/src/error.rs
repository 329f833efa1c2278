use thiserror::Error;

pub type Result<T> = std::result::Result<T, TopologyError>;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Transport(String),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid topology record at {key}: {reason}")]
    InvalidRecord { key: String, reason: String },

    #[error("invalid node address: {0:?}")]
    InvalidAddress(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
