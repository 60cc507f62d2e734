use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),

    #[error("base url cannot carry a path: {0}")]
    InvalidBase(String),

    /// Non-success HTTP status. `message` is the server's `detail` or
    /// `message` field when present, else the raw body.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Status { status: 404, .. })
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;
