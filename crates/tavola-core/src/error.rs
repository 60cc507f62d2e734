use tavola_remote::RemoteError;
use tavola_types::models::ReservationStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("reservation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    Unsupported(&'static str),

    #[error("remote call failed: {0}")]
    Remote(#[from] RemoteError),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
