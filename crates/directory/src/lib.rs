use crate::database::DatabaseError;
use model::geo::InvalidArgument;
use thiserror::Error;

pub mod client;
pub mod database;
pub mod filter;
pub mod identity;
pub mod ranking;
pub mod search;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("the requested item does not exist")]
    NotFound,
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("unauthorized")]
    Unauthorized,
    #[error("document store failure: {0}")]
    Upstream(DatabaseError),
}

impl From<DatabaseError> for RequestError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound => Self::NotFound,
            other => Self::Upstream(other),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;
