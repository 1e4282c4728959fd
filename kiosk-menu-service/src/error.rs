use thiserror::Error;

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("error while executing database query")]
    Query(#[from] diesel::result::Error),
    #[error("database connection unavailable: {0}")]
    Pool(String),
}
