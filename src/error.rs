use crate::query::Dialect;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    #[error("unsupported aggregation unit `{0}` (expected one of year, quarter, month, week, day)")]
    UnsupportedAggregationUnit(String),

    #[error("query execution failed: {0}")]
    QueryExecution(#[from] ExecutionError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("migration error: {0}")]
    Migration(String),
}

/// Backend failures, carried verbatim from diesel.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error(transparent)]
    Connection(#[from] diesel::ConnectionError),

    #[error(transparent)]
    Sql(#[from] diesel::result::Error),

    #[error("query was rendered for {built} but the connection speaks {connection}")]
    DialectMismatch { built: Dialect, connection: Dialect },
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::QueryExecution(ExecutionError::Sql(err))
    }
}

impl From<diesel::ConnectionError> for Error {
    fn from(err: diesel::ConnectionError) -> Self {
        Error::QueryExecution(ExecutionError::Connection(err))
    }
}
