//! Criteria-driven query construction and execution over the NEOVEX
//! research store, plus the ingestion writer that fills it.

pub mod db;
pub mod error;
pub mod executor;
pub mod ingest;
pub mod query;
pub mod schema;
pub mod settings;
pub mod utils;

pub use error::{Error, ExecutionError, Result};
pub use executor::{execute, QueryRunner, ResultTable, SqlValue};
pub use query::{
    build, CriteriaBuilder, CriteriaStore, Dialect, Label, Language, Platform, Query,
    QueryBuilder, QueryMode, SearchScope, TimeUnit,
};
