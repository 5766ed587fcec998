mod builder;
pub mod catalog;
mod criteria;
mod dialect;

pub use builder::{build, Param, Query, QueryBuilder, QueryMode};
pub use criteria::{
    CriteriaBuilder, CriteriaFile, CriteriaStore, Label, Language, Platform, SearchScope,
};
pub use dialect::{Dialect, TimeUnit};
