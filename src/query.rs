//! Queries and query parsing.
//!
//! [`Query`] is the structured form every search takes. It can be built
//! directly or parsed from the classic query syntax with [`QueryParser`].

#[allow(clippy::module_inception)]
pub mod query;
pub mod parser;

pub use parser::{Operator, QueryParser};
pub use query::{BooleanClause, BooleanQueryBuilder, Occur, Query};
