//! Read-side lookups: full-text queries and file resolution

pub mod query;
pub mod resolver;

pub use query::{QueryEngine, SearchHit, sanitize_query};
pub use resolver::{FileStream, Origin, Resolution, ResolveError, Resolver};
