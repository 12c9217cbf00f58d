//! Offline indexing: directory scanning and the indexing engine

pub mod indexing_engine;
pub mod scanner;

pub use indexing_engine::{FileOutcome, IndexingEngine, IndexingEngineConfig, IndexingReport};
pub use scanner::{Scanner, TreeEntry, list_directory};
