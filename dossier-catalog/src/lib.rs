//! dossier-catalog: full-text catalog over a tree of office documents
//!
//! The crate indexes a directory of PDFs, Word files, spreadsheets, scanned images
//! and CAD drawings into a SQLite catalog with an FTS5 trigram index, optionally
//! mirroring each file into an S3-compatible object store, and serves searches,
//! previews and file downloads from that catalog.
//!
//! ## Key Modules
//!
//! - **[`indexing`]**: Directory scanning and the batch indexing engine
//! - **[`storage`]**: Catalog abstraction with the SQLite implementation
//! - **[`retrieval`]**: Query sanitizing, search and path resolution
//! - **[`object_store`]**: Presigned S3 client used for uploads and downloads
//! - **[`service`]**: The read path as one degradable service
//! - **[`status`]**: Catalog statistics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dossier_catalog::indexing::{IndexingEngine, IndexingEngineConfig};
//! use dossier_catalog::retrieval::QueryEngine;
//! use dossier_catalog::storage::sqlite_store::SqliteCatalog;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let catalog = Arc::new(SqliteCatalog::open(Path::new("data/index.db")).await?);
//!
//! let config = IndexingEngineConfig::new("./documents_to_scan".into());
//! IndexingEngine::new(config, catalog.clone()).run().await?;
//!
//! for hit in QueryEngine::new(catalog).search("invoice 2024").await? {
//!     println!("{}: {}", hit.filename, hit.snippet);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Scanner → detect() → Extractors → ObjectStore (optional) → SQLite catalog
//!                                                               ↓
//!                   Resolver ← ReadService → QueryEngine ← FTS5 trigram
//! ```

pub mod config;
pub mod indexing;
pub mod object_store;
pub mod retrieval;
pub mod service;
pub mod status;
pub mod storage;
