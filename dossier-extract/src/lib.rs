//! # dossier-extract
//!
//! Turns office documents, scans and drawings into plain text for the catalog's
//! full-text index.
//!
//! Each file is first classified by [`detect`] from its path alone. The resulting
//! [`DocumentFormat`] picks an [`Extractor`] out of an [`ExtractorRegistry`]:
//!
//! - PDF through `pdf-extract`
//! - DOCX by walking `word/document.xml`
//! - Word 97-2003 binaries through their piece table
//! - XLSX/XLS workbooks through `calamine`, rendered as delimited rows
//! - raster images through the `tesseract` CLI
//! - CAD drawings, which contribute only their file name
//!
//! ```no_run
//! use dossier_extract::{ExtractConfig, ExtractorRegistry, detect};
//! use std::path::Path;
//!
//! # async fn example() -> dossier_extract::Result<()> {
//! let registry = ExtractorRegistry::standard(&ExtractConfig::default());
//! let path = Path::new("documents/offer.docx");
//! if let Some(detected) = detect(path) {
//!     let text = registry.extract(detected.format, path).await?;
//!     println!("{:?}", text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Parsers run on tokio's blocking pool, so a malformed file that makes a parser
//! panic comes back as [`ExtractError::AsyncTask`] rather than taking the caller down.

pub mod config;
pub mod error;
pub mod extractor;
pub mod format;
pub mod formats;

pub use config::ExtractConfig;
pub use error::{ExtractError, Result};
pub use extractor::{Extractor, ExtractorRegistry};
pub use format::{DetectedFormat, DocumentFormat, FALLBACK_MIME, detect, extension_of};
pub use formats::display_name;
