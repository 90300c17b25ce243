//! ProtDom Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, error handling and logging for the ProtDom retriever.
//!
//! # Overview
//!
//! - **Error Handling**: the [`ProtDomError`] taxonomy shared by every stage
//! - **Types**: intervals, domain layouts and the `accession[start-end]` domain key
//! - **Logging**: `tracing` subscriber setup driven by environment variables
//! - **Checksums**: SHA-256 digests for downloaded structure files
//!
//! # Example
//!
//! ```no_run
//! use protdom_common::types::DomainKey;
//!
//! let key: DomainKey = "P12345[10-50]".parse()?;
//! assert_eq!(key.accession, "P12345");
//! # Ok::<(), protdom_common::ProtDomError>(())
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ProtDomError, Result, Stage};
