//! ProtDom Retriever
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Resolves family/domain annotations for a set of protein accessions into
//! non-overlapping domain layouts, then optionally retrieves domain
//! sequences, predicted structures and per-domain trimmed structures.
//!
//! # Stages
//!
//! - [`annotation`]: InterPro lookup and overlap resolution
//! - [`sequence`]: UniProt ID-mapping job and domain slicing
//! - [`structure`]: bounded-concurrency AlphaFold downloads
//! - [`trim`]: residue-range trimming of structure files
//!
//! [`orchestrator::PipelineOrchestrator`] runs them in order with
//! cooperative cancellation and partial-result reporting.
//!
//! # Example
//!
//! ```no_run
//! use protdom_retriever::config::RetrieverConfig;
//! use protdom_retriever::orchestrator::{PipelineOrchestrator, PipelineRequest};
//! use protdom_retriever::progress::Progress;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RetrieverConfig::from_env().with_output_dir("results");
//! let mut orchestrator = PipelineOrchestrator::new(config, Progress::none())?;
//!
//! let request = PipelineRequest::new(
//!     vec!["P12345".to_string()],
//!     vec!["IPR000719".to_string()],
//! )
//! .with_sequences();
//!
//! let result = orchestrator.run(request).await?;
//! println!("{}", result.summary);
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod config;
pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod sequence;
pub mod structure;
pub mod trim;

pub use config::RetrieverConfig;
pub use orchestrator::{PipelineFailure, PipelineOrchestrator, PipelineRequest, PipelineState, RunResult};
pub use progress::{CancellationToken, Progress, ProgressSink};
pub use retry::{RetryPolicy, RetryingClient};
