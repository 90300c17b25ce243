//! Pipeline orchestrator
//!
//! Drives the stages in order on a single control task:
//!
//! ```text
//! Idle -> AnnotationRunning -> SequenceRunning? -> StructureRunning? -> TrimRunning? -> Done
//! ```
//!
//! `Stopped` and `Failed` are absorbing and reachable from every running
//! state. Cancellation is checked before each stage starts and once more
//! after the last one. A failure hands back everything completed so far in
//! [`PipelineFailure::partial`].

use crate::annotation::{AnnotationResults, AnnotationStage};
use crate::config::RetrieverConfig;
use crate::progress::{CancellationToken, Progress};
use crate::retry::RetryingClient;
use crate::sequence::{DomainSequences, SequenceStage};
use crate::structure::{StructureResults, StructureStage};
use crate::trim::{ranges_from_annotations, TrimResults, TrimStage};
use chrono::{DateTime, Utc};
use protdom_common::types::{Accession, EntryId};
use protdom_common::{ProtDomError, Result, Stage};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    AnnotationRunning,
    SequenceRunning,
    StructureRunning,
    TrimRunning,
    Done,
    Stopped,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Stopped | Self::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AnnotationRunning => "annotation",
            Self::SequenceRunning => "sequence",
            Self::StructureRunning => "structure",
            Self::TrimRunning => "trim",
            Self::Done => "done",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRequest {
    pub accessions: Vec<Accession>,
    pub entries: Vec<EntryId>,
    pub retrieve_sequences: bool,
    pub download_structures: bool,
    pub trim_structures: bool,
}

impl PipelineRequest {
    pub fn new(accessions: Vec<Accession>, entries: Vec<EntryId>) -> Self {
        Self {
            accessions,
            entries,
            ..Self::default()
        }
    }

    pub fn with_sequences(mut self) -> Self {
        self.retrieve_sequences = true;
        self
    }

    pub fn with_structures(mut self) -> Self {
        self.download_structures = true;
        self
    }

    pub fn with_trimming(mut self) -> Self {
        self.trim_structures = true;
        self
    }
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub input_accessions: usize,
    pub entries: Vec<EntryId>,
    pub annotations: Option<AnnotationResults>,
    pub sequences: Option<DomainSequences>,
    pub structures: Option<StructureResults>,
    pub trimmed: Option<TrimResults>,
    /// Set when requested trimming did not run for lack of structures
    pub trim_skipped: bool,
    /// Directory the trim stage read structures from
    pub structure_source: Option<PathBuf>,
    pub summary: String,
}

impl RunResult {
    fn new(request: &PipelineRequest) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            input_accessions: request.accessions.len(),
            entries: request.entries.clone(),
            annotations: None,
            sequences: None,
            structures: None,
            trimmed: None,
            trim_skipped: false,
            structure_source: None,
            summary: String::new(),
        }
    }

    pub fn proteins_with_domains(&self) -> usize {
        self.annotations
            .as_ref()
            .map(|a| a.with_domains().count())
            .unwrap_or(0)
    }

    /// Human-readable run summary
    pub fn render_summary(&self) -> String {
        let mut lines = vec![
            "=== ProtDom Retriever Analysis Summary ===".to_string(),
            format!("Initial Input: {} protein accessions", self.input_accessions),
            format!("InterPro Entries: {}", self.entries.join(", ")),
            String::new(),
            "Results:".to_string(),
            format!(
                "- Domain Analysis: {} proteins with matching domains",
                self.proteins_with_domains()
            ),
        ];

        if let Some(annotations) = &self.annotations {
            if !annotations.failed.is_empty() {
                lines.push(format!(
                    "  - {} proteins skipped after failed lookups",
                    annotations.failed.len()
                ));
            }
        }

        if let Some(sequences) = &self.sequences {
            lines.push(format!(
                "- FASTA Sequences: {} domain sequences retrieved",
                sequences.len()
            ));
        }

        if let Some(structures) = &self.structures {
            lines.push(format!(
                "- AlphaFold Structures: {} downloaded",
                structures.len()
            ));
            lines.push(format!(
                "  - {} structures not available in AlphaFold database",
                structures.failed.len()
            ));
        }

        if let Some(trimmed) = &self.trimmed {
            let source = self
                .structure_source
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "structure directory".to_string());
            lines.push(format!(
                "- Domain-Trimmed Structures: {} generated from {}",
                trimmed.len(),
                source
            ));
            lines.push(format!(
                "  - {} domains could not be trimmed",
                trimmed.failed.len()
            ));
            if !trimmed.missing_structures.is_empty() {
                lines.push(format!(
                    "  - {} proteins had no structure file",
                    trimmed.missing_structures.len()
                ));
            }
        } else if self.trim_skipped {
            lines.push("- Domain-Trimmed Structures: skipped, no structures available".to_string());
        }

        lines.push(String::new());
        lines.push("Analysis complete! Results are available in the output directory.".to_string());
        lines.join("\n")
    }
}

/// A failed run: the error plus everything completed before it
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct PipelineFailure {
    #[source]
    pub error: ProtDomError,
    pub partial: Box<RunResult>,
}

impl PipelineFailure {
    pub fn is_stopped(&self) -> bool {
        self.error.is_stopped()
    }
}

pub struct PipelineOrchestrator {
    config: RetrieverConfig,
    client: RetryingClient,
    progress: Progress,
    cancel: CancellationToken,
    state: PipelineState,
}

impl PipelineOrchestrator {
    /// Validate the configuration and build the shared HTTP client
    pub fn new(config: RetrieverConfig, progress: Progress) -> Result<Self> {
        config.validate()?;
        let client = RetryingClient::new(&config.http)?;

        Ok(Self {
            config,
            client,
            progress,
            cancel: CancellationToken::new(),
            state: PipelineState::Idle,
        })
    }

    /// Use an externally owned cancellation token (e.g. wired to Ctrl-C)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request a cooperative stop; honored at the next checkpoint
    pub fn stop(&self) {
        info!("Stop requested");
        self.cancel.cancel();
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ProtDomError::Stopped)
        } else {
            Ok(())
        }
    }

    /// Run the pipeline for `request`
    pub async fn run(
        &mut self,
        request: PipelineRequest,
    ) -> std::result::Result<RunResult, PipelineFailure> {
        let started = Instant::now();
        let mut result = RunResult::new(&request);

        info!(
            run_id = %result.run_id,
            accessions = request.accessions.len(),
            entries = request.entries.len(),
            sequences = request.retrieve_sequences,
            structures = request.download_structures,
            trim = request.trim_structures,
            "Starting pipeline run"
        );

        match self.execute(&request, &mut result).await {
            Ok(()) => {
                result.finished_at = Some(Utc::now());
                result.summary = result.render_summary();
                self.transition(PipelineState::Done);
                info!(
                    run_id = %result.run_id,
                    duration_secs = started.elapsed().as_secs_f64(),
                    "Pipeline completed successfully"
                );
                info!("\n{}", result.summary);
                self.progress.update(&result.summary, 100.0);
                Ok(result)
            },
            Err(error) => {
                result.finished_at = Some(Utc::now());
                result.summary = result.render_summary();
                if error.is_stopped() {
                    self.transition(PipelineState::Stopped);
                    warn!(run_id = %result.run_id, "Pipeline stopped by user");
                } else {
                    self.transition(PipelineState::Failed);
                    error!(run_id = %result.run_id, kind = error.kind(), error = %error, "Pipeline failed");
                }
                Err(PipelineFailure {
                    error,
                    partial: Box::new(result),
                })
            },
        }
    }

    async fn execute(&mut self, request: &PipelineRequest, result: &mut RunResult) -> Result<()> {
        crate::annotation::validate_request(&request.accessions, &request.entries)?;

        // Step 1: domain annotation (always)
        self.checkpoint()?;
        self.transition(PipelineState::AnnotationRunning);
        let annotations = AnnotationStage::new(&self.config, &self.client, self.progress.clone())
            .run(&request.accessions, &request.entries)
            .await
            .map_err(|e| e.at_stage(Stage::Annotation))?;
        info!(
            "Processed domains for {} proteins ({} with domains)",
            annotations.proteins.len(),
            annotations.with_domains().count()
        );
        let accessions_with_domains = annotations.accessions_with_domains();
        let domain_ranges = ranges_from_annotations(&annotations);
        result.annotations = Some(annotations);

        // Step 2: sequences
        if request.retrieve_sequences {
            self.checkpoint()?;
            self.transition(PipelineState::SequenceRunning);
            if let Some(annotations) = &result.annotations {
                let sequences = SequenceStage::new(&self.config, &self.client, self.progress.clone())
                    .run(annotations)
                    .await
                    .map_err(|e| e.at_stage(Stage::Sequence))?;
                info!("Retrieved {} domain sequences", sequences.len());
                result.sequences = Some(sequences);
            }
        }

        // Step 3: structures; total failure only disables trimming
        if request.download_structures {
            self.checkpoint()?;
            self.transition(PipelineState::StructureRunning);
            let stage = StructureStage::new(
                &self.config,
                &self.client,
                self.progress.clone(),
                self.cancel.clone(),
            );
            match stage.run(&accessions_with_domains).await {
                Ok(structures) => {
                    info!("Downloaded {} AlphaFold structures", structures.len());
                    result.structures = Some(structures);
                },
                Err(e) if e.is_stopped() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Structure download produced no structures");
                    if request.trim_structures {
                        warn!("Skipping structure trimming due to no available structures");
                        result.trim_skipped = true;
                        return Ok(());
                    }
                },
            }
        }

        // Step 4: trimming
        if request.trim_structures {
            self.checkpoint()?;
            self.transition(PipelineState::TrimRunning);
            let source = self.trim_source().map_err(|e| e.at_stage(Stage::Trim))?;
            result.structure_source = Some(source.clone());
            let trimmed = TrimStage::new(&self.config, self.progress.clone())
                .run(&source, &domain_ranges)
                .map_err(|e| e.at_stage(Stage::Trim))?;
            info!("Generated {} trimmed structures", trimmed.len());
            result.trimmed = Some(trimmed);
        }

        self.checkpoint()
    }

    /// Directory the trim stage reads structures from
    fn trim_source(&self) -> Result<PathBuf> {
        let trim = &self.config.trim;
        if trim.accept_custom_structures {
            if let Some(dir) = &trim.structure_source_dir {
                if !dir.is_dir() {
                    return Err(ProtDomError::file(format!(
                        "Structure source directory not found: {}",
                        dir.display()
                    )));
                }
                info!(dir = %dir.display(), "Using custom structure directory");
                return Ok(dir.clone());
            }
        }

        let dir = self.config.structures_dir();
        if !dir.is_dir() {
            return Err(ProtDomError::file(format!(
                "No structures available in {}",
                dir.display()
            )));
        }
        info!(dir = %dir.display(), "Using structures from download directory");
        Ok(dir)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_request_builders() {
        let request = PipelineRequest::new(vec!["P12345".into()], vec!["IPR000001".into()])
            .with_sequences()
            .with_trimming();

        assert!(request.retrieve_sequences);
        assert!(!request.download_structures);
        assert!(request.trim_structures);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = RetrieverConfig::default();
        config.http.max_retries = 0;

        assert!(PipelineOrchestrator::new(config, Progress::none()).is_err());
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_annotation() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator =
            PipelineOrchestrator::new(RetrieverConfig::new(dir.path()), Progress::none()).unwrap();

        let failure = orchestrator
            .run(PipelineRequest::new(vec![], vec!["IPR000001".into()]))
            .await
            .unwrap_err();

        assert_eq!(failure.error.kind(), "ValidationError");
        assert!(failure.partial.annotations.is_none());
        assert_eq!(orchestrator.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_stops() {
        let dir = TempDir::new().unwrap();
        let mut orchestrator =
            PipelineOrchestrator::new(RetrieverConfig::new(dir.path()), Progress::none()).unwrap();
        orchestrator.stop();

        let failure = orchestrator
            .run(PipelineRequest::new(vec!["P12345".into()], vec!["IPR000001".into()]))
            .await
            .unwrap_err();

        assert!(failure.is_stopped());
        assert_eq!(failure.to_string(), "Processing stopped by user");
        assert_eq!(orchestrator.state(), PipelineState::Stopped);
    }

    #[test]
    fn test_trim_source_requires_existing_directory() {
        let dir = TempDir::new().unwrap();
        let orchestrator =
            PipelineOrchestrator::new(RetrieverConfig::new(dir.path()), Progress::none()).unwrap();

        assert_eq!(orchestrator.trim_source().unwrap_err().kind(), "FileError");

        std::fs::create_dir_all(dir.path().join("alphafold_structures")).unwrap();
        assert!(orchestrator.trim_source().unwrap().ends_with("alphafold_structures"));
    }

    #[test]
    fn test_summary_mentions_skipped_trimming() {
        let request = PipelineRequest::new(vec!["P1".into(), "P2".into()], vec!["IPR000001".into()]);
        let mut result = RunResult::new(&request);
        result.trim_skipped = true;

        let summary = result.render_summary();
        assert!(summary.contains("Initial Input: 2 protein accessions"));
        assert!(summary.contains("InterPro Entries: IPR000001"));
        assert!(summary.contains("skipped, no structures available"));
    }
}
