//! Predicted structure download stage
//!
//! One AlphaFold model per accession, fetched by a bounded pool of
//! concurrent tasks. Completions stream back to the calling task, which is
//! the only place results are aggregated. A failed accession is recorded and
//! never aborts its siblings; the stage fails only when nothing was stored.

pub mod models;
pub mod validate;

pub use models::{StructureFailure, StructureFile, StructureRecord, StructureResults};

use crate::config::RetrieverConfig;
use crate::progress::{CancellationToken, Progress};
use crate::retry::RetryingClient;
use futures::stream::{self, StreamExt};
use models::PredictionEntry;
use protdom_common::checksum::sha256_file;
use protdom_common::types::{Accession, Provenance};
use protdom_common::{ProtDomError, Result};
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

pub const STRUCTURE_SUMMARY_FILE: &str = "alphafold_summary.json";

enum TaskOutcome {
    Stored(StructureRecord),
    Failed(StructureFailure),
    Skipped(Accession),
}

pub struct StructureStage<'a> {
    config: &'a RetrieverConfig,
    client: &'a RetryingClient,
    progress: Progress,
    cancel: CancellationToken,
}

impl<'a> StructureStage<'a> {
    pub fn new(
        config: &'a RetrieverConfig,
        client: &'a RetryingClient,
        progress: Progress,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            client,
            progress,
            cancel,
        }
    }

    /// Download structures for `accessions` with bounded concurrency
    #[instrument(skip_all, fields(accessions = accessions.len()))]
    pub async fn run(&self, accessions: &[Accession]) -> Result<StructureResults> {
        if accessions.is_empty() {
            return Err(ProtDomError::validation("No accessions provided for structure download"));
        }

        let dir = self.config.structures_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            ProtDomError::file(format!("Failed to create {}: {}", dir.display(), e))
        })?;

        let total = accessions.len();
        let concurrency = self.config.structure.concurrent_downloads.max(1);
        info!(
            "Downloading structures for {} proteins (concurrency={})",
            total, concurrency
        );
        self.progress.update("Starting structure downloads", 0.0);

        let dir_path: &Path = &dir;
        let mut completions = stream::iter(accessions.iter().enumerate())
            .map(move |(index, accession)| async move {
                (index, self.process(accession, dir_path).await)
            })
            .buffer_unordered(concurrency);

        let mut outcomes: Vec<(usize, TaskOutcome)> = Vec::with_capacity(total);
        while let Some((index, outcome)) = completions.next().await {
            match &outcome {
                TaskOutcome::Stored(record) => info!(
                    accession = %record.accession,
                    entry_id = %record.entry_id,
                    reused = record.reused,
                    "Structure stored"
                ),
                TaskOutcome::Failed(failure) => warn!(
                    accession = %failure.accession,
                    reason = %failure.reason,
                    "Structure download failed"
                ),
                TaskOutcome::Skipped(accession) => {
                    debug!(accession = %accession, "Structure download skipped after cancellation")
                },
            }

            outcomes.push((index, outcome));
            self.progress.update_within(
                &format!("Processed {}/{} structures", outcomes.len(), total),
                0.0,
                95.0,
                outcomes.len() as f64 / total as f64,
            );
        }

        outcomes.sort_by_key(|(index, _)| *index);

        let mut results = StructureResults::default();
        for (_, outcome) in outcomes {
            match outcome {
                TaskOutcome::Stored(record) => results.structures.push(record),
                TaskOutcome::Failed(failure) => results.failed.push(failure),
                TaskOutcome::Skipped(accession) => results.skipped.push(accession),
            }
        }

        if !results.is_empty() {
            self.save_summary(&results)?;
        }

        if self.cancel.is_cancelled() {
            warn!(
                stored = results.len(),
                skipped = results.skipped.len(),
                "Structure downloads interrupted by cancellation"
            );
            return Ok(results);
        }

        if results.is_empty() {
            return Err(ProtDomError::validation(format!(
                "No structures were downloaded successfully ({} failed)",
                results.failed.len()
            )));
        }

        info!(
            stored = results.len(),
            failed = results.failed.len(),
            "Structure download complete"
        );
        self.progress.update("Structure download complete", 100.0);

        Ok(results)
    }

    async fn process(&self, accession: &str, dir: &Path) -> TaskOutcome {
        if self.cancel.is_cancelled() {
            return TaskOutcome::Skipped(accession.to_string());
        }

        match self.fetch_structure(accession, dir).await {
            Ok(record) => TaskOutcome::Stored(record),
            Err(e) => TaskOutcome::Failed(StructureFailure {
                accession: accession.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Look up the prediction, then download and validate its PDB file
    async fn fetch_structure(&self, accession: &str, dir: &Path) -> Result<StructureRecord> {
        let url = format!(
            "{}/prediction/{}",
            self.config.structure.api_base_url.trim_end_matches('/'),
            accession
        );

        let entries: Vec<PredictionEntry> = self
            .client
            .get_json("AlphaFold metadata lookup", &url, &[])
            .await
            .map_err(|e| e.context(accession))?;

        let entry = entries.into_iter().next().ok_or_else(|| {
            ProtDomError::api(format!("No AlphaFold prediction for {}", accession))
        })?;

        let entry_id = entry
            .entry_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ProtDomError::api(format!("No entryId in prediction for {}", accession)))?;
        let pdb_url = entry
            .pdb_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ProtDomError::api(format!("No pdbUrl in prediction for {}", accession)))?;

        let path = dir.join(format!("{}.pdb", entry_id));
        let mut reused = false;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if validate::is_structure_file(&path) {
                debug!(accession, path = %path.display(), "Using existing structure file");
                reused = true;
            } else {
                warn!(accession, path = %path.display(), "Existing structure file is invalid, downloading again");
                tokio::fs::remove_file(&path).await?;
            }
        }

        if !reused {
            let bytes = self
                .client
                .get_bytes("AlphaFold structure download", &pdb_url)
                .await
                .map_err(|e| e.context(accession))?;
            tokio::fs::write(&path, &bytes).await?;

            if !validate::is_structure_file(&path) {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to remove invalid structure file");
                }
                return Err(ProtDomError::file(format!(
                    "Downloaded structure for {} failed validation",
                    accession
                )));
            }
        }

        let sha256 = sha256_file(&path)?;

        Ok(StructureRecord {
            accession: accession.to_string(),
            entry_id,
            file: StructureFile {
                path,
                provenance: Provenance::Predicted,
            },
            sha256,
            model_date: entry.model_date,
            reused,
        })
    }

    fn save_summary(&self, results: &StructureResults) -> Result<()> {
        let mut structures = Map::new();
        let mut details = Map::new();
        for record in &results.structures {
            let relative = record
                .file
                .path
                .strip_prefix(&self.config.output_dir)
                .unwrap_or(&record.file.path);
            structures.insert(
                record.accession.clone(),
                Value::String(relative.display().to_string()),
            );
            details.insert(
                record.accession.clone(),
                json!({
                    "entry_id": record.entry_id,
                    "sha256": record.sha256,
                    "model_date": record.model_date,
                    "reused": record.reused,
                }),
            );
        }

        let failed: Map<String, Value> = results
            .failed
            .iter()
            .map(|f| (f.accession.clone(), Value::String(f.reason.clone())))
            .collect();

        let summary = json!({
            "total_processed": results.len(),
            "structures": structures,
            "details": details,
            "failed": failed,
        });

        let path = self.config.artifact(STRUCTURE_SUMMARY_FILE);
        let writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
        serde_json::to_writer_pretty(writer, &summary)?;

        info!(path = %path.display(), "Saved structure summary");
        Ok(())
    }
}
