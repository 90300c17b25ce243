//! Domain sequence stage
//!
//! Full-length sequences come from a UniProt ID-mapping job:
//!
//! 1. submit the accessions (`POST /idmapping/run`)
//! 2. poll `/idmapping/status/{job}` until finished, failed or timed out
//! 3. read the results location from `/idmapping/details/{job}` and page
//!    through it as FASTA, following `Link: rel="next"`
//! 4. slice each domain out of its protein's sequence

pub mod fasta;
pub mod models;

pub use models::{DomainSequence, DomainSequences};

use crate::annotation::AnnotationResults;
use crate::config::RetrieverConfig;
use crate::progress::Progress;
use crate::retry::RetryingClient;
use models::{JobDetails, JobState, JobStatusResponse, JobSubmission};
use protdom_common::types::Accession;
use protdom_common::{ProtDomError, Result};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Safety stop for result pagination
const MAX_RESULT_PAGES: usize = 10_000;

pub struct SequenceStage<'a> {
    config: &'a RetrieverConfig,
    client: &'a RetryingClient,
    progress: Progress,
}

impl<'a> SequenceStage<'a> {
    pub fn new(config: &'a RetrieverConfig, client: &'a RetryingClient, progress: Progress) -> Self {
        Self {
            config,
            client,
            progress,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/idmapping/{}",
            self.config.sequence.api_base_url.trim_end_matches('/'),
            path
        )
    }

    /// Retrieve and slice sequences for every protein that has domains
    #[instrument(skip_all, fields(proteins = annotations.with_domains().count()))]
    pub async fn run(&self, annotations: &AnnotationResults) -> Result<DomainSequences> {
        let accessions = annotations.accessions_with_domains();
        if accessions.is_empty() {
            return Err(ProtDomError::validation("No domain results provided"));
        }

        info!("Retrieving sequences for {} proteins", accessions.len());

        self.progress.update("Submitting UniProt ID mapping job", 0.0);
        let job_id = self.submit_job(&accessions).await?;

        self.progress.update("Waiting for job completion", 20.0);
        self.wait_for_job(&job_id).await?;

        self.progress.update("Retrieving results", 40.0);
        let fasta_text = self.fetch_results(&job_id).await?;

        self.progress.update("Processing sequences", 60.0);
        let sequences = self.extract(&fasta_text, annotations)?;

        self.progress.update("Saving results", 80.0);
        self.save(&sequences)?;

        info!(
            sequences = sequences.len(),
            missing = sequences.missing.len(),
            "Sequence retrieval complete"
        );
        self.progress.update("Sequence retrieval complete", 100.0);

        Ok(sequences)
    }

    /// Submit the mapping job and return its identifier
    pub async fn submit_job(&self, accessions: &[Accession]) -> Result<String> {
        let form = [
            ("ids", accessions.join(",")),
            ("from", self.config.sequence.from_db.clone()),
            ("to", self.config.sequence.to_db.clone()),
        ];

        let submission: JobSubmission = self
            .client
            .post_form_json("UniProt job submission", &self.endpoint("run"), &form)
            .await?;

        info!(job_id = %submission.job_id, "Submitted UniProt ID mapping job");
        Ok(submission.job_id)
    }

    /// Poll until the job reaches a terminal state or the deadline passes
    pub async fn wait_for_job(&self, job_id: &str) -> Result<()> {
        let url = self.endpoint(&format!("status/{}", job_id));
        let timeout = self.config.sequence.job_timeout();
        let interval = self.config.sequence.poll_interval();
        let started = Instant::now();

        loop {
            let status: JobStatusResponse = self
                .client
                .get_json("UniProt job status", &url, &[])
                .await?;

            match status.state() {
                JobState::Finished => {
                    info!(job_id, elapsed_secs = started.elapsed().as_secs(), "UniProt job finished");
                    return Ok(());
                },
                JobState::Failed(state) => {
                    return Err(ProtDomError::api(format!(
                        "UniProt job {} failed with status {}",
                        job_id, state
                    )));
                },
                JobState::Running(state) => {
                    debug!(job_id, status = %state, "UniProt job still running");
                },
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(ProtDomError::api(format!(
                    "UniProt job {} timed out after {} seconds",
                    job_id,
                    elapsed.as_secs()
                )));
            }

            self.progress.update_within(
                "Waiting for job completion",
                20.0,
                40.0,
                elapsed.as_secs_f64() / timeout.as_secs_f64(),
            );

            tokio::time::sleep(interval.min(timeout - elapsed)).await;
        }
    }

    /// Concatenated FASTA text of every result page
    pub async fn fetch_results(&self, job_id: &str) -> Result<String> {
        let details: JobDetails = self
            .client
            .get_json(
                "UniProt job details",
                &self.endpoint(&format!("details/{}", job_id)),
                &[],
            )
            .await?;

        let mut url = details
            .redirect_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ProtDomError::api("No redirect URL in job details"))?;
        let mut query = vec![
            ("format", "fasta".to_string()),
            ("size", self.config.sequence.results_page_size.to_string()),
        ];

        let mut pages: Vec<String> = Vec::new();

        for page_number in 1..=MAX_RESULT_PAGES {
            let page = self
                .client
                .get_text_page("UniProt results page", &url, &query)
                .await?;

            if page.body.trim().is_empty() {
                break;
            }

            debug!(page = page_number, bytes = page.body.len(), "Fetched results page");
            pages.push(page.body);
            self.progress.update(
                &format!("Retrieved page {} of results", page_number),
                (40 + page_number.min(19)) as f64,
            );

            match page.next {
                Some(next) => {
                    url = next;
                    query.clear();
                },
                None => break,
            }
        }

        if pages.is_empty() {
            return Err(ProtDomError::api("No FASTA sequences retrieved"));
        }

        info!(pages = pages.len(), "Retrieved UniProt results");
        Ok(pages.join("\n"))
    }

    /// Slice every domain out of the parsed sequences
    fn extract(&self, fasta_text: &str, annotations: &AnnotationResults) -> Result<DomainSequences> {
        let full = fasta::parse_fasta(fasta_text);
        let total = annotations.domain_count().max(1);

        let mut result = DomainSequences::default();
        let mut processed = 0usize;

        for protein in annotations.with_domains() {
            let Some(sequence) = full.get(&protein.accession) else {
                warn!(accession = %protein.accession, "No sequence found for accession");
                result.missing.push(protein.accession.clone());
                continue;
            };

            for domain in protein.layout() {
                processed += 1;
                match fasta::slice_domain(sequence, domain.start, domain.end) {
                    Some(slice) => result.records.push(DomainSequence {
                        key: domain.key(&protein.accession),
                        sequence: slice.to_string(),
                        entry: domain.entry.clone(),
                        accession: protein.accession.clone(),
                        start: domain.start,
                        end: domain.end,
                    }),
                    None => warn!(
                        accession = %protein.accession,
                        start = domain.start,
                        end = domain.end,
                        length = sequence.len(),
                        "Domain range outside sequence, skipped"
                    ),
                }

                self.progress.update_within(
                    &format!("Processed domain {}/{}", processed, total),
                    60.0,
                    80.0,
                    processed as f64 / total as f64,
                );
            }
        }

        if result.is_empty() {
            return Err(ProtDomError::validation("No valid domain sequences extracted"));
        }

        Ok(result)
    }

    fn save(&self, sequences: &DomainSequences) -> Result<()> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let fasta_path = self.config.artifact(fasta::DOMAIN_FASTA_FILE);
        fasta::write_domain_fasta(sequences, &fasta_path)
            .map_err(|e| e.context("Failed to save FASTA results"))?;
        fasta::write_domain_json(sequences, &self.config.artifact(fasta::DOMAIN_SEQUENCES_JSON_FILE))
            .map_err(|e| e.context("Failed to save sequence JSON"))?;

        info!(
            path = %fasta_path.display(),
            "Saved {} domain sequences",
            sequences.len()
        );
        Ok(())
    }
}
