//! Domain annotation stage
//!
//! Looks up InterPro entry matches for each accession, keeps the requested
//! entries, resolves overlaps with [`selector::select`] and writes the
//! annotation artifacts.

pub mod models;
pub mod output;
pub mod selector;

pub use models::{AnnotationResults, ProteinDomains};
pub use selector::{select, EntryIntervals, Selection};

use crate::config::RetrieverConfig;
use crate::progress::Progress;
use crate::retry::{MaybeJson, RetryingClient};
use models::{EntryPage, EntryResult};
use protdom_common::types::{Accession, EntryId, Interval};
use protdom_common::{ProtDomError, Result};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Safety stop for `next` links that never end
const MAX_PAGES: usize = 100;

/// Reject empty, blank or duplicated inputs
pub fn validate_request(accessions: &[Accession], entries: &[EntryId]) -> Result<()> {
    if accessions.is_empty() {
        return Err(ProtDomError::validation("No protein accessions provided"));
    }
    if entries.is_empty() {
        return Err(ProtDomError::validation("No InterPro entries provided"));
    }

    let mut seen = HashSet::new();
    for accession in accessions {
        if accession.trim().is_empty() {
            return Err(ProtDomError::validation("Blank protein accession in input"));
        }
        if !seen.insert(accession.as_str()) {
            return Err(ProtDomError::validation(format!(
                "Duplicate protein accession: {}",
                accession
            )));
        }
    }

    if entries.iter().any(|e| e.trim().is_empty()) {
        return Err(ProtDomError::validation("Blank InterPro entry in input"));
    }

    Ok(())
}

pub struct AnnotationStage<'a> {
    config: &'a RetrieverConfig,
    client: &'a RetryingClient,
    progress: Progress,
}

impl<'a> AnnotationStage<'a> {
    pub fn new(config: &'a RetrieverConfig, client: &'a RetryingClient, progress: Progress) -> Self {
        Self {
            config,
            client,
            progress,
        }
    }

    /// Resolve domains for every accession and persist the artifacts
    #[instrument(skip_all, fields(accessions = accessions.len(), entries = entries.len()))]
    pub async fn run(
        &self,
        accessions: &[Accession],
        entries: &[EntryId],
    ) -> Result<AnnotationResults> {
        validate_request(accessions, entries)?;

        let requested: HashSet<String> = entries
            .iter()
            .map(|e| e.trim().to_ascii_uppercase())
            .collect();
        let delay = Duration::from_millis(self.config.annotation.request_delay_ms);
        let total = accessions.len();

        info!(
            "Starting domain annotation for {} proteins and {} entries",
            total,
            requested.len()
        );

        let mut proteins = Vec::with_capacity(total);
        let mut failed = Vec::new();

        for (index, accession) in accessions.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            self.progress.update_within(
                &format!("Processing {} ({}/{})", accession, index + 1, total),
                0.0,
                90.0,
                index as f64 / total as f64,
            );

            let candidates = match self.fetch_intervals(accession, &requested).await {
                Ok(candidates) => candidates,
                Err(e) if self.config.annotation.tolerate_partial => {
                    warn!(accession = %accession, error = %e, "Annotation lookup failed, skipping protein");
                    failed.push(accession.clone());
                    continue;
                },
                Err(e) => {
                    return Err(e.context(format!("Annotation lookup failed for {}", accession)));
                },
            };

            let selection = select(&candidates)?;
            if selection.is_empty() {
                info!(accession = %accession, "No domains found for requested entries");
            } else {
                info!(
                    accession = %accession,
                    domains = selection.layout.len(),
                    "Resolved domains: {}",
                    selection.summary()
                );
            }

            proteins.push(ProteinDomains {
                accession: accession.clone(),
                selection,
            });
        }

        if proteins.is_empty() {
            return Err(ProtDomError::validation(format!(
                "Annotation lookup failed for all {} proteins",
                total
            )));
        }

        let results = AnnotationResults {
            entries: entries.to_vec(),
            proteins,
            failed,
        };

        self.progress.update("Saving annotation results", 90.0);
        self.save(&results)?;

        info!(
            proteins = results.proteins.len(),
            with_domains = results.with_domains().count(),
            domains = results.domain_count(),
            failed = results.failed.len(),
            "Domain annotation complete"
        );
        self.progress.update("Domain annotation complete", 100.0);

        Ok(results)
    }

    /// Requested-entry intervals for one accession, following pagination
    async fn fetch_intervals(
        &self,
        accession: &str,
        requested: &HashSet<String>,
    ) -> Result<Vec<EntryIntervals>> {
        let mut url = format!(
            "{}/entry/all/protein/uniprot/{}",
            self.config.annotation.api_base_url.trim_end_matches('/'),
            accession
        );
        let mut query = vec![("page_size", self.config.annotation.page_size.to_string())];
        let mut candidates: Vec<EntryIntervals> = Vec::new();

        for page_number in 1..=MAX_PAGES {
            let page = match self
                .client
                .get_json_or_empty::<EntryPage>("InterPro entry lookup", &url, &query)
                .await?
            {
                MaybeJson::Body(page) => page,
                MaybeJson::NoContent => {
                    debug!(accession, "InterPro returned no entries");
                    break;
                },
            };

            debug!(accession, page = page_number, results = page.results.len(), "Fetched entry page");

            for result in &page.results {
                let entry = result.metadata.accession.trim().to_ascii_uppercase();
                if !requested.contains(&entry) {
                    continue;
                }

                let intervals = entry_intervals(accession, result);
                if intervals.is_empty() {
                    continue;
                }

                match candidates.iter_mut().find(|c| c.entry == entry) {
                    Some(existing) => existing.intervals.extend(intervals),
                    None => candidates.push(EntryIntervals::new(entry, intervals)),
                }
            }

            match page.next {
                Some(next) if !next.is_empty() => {
                    url = next;
                    query.clear();
                },
                _ => return Ok(candidates),
            }

            if page_number == MAX_PAGES {
                warn!(accession, pages = MAX_PAGES, "Stopped following InterPro pagination");
            }
        }

        Ok(candidates)
    }

    fn save(&self, results: &AnnotationResults) -> Result<()> {
        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| ProtDomError::file(format!("Failed to create output directory: {}", e)))?;

        output::write_domain_ranges(results, &self.config.artifact(output::DOMAIN_RANGES_FILE))?;
        output::write_domain_table(results, &self.config.artifact(output::DOMAIN_TABLE_FILE))?;
        output::write_annotation_json(results, &self.config.artifact(output::ANNOTATION_JSON_FILE))?;

        info!(dir = %self.config.output_dir.display(), "Saved annotation results");
        Ok(())
    }
}

/// Valid fragment intervals of one entry; malformed coordinates are dropped
fn entry_intervals(accession: &str, result: &EntryResult) -> Vec<Interval> {
    let mut intervals = Vec::new();

    let fragments = result
        .proteins
        .iter()
        .filter_map(|p| p.entry_protein_locations.as_ref())
        .flatten()
        .flat_map(|location| location.fragments.iter());

    for fragment in fragments {
        let (Some(start), Some(end)) = (fragment.start, fragment.end) else {
            warn!(accession, entry = %result.metadata.accession, "Fragment without coordinates discarded");
            continue;
        };

        let interval = u32::try_from(start)
            .ok()
            .zip(u32::try_from(end).ok())
            .and_then(|(s, e)| Interval::new(s, e).ok());

        match interval {
            Some(interval) => intervals.push(interval),
            None => warn!(
                accession,
                entry = %result.metadata.accession,
                start,
                end,
                "Invalid fragment interval discarded"
            ),
        }
    }

    intervals
}
