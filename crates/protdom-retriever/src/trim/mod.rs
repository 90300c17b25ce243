//! Structure trimming stage
//!
//! Cuts every resolved domain out of its protein's structure file and
//! writes `{accession}_domain{n}_trimmed.pdb` files plus a summary.

pub mod locate;
pub mod ranges;
pub mod trimmer;

pub use ranges::{load_domain_ranges, ranges_from_annotations, DomainRange};

use crate::config::RetrieverConfig;
use crate::progress::Progress;
use crate::structure::StructureFile;
use protdom_common::types::{Accession, Interval, Provenance};
use protdom_common::{ProtDomError, Result};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

pub const TRIM_SUMMARY_FILE: &str = "trimming_summary.json";
const SUMMARY_VERSION: &str = "1.0";

/// One trimmed domain structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedDomain {
    /// `{accession}_domain{ordinal}`
    pub id: String,
    pub accession: Accession,
    pub ordinal: u32,
    pub interval: Interval,
    pub path: PathBuf,
    pub provenance: Provenance,
    pub atoms_kept: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimFailure {
    pub id: String,
    pub reason: String,
}

/// Output of the trim stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrimResults {
    pub trimmed: Vec<TrimmedDomain>,
    /// Structure used per accession, in first-seen order
    pub sources: Vec<(Accession, StructureFile)>,
    /// Accessions without a usable structure file
    pub missing_structures: Vec<Accession>,
    /// Domains whose trimming failed
    pub failed: Vec<TrimFailure>,
}

impl TrimResults {
    pub fn len(&self) -> usize {
        self.trimmed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trimmed.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TrimmedDomain> {
        self.trimmed.iter().find(|t| t.id == id)
    }
}

/// Domain ranges grouped by accession, keeping first-seen order
fn group_by_accession(domains: &[DomainRange]) -> Vec<(&str, Vec<&DomainRange>)> {
    let mut groups: Vec<(&str, Vec<&DomainRange>)> = Vec::new();
    for domain in domains {
        match groups.iter_mut().find(|(acc, _)| *acc == domain.accession) {
            Some((_, list)) => list.push(domain),
            None => groups.push((domain.accession.as_str(), vec![domain])),
        }
    }
    groups
}

pub struct TrimStage<'a> {
    config: &'a RetrieverConfig,
    progress: Progress,
}

impl<'a> TrimStage<'a> {
    pub fn new(config: &'a RetrieverConfig, progress: Progress) -> Self {
        Self { config, progress }
    }

    /// Trim every domain in `domains` using structures found in `structure_dir`
    #[instrument(skip_all, fields(dir = %structure_dir.display(), domains = domains.len()))]
    pub fn run(&self, structure_dir: &Path, domains: &[DomainRange]) -> Result<TrimResults> {
        if !structure_dir.is_dir() {
            return Err(ProtDomError::validation(format!(
                "Structure directory not found: {}",
                structure_dir.display()
            )));
        }
        if domains.is_empty() {
            return Err(ProtDomError::validation("No domain ranges provided for trimming"));
        }

        info!("Starting structure trimming");

        let output_dir = self.config.trimmed_dir();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            ProtDomError::file(format!("Failed to create {}: {}", output_dir.display(), e))
        })?;

        let total = domains.len();
        let mut processed = 0usize;
        let mut results = TrimResults::default();

        for (accession, protein_domains) in group_by_accession(domains) {
            let Some(structure) =
                locate::locate_structure(structure_dir, accession, &self.config.trim)?
            else {
                warn!(accession, "No structure file found");
                results.missing_structures.push(accession.to_string());
                processed += protein_domains.len();
                continue;
            };

            info!(
                accession,
                source = %structure.provenance,
                path = %structure.path.display(),
                "Processing structure"
            );

            for domain in protein_domains {
                let id = domain.id();
                let output = output_dir.join(domain.output_file_name());

                match trimmer::trim_file(&structure.path, &output, domain.interval) {
                    Ok(stats) => {
                        info!(
                            domain = %id,
                            kept = stats.kept_atoms,
                            total = stats.total_atoms,
                            "Trimmed domain"
                        );
                        results.trimmed.push(TrimmedDomain {
                            id,
                            accession: accession.to_string(),
                            ordinal: domain.ordinal,
                            interval: domain.interval,
                            path: output,
                            provenance: structure.provenance,
                            atoms_kept: stats.kept_atoms,
                        });
                    },
                    Err(e) => {
                        error!(domain = %id, error = %e, "Failed to trim domain");
                        results.failed.push(TrimFailure {
                            id,
                            reason: e.to_string(),
                        });
                    },
                }

                processed += 1;
                self.progress.update(
                    &format!("Processed domain {}/{}", processed, total),
                    processed as f64 / total as f64 * 100.0,
                );
            }

            results.sources.push((accession.to_string(), structure));
        }

        info!(
            found = results.sources.len(),
            missing = results.missing_structures.len(),
            trimmed = results.trimmed.len(),
            failed = results.failed.len(),
            "Structure trimming summary"
        );

        if results.is_empty() {
            return Err(ProtDomError::validation("No structures were trimmed successfully"));
        }

        self.save_summary(&results)?;
        Ok(results)
    }

    fn relative<'p>(&self, path: &'p Path) -> &'p Path {
        path.strip_prefix(&self.config.output_dir).unwrap_or(path)
    }

    fn save_summary(&self, results: &TrimResults) -> Result<()> {
        let pdb_sources: Map<String, Value> = results
            .sources
            .iter()
            .map(|(acc, file)| (acc.clone(), Value::String(file.provenance.to_string())))
            .collect();

        let trimmed: Map<String, Value> = results
            .trimmed
            .iter()
            .map(|t| {
                (
                    t.id.clone(),
                    json!({
                        "path": self.relative(&t.path).display().to_string(),
                        "source": t.provenance,
                        "start": t.interval.start,
                        "end": t.interval.end,
                        "atoms": t.atoms_kept,
                    }),
                )
            })
            .collect();

        let failed: Map<String, Value> = results
            .failed
            .iter()
            .map(|f| (f.id.clone(), Value::String(f.reason.clone())))
            .collect();

        let summary = json!({
            "version": SUMMARY_VERSION,
            "timestamp": chrono::Local::now().to_rfc3339(),
            "total_processed": results.len(),
            "pdb_sources": pdb_sources,
            "trimmed_structures": trimmed,
            "missing_structures": results.missing_structures,
            "failed": failed,
        });

        let path = self.config.artifact(TRIM_SUMMARY_FILE);
        let writer = std::io::BufWriter::new(std::fs::File::create(&path)?);
        serde_json::to_writer_pretty(writer, &summary)?;

        info!(path = %path.display(), "Saved trimming summary");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pdb(residues: std::ops::RangeInclusive<u32>) -> String {
        let mut text = String::from("HEADER    TEST\n");
        for (i, r) in residues.enumerate() {
            text.push_str(&format!(
                "ATOM  {:>5}  CA  ALA A{:>4}      11.104  13.207   2.100  1.00 90.00           C\n",
                i + 1,
                r
            ));
        }
        text.push_str("END\n");
        text
    }

    fn range(accession: &str, ordinal: u32, start: u32, end: u32) -> DomainRange {
        DomainRange {
            accession: accession.to_string(),
            ordinal,
            interval: Interval::new(start, end).unwrap(),
        }
    }

    #[test]
    fn test_trims_found_structures_and_reports_missing() {
        let out = TempDir::new().unwrap();
        let config = RetrieverConfig::new(out.path());
        let structures = config.structures_dir();
        std::fs::create_dir_all(&structures).unwrap();
        std::fs::write(structures.join("AF-P12345-F1.pdb"), pdb(1..=100)).unwrap();

        let domains = vec![
            range("P12345", 1, 10, 20),
            range("P12345", 2, 150, 200),
            range("Q99999", 1, 1, 10),
        ];

        let results = TrimStage::new(&config, Progress::none())
            .run(&structures, &domains)
            .unwrap();

        assert_eq!(results.len(), 1);
        let trimmed = results.get("P12345_domain1").unwrap();
        assert_eq!(trimmed.atoms_kept, 11);
        assert_eq!(trimmed.provenance, Provenance::Predicted);
        assert!(trimmed.path.ends_with("trimmed_structures/P12345_domain1_trimmed.pdb"));
        assert_eq!(results.failed.len(), 1);
        assert_eq!(results.failed[0].id, "P12345_domain2");
        assert_eq!(results.missing_structures, vec!["Q99999"]);

        let summary: Value = serde_json::from_str(
            &std::fs::read_to_string(out.path().join(TRIM_SUMMARY_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(summary["version"], "1.0");
        assert_eq!(summary["total_processed"], 1);
        assert_eq!(summary["pdb_sources"]["P12345"], "predicted");
        assert_eq!(
            summary["trimmed_structures"]["P12345_domain1"]["path"],
            "trimmed_structures/P12345_domain1_trimmed.pdb"
        );
        assert_eq!(summary["trimmed_structures"]["P12345_domain1"]["source"], "predicted");
    }

    #[test]
    fn test_nothing_trimmed_is_an_error() {
        let out = TempDir::new().unwrap();
        let config = RetrieverConfig::new(out.path());
        let structures = config.structures_dir();
        std::fs::create_dir_all(&structures).unwrap();

        let err = TrimStage::new(&config, Progress::none())
            .run(&structures, &[range("P12345", 1, 1, 10)])
            .unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let out = TempDir::new().unwrap();
        let config = RetrieverConfig::new(out.path());

        let err = TrimStage::new(&config, Progress::none())
            .run(&out.path().join("nope"), &[range("P12345", 1, 1, 10)])
            .unwrap_err();

        assert_eq!(err.kind(), "ValidationError");
    }
}
