//! Domain ranges to trim, from annotation results or a saved ranges file

use crate::annotation::AnnotationResults;
use protdom_common::types::{Accession, DomainKey, Interval};
use protdom_common::{ProtDomError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// One domain of one accession, numbered within its accession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRange {
    pub accession: Accession,
    pub ordinal: u32,
    pub interval: Interval,
}

impl DomainRange {
    /// `{accession}_domain{ordinal}`
    pub fn id(&self) -> String {
        format!("{}_domain{}", self.accession, self.ordinal)
    }

    pub fn output_file_name(&self) -> String {
        format!("{}_trimmed.pdb", self.id())
    }
}

/// Every domain of every annotated protein, in layout order
pub fn ranges_from_annotations(results: &AnnotationResults) -> Vec<DomainRange> {
    results
        .domains()
        .map(|(accession, domain)| DomainRange {
            accession: accession.to_string(),
            ordinal: domain.ordinal,
            interval: domain.interval(),
        })
        .collect()
}

/// Parse `accession[start-end]` lines; ordinals follow file order per accession.
///
/// Lines that do not match are skipped; a file without any valid line is an
/// error.
pub fn parse_domain_ranges(text: &str) -> Result<Vec<DomainRange>> {
    let mut ranges = Vec::new();
    let mut counters: HashMap<String, u32> = HashMap::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let key: DomainKey = match line.parse() {
            Ok(key) => key,
            Err(e) => {
                warn!(line = number + 1, error = %e, "Skipping invalid domain range line");
                continue;
            },
        };

        let counter = counters.entry(key.accession.clone()).or_insert(0);
        *counter += 1;
        ranges.push(DomainRange {
            interval: key.interval(),
            ordinal: *counter,
            accession: key.accession,
        });
    }

    if ranges.is_empty() {
        return Err(ProtDomError::validation("No valid domain ranges found in file"));
    }

    debug!(domains = ranges.len(), "Parsed domain ranges");
    Ok(ranges)
}

pub fn load_domain_ranges(path: &Path) -> Result<Vec<DomainRange>> {
    if !path.exists() {
        return Err(ProtDomError::validation(format!(
            "Domain ranges file not found: {}",
            path.display()
        )));
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        ProtDomError::file(format!("Failed to read domain ranges {}: {}", path.display(), e))
    })?;

    parse_domain_ranges(&text)
}
