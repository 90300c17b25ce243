//! Annotation artifacts: ranges list, TSV table and JSON detail

use super::models::{AnnotationResults, ProteinDomains};
use protdom_common::types::Domain;
use protdom_common::{ProtDomError, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub const DOMAIN_RANGES_FILE: &str = "domain_ranges.txt";
pub const DOMAIN_TABLE_FILE: &str = "domain_analysis.tsv";
pub const ANNOTATION_JSON_FILE: &str = "interpro_results.json";

const MISSING_CELL: &str = "N/A";

/// One `accession[start-end]` line per domain
pub fn write_domain_ranges(results: &AnnotationResults, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    for key in results.domain_keys()? {
        writeln!(writer, "{}", key)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), "Wrote domain ranges");
    Ok(())
}

/// Tab-separated table, one row per accession, padded to the widest layout
pub fn write_domain_table(results: &AnnotationResults, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(csv_error)?;

    let width = results.max_domains();

    let mut header = vec!["Protein Accession".to_string(), "InterPro Entry".to_string()];
    for i in 1..=width {
        header.push(format!("Start {}", i));
        header.push(format!("End {}", i));
    }
    writer.write_record(&header).map_err(csv_error)?;

    for protein in &results.proteins {
        let mut row = vec![protein.accession.clone(), entry_column(protein)];
        let domains = protein.layout().domains();
        for i in 0..width {
            match domains.get(i) {
                Some(domain) => {
                    row.push(domain.start.to_string());
                    row.push(domain.end.to_string());
                },
                None => {
                    row.push(MISSING_CELL.to_string());
                    row.push(MISSING_CELL.to_string());
                },
            }
        }
        writer.write_record(&row).map_err(csv_error)?;
    }

    writer.flush()?;
    debug!(path = %path.display(), rows = results.proteins.len(), "Wrote domain table");
    Ok(())
}

/// Summary string, `N/A` for proteins without domains
fn entry_column(protein: &ProteinDomains) -> String {
    if protein.has_domains() {
        protein.selection.summary()
    } else {
        MISSING_CELL.to_string()
    }
}

#[derive(Serialize)]
struct ProteinRecord<'a> {
    domains: &'a [Domain],
    entry_string: String,
    entry_map: BTreeMap<&'a str, Vec<String>>,
}

/// Accession-keyed JSON object, serialized in input order
struct OrderedProteins<'a>(&'a [ProteinDomains]);

impl Serialize for OrderedProteins<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|protein| {
            (
                protein.accession.as_str(),
                ProteinRecord {
                    domains: protein.layout().domains(),
                    entry_string: protein.selection.summary(),
                    entry_map: protein.selection.entry_map(),
                },
            )
        }))
    }
}

pub fn write_annotation_json(results: &AnnotationResults, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &OrderedProteins(&results.proteins))?;

    debug!(path = %path.display(), "Wrote annotation JSON");
    Ok(())
}

fn csv_error(err: csv::Error) -> ProtDomError {
    ProtDomError::file(format!("Failed to write TSV: {}", err))
}
