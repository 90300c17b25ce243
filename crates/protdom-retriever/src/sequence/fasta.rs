//! FASTA parsing and domain sequence output

use super::models::DomainSequences;
use protdom_common::types::Accession;
use protdom_common::Result;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const DOMAIN_FASTA_FILE: &str = "domain_sequences.fasta";
pub const DOMAIN_SEQUENCES_JSON_FILE: &str = "domain_sequences.json";

/// Accession of a FASTA header line (without the leading `>`).
///
/// `sp|P12345|KIN1_HUMAN ...` yields `P12345`; headers without `|` yield
/// their first token.
pub fn header_accession(header: &str) -> Option<&str> {
    let header = header.trim();
    let accession = match header.split('|').nth(1) {
        Some(field) => field.trim(),
        None => header.split_whitespace().next().unwrap_or(""),
    };
    (!accession.is_empty()).then_some(accession)
}

/// Parse concatenated FASTA text into accession to residue string.
///
/// Later records for the same accession replace earlier ones.
pub fn parse_fasta(text: &str) -> HashMap<Accession, String> {
    let mut sequences = HashMap::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        if let Some(header) = line.strip_prefix('>') {
            if let Some((accession, sequence)) = current.take() {
                sequences.insert(accession, sequence);
            }
            current = header_accession(header).map(|acc| (acc.to_string(), String::new()));
        } else if let Some((_, sequence)) = current.as_mut() {
            sequence.push_str(line.trim());
        }
    }

    if let Some((accession, sequence)) = current {
        sequences.insert(accession, sequence);
    }

    sequences
}

/// Residues `start..=end` (1-based), or `None` when out of range
pub fn slice_domain(sequence: &str, start: u32, end: u32) -> Option<&str> {
    let from = usize::try_from(start).ok()?.checked_sub(1)?;
    let to = usize::try_from(end).ok()?;
    if from >= to {
        return None;
    }
    sequence.get(from..to)
}

/// `>{key} {entry}` followed by the unwrapped sequence
pub fn write_domain_fasta(sequences: &DomainSequences, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);

    for record in sequences.iter() {
        writeln!(writer, ">{} {}", record.key, record.entry)?;
        writeln!(writer, "{}", record.sequence)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_domain_json(sequences: &DomainSequences, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, sequences)?;
    Ok(())
}
