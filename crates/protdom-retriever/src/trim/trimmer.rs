//! Residue-range trimming of PDB files
//!
//! Streams the input line by line: `ATOM` records inside the range are kept,
//! `TER`/`END`/`ENDMDL` lines pass through verbatim, everything else is
//! dropped.

use protdom_common::types::Interval;
use protdom_common::{ProtDomError, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimStats {
    pub total_atoms: usize,
    pub kept_atoms: usize,
    /// `ATOM` lines whose residue number could not be read
    pub unparsed_atoms: usize,
}

/// Residue sequence number, columns 23-26
fn residue_number(line: &str) -> Option<i64> {
    line.get(22..26)?.trim().parse().ok()
}

/// Copy the part of `reader` that belongs to `range` into `writer`
pub fn trim_stream<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
    range: Interval,
) -> io::Result<TrimStats> {
    let mut stats = TrimStats::default();
    let (start, end) = (i64::from(range.start), i64::from(range.end));
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }

        if line.starts_with("ATOM") {
            stats.total_atoms += 1;
            match residue_number(&line) {
                Some(residue) if (start..=end).contains(&residue) => {
                    writer.write_all(line.as_bytes())?;
                    stats.kept_atoms += 1;
                },
                Some(_) => {},
                None => stats.unparsed_atoms += 1,
            }
        } else if line.starts_with("TER") || line.starts_with("END") {
            writer.write_all(line.as_bytes())?;
        }
    }

    writer.flush()?;
    Ok(stats)
}

/// Trim `input` into `output`.
///
/// When no atom falls in the range the output file is removed and an error
/// is returned.
pub fn trim_file(input: &Path, output: &Path, range: Interval) -> Result<TrimStats> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    let reader = BufReader::new(File::open(input).map_err(|e| {
        ProtDomError::file(format!("Failed to open {}: {}", input.display(), e))
    })?);
    let writer = BufWriter::new(File::create(output).map_err(|e| {
        ProtDomError::file(format!("Failed to create {}: {}", output.display(), e))
    })?);

    let stats = trim_stream(reader, writer, range)
        .map_err(|e| ProtDomError::file(format!("Failed to trim {}: {}", name, e)))?;

    if stats.unparsed_atoms > 0 {
        warn!(
            file = %name,
            lines = stats.unparsed_atoms,
            "Skipped ATOM records with invalid residue numbers"
        );
    }

    if stats.kept_atoms == 0 {
        if let Err(e) = std::fs::remove_file(output) {
            warn!(path = %output.display(), error = %e, "Failed to remove empty trimmed file");
        }
        return Err(ProtDomError::validation(format!(
            "No atoms found in range {}-{} in {} (total atoms: {})",
            range.start, range.end, name, stats.total_atoms
        )));
    }

    Ok(stats)
}
