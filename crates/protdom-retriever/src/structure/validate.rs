//! Minimal PDB file sanity checks

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const STRUCTURE_RECORDS: [&str; 4] = ["HEADER", "ATOM", "HETATM", "MODEL"];

/// First non-empty line starts with a structure record
pub fn looks_like_structure_text(text: &str) -> bool {
    text.lines()
        .map(str::trim_end)
        .find(|line| !line.trim().is_empty())
        .map(|line| STRUCTURE_RECORDS.iter().any(|r| line.starts_with(r)))
        .unwrap_or(false)
}

/// [`looks_like_structure_text`] for a file, reading only until the first
/// non-empty line
pub fn is_structure_file(path: &Path) -> bool {
    let Ok(file) = File::open(path) else {
        return false;
    };

    for line in BufReader::new(file).lines() {
        let Ok(line) = line else {
            return false;
        };
        if line.trim().is_empty() {
            continue;
        }
        return STRUCTURE_RECORDS.iter().any(|r| line.starts_with(r));
    }

    false
}

/// Structure header check plus at least one `ATOM` record
pub fn is_trimmable_structure(path: &Path) -> bool {
    if !is_structure_file(path) {
        return false;
    }

    let Ok(file) = File::open(path) else {
        return false;
    };

    BufReader::new(file)
        .lines()
        .map_while(|line| line.ok())
        .any(|line| line.starts_with("ATOM"))
}
