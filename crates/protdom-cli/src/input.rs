//! Accession list input

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Parse one accession per line; surrounding whitespace and blank lines are ignored
pub fn parse_accessions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read accessions from `path`
pub fn read_accessions(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    let accessions = parse_accessions(&text);
    if accessions.is_empty() {
        bail!("Input file {} contains no accessions", path.display());
    }

    Ok(accessions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_ignored() {
        let accessions = parse_accessions("P12345\n\n  Q99999  \r\n\t\nA0A024R161\n");
        assert_eq!(accessions, vec!["P12345", "Q99999", "A0A024R161"]);
    }

    #[test]
    fn test_empty_file_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ids.txt");
        std::fs::write(&path, "\n  \n").unwrap();

        let err = read_accessions(&path).unwrap_err();
        assert!(err.to_string().contains("no accessions"));
    }

    #[test]
    fn test_missing_file_named_in_error() {
        let err = read_accessions(Path::new("/nonexistent/ids.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ids.txt"));
    }
}
