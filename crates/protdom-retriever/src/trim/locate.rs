//! Structure file lookup for trimming
//!
//! Tier 1 is the AlphaFold file name `AF-{accession}-F1.pdb`. Tier 2, only
//! when custom structures are accepted, scans every `*.pdb` in the
//! directory whose name mentions the accession.

use crate::config::TrimConfig;
use crate::structure::validate::is_trimmable_structure;
use crate::structure::StructureFile;
use protdom_common::types::Provenance;
use protdom_common::{ProtDomError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub fn predicted_file_name(accession: &str) -> String {
    format!("AF-{}-F1.pdb", accession)
}

/// Custom file name match; strict mode needs the accession as a whole
/// `_`-separated token of the stem
fn name_matches(path: &Path, accession: &str, strict: bool) -> bool {
    if strict {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(|stem| stem.split('_').any(|token| token == accession))
            .unwrap_or(false)
    } else {
        path.file_name()
            .and_then(|s| s.to_str())
            .map(|name| name.contains(accession))
            .unwrap_or(false)
    }
}

/// `*.pdb` files of `dir`, sorted by file name
fn pdb_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ProtDomError::file(format!("Failed to list {}: {}", dir.display(), e))
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "pdb"))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Find the structure to trim for `accession`, if any
pub fn locate_structure(
    dir: &Path,
    accession: &str,
    config: &TrimConfig,
) -> Result<Option<StructureFile>> {
    let predicted = dir.join(predicted_file_name(accession));
    if predicted.is_file() {
        if is_trimmable_structure(&predicted) {
            debug!(accession, path = %predicted.display(), "Using predicted structure");
            return Ok(Some(StructureFile {
                path: predicted,
                provenance: Provenance::Predicted,
            }));
        }
        warn!(accession, path = %predicted.display(), "Predicted structure file is invalid");
    }

    if !config.accept_custom_structures {
        info!(accession, "No valid AlphaFold structure found");
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for path in pdb_files(dir)? {
        if path == predicted || !name_matches(&path, accession, config.custom_strict) {
            continue;
        }
        if is_trimmable_structure(&path) {
            candidates.push(path);
        } else {
            warn!(accession, path = %path.display(), "Matching structure file is invalid");
        }
    }

    if candidates.len() > 1 {
        warn!(
            accession,
            candidates = candidates.len(),
            "Multiple matching structure files, using the first by name"
        );
    }

    match candidates.into_iter().next() {
        Some(path) => {
            debug!(accession, path = %path.display(), "Using custom structure");
            Ok(Some(StructureFile {
                path,
                provenance: Provenance::Custom,
            }))
        },
        None => {
            info!(accession, "No valid structure found in custom or AlphaFold format");
            Ok(None)
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const VALID: &str = "HEADER    TEST\nATOM      1  N   MET A   1      0.0   0.0   0.0\nEND\n";

    fn custom(strict: bool) -> TrimConfig {
        TrimConfig {
            accept_custom_structures: true,
            custom_strict: strict,
            ..TrimConfig::default()
        }
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_predicted_file_wins() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "AF-P12345-F1.pdb", VALID);
        write(dir.path(), "P12345_model.pdb", VALID);

        let found = locate_structure(dir.path(), "P12345", &custom(false))
            .unwrap()
            .unwrap();
        assert_eq!(found.provenance, Provenance::Predicted);
        assert!(found.path.ends_with("AF-P12345-F1.pdb"));
    }

    #[test]
    fn test_custom_ignored_unless_accepted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "P12345_model.pdb", VALID);

        let found = locate_structure(dir.path(), "P12345", &TrimConfig::default()).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_strict_requires_whole_token() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "P123456_model.pdb", VALID);
        write(dir.path(), "xP12345.pdb", VALID);

        assert!(locate_structure(dir.path(), "P12345", &custom(true)).unwrap().is_none());

        let loose = locate_structure(dir.path(), "P12345", &custom(false))
            .unwrap()
            .unwrap();
        assert!(loose.path.ends_with("P123456_model.pdb"));
        assert_eq!(loose.provenance, Provenance::Custom);
    }

    #[test]
    fn test_candidates_sorted_and_validated() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a_P12345.pdb", "not a structure\n");
        write(dir.path(), "c_P12345.pdb", VALID);
        write(dir.path(), "b_P12345.pdb", VALID);

        let found = locate_structure(dir.path(), "P12345", &custom(true))
            .unwrap()
            .unwrap();
        assert!(found.path.ends_with("b_P12345.pdb"));
    }

    #[test]
    fn test_invalid_predicted_falls_back_to_custom() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "AF-P12345-F1.pdb", "HEADER    NO ATOMS\nEND\n");
        write(dir.path(), "P12345.pdb", VALID);

        let found = locate_structure(dir.path(), "P12345", &custom(true))
            .unwrap()
            .unwrap();
        assert_eq!(found.provenance, Provenance::Custom);
        assert!(found.path.ends_with("P12345.pdb"));
    }
}
