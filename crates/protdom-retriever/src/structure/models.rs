//! AlphaFold API payloads and structure results

use protdom_common::types::{Accession, Provenance};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One element of `GET /prediction/{accession}`
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionEntry {
    #[serde(rename = "entryId", default)]
    pub entry_id: Option<String>,
    #[serde(rename = "pdbUrl", default)]
    pub pdb_url: Option<String>,
    #[serde(rename = "modelCreatedDate", alias = "modelDate", default)]
    pub model_date: Option<String>,
    #[serde(rename = "latestVersion", default)]
    pub latest_version: Option<u32>,
}

/// Structure file used by later stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureFile {
    pub path: PathBuf,
    pub provenance: Provenance,
}

/// One successfully stored prediction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureRecord {
    pub accession: Accession,
    pub entry_id: String,
    pub file: StructureFile,
    pub sha256: String,
    pub model_date: Option<String>,
    /// A valid file from an earlier run was kept
    pub reused: bool,
}

/// Accession that could not be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureFailure {
    pub accession: Accession,
    pub reason: String,
}

/// Output of the structure stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureResults {
    /// Successful downloads in input order
    pub structures: Vec<StructureRecord>,
    pub failed: Vec<StructureFailure>,
    /// Accessions never attempted because the run was cancelled
    pub skipped: Vec<Accession>,
}

impl StructureResults {
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn get(&self, accession: &str) -> Option<&StructureFile> {
        self.structures
            .iter()
            .find(|s| s.accession == accession)
            .map(|s| &s.file)
    }
}
