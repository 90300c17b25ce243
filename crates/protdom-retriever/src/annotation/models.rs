//! InterPro API response models and annotation results

use super::selector::Selection;
use protdom_common::types::{Accession, Domain, DomainKey, DomainLayout, EntryId};
use protdom_common::{ProtDomError, Result};
use serde::Deserialize;
use std::collections::HashSet;

// ============================================================================
// API payloads
// ============================================================================

/// One page of `/entry/all/protein/uniprot/{accession}`
#[derive(Debug, Clone, Deserialize)]
pub struct EntryPage {
    #[serde(default)]
    pub results: Vec<EntryResult>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryResult {
    pub metadata: EntryMetadata,
    #[serde(default)]
    pub proteins: Vec<ProteinMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryMetadata {
    pub accession: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub entry_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProteinMatch {
    #[serde(default)]
    pub accession: Option<String>,
    /// `null` when the protein has no location data for the entry
    #[serde(default)]
    pub entry_protein_locations: Option<Vec<ProteinLocation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProteinLocation {
    #[serde(default)]
    pub fragments: Vec<Fragment>,
}

/// Raw fragment coordinates, validated before use
#[derive(Debug, Clone, Deserialize)]
pub struct Fragment {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

// ============================================================================
// Stage output
// ============================================================================

/// Resolved domains of one accession
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinDomains {
    pub accession: Accession,
    pub selection: Selection,
}

impl ProteinDomains {
    pub fn layout(&self) -> &DomainLayout {
        &self.selection.layout
    }

    pub fn has_domains(&self) -> bool {
        !self.selection.is_empty()
    }
}

/// Output of the annotation stage, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationResults {
    /// Requested entry identifiers
    pub entries: Vec<EntryId>,
    /// Every accession that was looked up, including zero-domain ones
    pub proteins: Vec<ProteinDomains>,
    /// Accessions skipped after a failed lookup (tolerant mode only)
    pub failed: Vec<Accession>,
}

impl AnnotationResults {
    pub fn get(&self, accession: &str) -> Option<&ProteinDomains> {
        self.proteins.iter().find(|p| p.accession == accession)
    }

    /// Proteins with at least one domain
    pub fn with_domains(&self) -> impl Iterator<Item = &ProteinDomains> {
        self.proteins.iter().filter(|p| p.has_domains())
    }

    /// Accessions with at least one domain, in input order
    pub fn accessions_with_domains(&self) -> Vec<Accession> {
        self.with_domains().map(|p| p.accession.clone()).collect()
    }

    pub fn domain_count(&self) -> usize {
        self.proteins.iter().map(|p| p.layout().len()).sum()
    }

    pub fn max_domains(&self) -> usize {
        self.proteins
            .iter()
            .map(|p| p.layout().len())
            .max()
            .unwrap_or(0)
    }

    /// Every `(accession, domain)` pair in layout order
    pub fn domains(&self) -> impl Iterator<Item = (&str, &Domain)> {
        self.proteins
            .iter()
            .flat_map(|p| p.layout().iter().map(move |d| (p.accession.as_str(), d)))
    }

    /// Domain keys in layout order; a repeated key is a data-integrity error
    pub fn domain_keys(&self) -> Result<Vec<DomainKey>> {
        let mut seen = HashSet::new();
        let mut keys = Vec::with_capacity(self.domain_count());

        for (accession, domain) in self.domains() {
            let key = domain.key(accession);
            if !seen.insert(key.clone()) {
                return Err(ProtDomError::validation(format!(
                    "Duplicate domain key {}",
                    key
                )));
            }
            keys.push(key);
        }

        Ok(keys)
    }
}
