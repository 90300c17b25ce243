//! Domain types shared by every stage

use crate::error::{ProtDomError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Opaque protein identifier, unique across a run
pub type Accession = String;

/// Identifier of one family/domain annotation entry (e.g. `IPR000719`)
pub type EntryId = String;

/// Closed residue range, 1-based, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    /// Build an interval, rejecting zero coordinates and reversed bounds
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start == 0 {
            return Err(ProtDomError::validation(format!(
                "Residue coordinates are 1-based, got start 0 (end {})",
                end
            )));
        }
        if start > end {
            return Err(ProtDomError::validation(format!(
                "Interval start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// `end - start`, the ordering key used when resolving overlaps
    pub fn span(&self) -> u32 {
        self.end - self.start
    }

    /// Closed-range overlap: intervals sharing a single residue overlap
    pub fn overlaps(&self, other: &Interval) -> bool {
        !(self.end < other.start || self.start > other.end)
    }

    pub fn contains(&self, residue: u32) -> bool {
        self.start <= residue && residue <= self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.start, self.end)
    }
}

/// One resolved domain of a protein
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Position of the domain in the layout, 1-based
    pub ordinal: u32,
    /// Annotation entry the domain was taken from
    pub entry: EntryId,
    pub start: u32,
    pub end: u32,
}

impl Domain {
    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }

    pub fn key(&self, accession: &str) -> DomainKey {
        DomainKey::new(accession, self.start, self.end)
    }

    /// Short label used in summaries (`d3`)
    pub fn label(&self) -> String {
        format!("d{}", self.ordinal)
    }
}

/// Ordered, non-overlapping domains of one accession.
///
/// Domains are sorted by `start` and numbered 1..N in that order. The layout
/// cannot be modified once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DomainLayout {
    domains: Vec<Domain>,
}

impl DomainLayout {
    /// Layout with no domains
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a layout from domains already in final order.
    ///
    /// Fails when the domains are unsorted, overlap, or are not numbered
    /// 1..N in order.
    pub fn from_ordered(domains: Vec<Domain>) -> Result<Self> {
        for (index, domain) in domains.iter().enumerate() {
            let expected = index as u32 + 1;
            if domain.ordinal != expected {
                return Err(ProtDomError::validation(format!(
                    "Domain ordinal {} found at position {}",
                    domain.ordinal, expected
                )));
            }
            Interval::new(domain.start, domain.end)?;
        }

        for pair in domains.windows(2) {
            if pair[0].end >= pair[1].start {
                return Err(ProtDomError::validation(format!(
                    "Domains {} and {} overlap or are out of order",
                    pair[0].interval(),
                    pair[1].interval()
                )));
            }
        }

        Ok(Self { domains })
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Domain> {
        self.domains.iter()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

impl<'a> IntoIterator for &'a DomainLayout {
    type Item = &'a Domain;
    type IntoIter = std::slice::Iter<'a, Domain>;

    fn into_iter(self) -> Self::IntoIter {
        self.domains.iter()
    }
}

/// Join key between stages, rendered `accession[start-end]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DomainKey {
    pub accession: Accession,
    pub start: u32,
    pub end: u32,
}

#[allow(clippy::expect_used)]
fn domain_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^\[\]\s]+)\[(\d+)-(\d+)\]$").expect("domain key pattern is valid")
    })
}

impl DomainKey {
    pub fn new(accession: impl Into<Accession>, start: u32, end: u32) -> Self {
        Self {
            accession: accession.into(),
            start,
            end,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval {
            start: self.start,
            end: self.end,
        }
    }
}

impl std::fmt::Display for DomainKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}-{}]", self.accession, self.start, self.end)
    }
}

impl std::str::FromStr for DomainKey {
    type Err = ProtDomError;

    fn from_str(s: &str) -> Result<Self> {
        let captures = domain_key_pattern()
            .captures(s.trim())
            .ok_or_else(|| ProtDomError::validation(format!("Invalid domain key: '{}'", s)))?;

        let number = |index: usize| -> Result<u32> {
            captures[index].parse().map_err(|_| {
                ProtDomError::validation(format!("Residue number out of range in '{}'", s))
            })
        };

        let key = Self::new(&captures[1], number(2)?, number(3)?);
        Interval::new(key.start, key.end)?;
        Ok(key)
    }
}

/// Where a structure file used for trimming came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Downloaded predicted model (AlphaFold naming)
    Predicted,
    /// User-supplied structure matched by file name
    Custom,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Predicted => write!(f, "predicted"),
            Provenance::Custom => write!(f, "custom"),
        }
    }
}
