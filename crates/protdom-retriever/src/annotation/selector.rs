//! Overlap resolution for annotation intervals
//!
//! Turns the possibly-overlapping intervals reported for one accession into a
//! single non-overlapping [`DomainLayout`]:
//!
//! 1. flatten every `(entry, interval)` pair in input order
//! 2. stable sort by span, longest first
//! 3. greedily accept intervals that overlap nothing accepted so far
//! 4. order the survivors by start and number them 1..N
//!
//! Equal spans keep their flattened order, so earlier entries win ties.

use protdom_common::types::{Domain, DomainLayout, EntryId, Interval};
use protdom_common::Result;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Intervals reported for one annotation entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryIntervals {
    pub entry: EntryId,
    pub intervals: Vec<Interval>,
}

impl EntryIntervals {
    pub fn new(entry: impl Into<EntryId>, intervals: Vec<Interval>) -> Self {
        Self {
            entry: entry.into(),
            intervals,
        }
    }
}

/// Accepted domains of one entry, for the summary string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryGroup {
    pub entry: EntryId,
    /// Ordinals of the entry's domains, ascending
    pub ordinals: Vec<u32>,
}

/// Resolved layout plus its per-entry grouping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub layout: DomainLayout,
    /// Entries ordered by their lowest-start domain; entries without an
    /// accepted domain are absent
    pub groups: Vec<EntryGroup>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    /// `IPR000001 (d1:[1,50],d3:[120,180]) + IPR000002 (d2:[60,100])`
    pub fn summary(&self) -> String {
        self.groups
            .iter()
            .map(|group| {
                let parts: Vec<String> = group
                    .ordinals
                    .iter()
                    .filter_map(|ordinal| self.domain(*ordinal))
                    .map(|domain| format!("{}:{}", domain.label(), domain.interval()))
                    .collect();
                format!("{} ({})", group.entry, parts.join(","))
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }

    /// Entry to domain labels (`{"IPR000001": ["d1", "d3"]}`)
    pub fn entry_map(&self) -> BTreeMap<&str, Vec<String>> {
        self.groups
            .iter()
            .map(|group| {
                let labels = group.ordinals.iter().map(|o| format!("d{}", o)).collect();
                (group.entry.as_str(), labels)
            })
            .collect()
    }

    fn domain(&self, ordinal: u32) -> Option<&Domain> {
        let index = usize::try_from(ordinal).ok()?.checked_sub(1)?;
        self.layout.domains().get(index)
    }
}

/// Resolve overlapping intervals into an ordered, non-overlapping layout
pub fn select(candidates: &[EntryIntervals]) -> Result<Selection> {
    let mut flattened: Vec<(&str, Interval)> = candidates
        .iter()
        .flat_map(|c| c.intervals.iter().map(move |iv| (c.entry.as_str(), *iv)))
        .collect();

    // sort_by_key is stable
    flattened.sort_by_key(|(_, interval)| Reverse(interval.span()));

    let mut accepted: Vec<(&str, Interval)> = Vec::new();
    for (entry, interval) in flattened {
        if accepted.iter().all(|(_, kept)| !kept.overlaps(&interval)) {
            accepted.push((entry, interval));
        }
    }

    accepted.sort_by_key(|(_, interval)| interval.start);

    let domains: Vec<Domain> = accepted
        .iter()
        .zip(1u32..)
        .map(|((entry, interval), ordinal)| Domain {
            ordinal,
            entry: entry.to_string(),
            start: interval.start,
            end: interval.end,
        })
        .collect();

    let mut groups: Vec<EntryGroup> = Vec::new();
    for domain in &domains {
        match groups.iter_mut().find(|g| g.entry == domain.entry) {
            Some(group) => group.ordinals.push(domain.ordinal),
            None => groups.push(EntryGroup {
                entry: domain.entry.clone(),
                ordinals: vec![domain.ordinal],
            }),
        }
    }

    Ok(Selection {
        layout: DomainLayout::from_ordered(domains)?,
        groups,
    })
}
