//! Shared helpers for integration tests
#![allow(dead_code)]

use protdom_retriever::config::RetrieverConfig;
use std::path::Path;

/// Config pointing every service at `base_url`, with millisecond timings
pub fn test_config(output: &Path, base_url: &str) -> RetrieverConfig {
    let mut config = RetrieverConfig::new(output);
    config.http.backoff_unit_ms = 1;
    config.http.request_timeout_secs = 5;
    config.annotation.api_base_url = base_url.to_string();
    config.annotation.request_delay_ms = 0;
    config.sequence.api_base_url = base_url.to_string();
    config.sequence.poll_interval_ms = 10;
    config.sequence.job_timeout_secs = 5;
    config.structure.api_base_url = base_url.to_string();
    config
}

/// Minimal PDB text with one CA atom per residue
pub fn pdb_text(residues: std::ops::RangeInclusive<u32>) -> String {
    let mut text = String::from("HEADER    PREDICTED STRUCTURE\n");
    for (i, residue) in residues.enumerate() {
        text.push_str(&format!(
            "ATOM  {:>5}  CA  ALA A{:>4}      11.104  13.207   2.100  1.00 90.00           C\n",
            i + 1,
            residue
        ));
    }
    text.push_str("TER\nEND\n");
    text
}

/// InterPro entry listing with one fragment per `(entry, start, end)`
pub fn interpro_page(matches: &[(&str, u32, u32)], next: Option<String>) -> serde_json::Value {
    let results: Vec<serde_json::Value> = matches
        .iter()
        .map(|(entry, start, end)| {
            serde_json::json!({
                "metadata": {"accession": entry, "type": "domain"},
                "proteins": [{
                    "accession": "ignored",
                    "entry_protein_locations": [
                        {"fragments": [{"start": start, "end": end, "dc-status": "CONTINUOUS"}]}
                    ]
                }]
            })
        })
        .collect();

    serde_json::json!({
        "count": results.len(),
        "next": next,
        "previous": null,
        "results": results,
    })
}
