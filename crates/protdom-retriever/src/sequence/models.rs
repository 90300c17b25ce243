//! UniProt ID-mapping payloads and domain sequence results

use protdom_common::types::{Accession, DomainKey, EntryId};
use serde::{Deserialize, Serialize, Serializer};

/// Response of `POST /idmapping/run`
#[derive(Debug, Clone, Deserialize)]
pub struct JobSubmission {
    #[serde(rename = "jobId")]
    pub job_id: String,
}

/// Response of `GET /idmapping/status/{job}`
///
/// A finished job may answer with its results instead of a status field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatusResponse {
    #[serde(rename = "jobStatus", default)]
    pub job_status: Option<String>,
    #[serde(default)]
    pub results: Option<serde_json::Value>,
    #[serde(rename = "failedIds", default)]
    pub failed_ids: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Running(String),
    Finished,
    Failed(String),
}

impl JobStatusResponse {
    pub fn state(&self) -> JobState {
        match self.job_status.as_deref() {
            Some("FINISHED") => JobState::Finished,
            Some(status @ ("ERROR" | "FAILED")) => JobState::Failed(status.to_string()),
            _ if self.results.is_some() || self.failed_ids.is_some() => JobState::Finished,
            Some(status) => JobState::Running(status.to_string()),
            None => JobState::Running("UNKNOWN".to_string()),
        }
    }
}

/// Response of `GET /idmapping/details/{job}`
#[derive(Debug, Clone, Deserialize)]
pub struct JobDetails {
    #[serde(rename = "redirectURL", default)]
    pub redirect_url: Option<String>,
}

/// Sub-sequence of one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSequence {
    #[serde(skip)]
    pub key: DomainKey,
    pub sequence: String,
    pub entry: EntryId,
    pub accession: Accession,
    pub start: u32,
    pub end: u32,
}

/// Extracted domain sequences in layout order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainSequences {
    pub records: Vec<DomainSequence>,
    /// Accessions absent from the mapping results
    pub missing: Vec<Accession>,
}

impl DomainSequences {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &DomainKey) -> Option<&DomainSequence> {
        self.records.iter().find(|r| &r.key == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomainSequence> {
        self.records.iter()
    }
}

/// Serializes as a key-ordered JSON object `{"P12345[10-50]": {...}}`
impl Serialize for DomainSequences {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.records.iter().map(|r| (r.key.to_string(), r)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn status(json: &str) -> JobState {
        serde_json::from_str::<JobStatusResponse>(json).unwrap().state()
    }

    #[test]
    fn test_job_states() {
        assert_eq!(status(r#"{"jobStatus": "RUNNING"}"#), JobState::Running("RUNNING".into()));
        assert_eq!(status(r#"{"jobStatus": "NEW"}"#), JobState::Running("NEW".into()));
        assert_eq!(status(r#"{"jobStatus": "FINISHED"}"#), JobState::Finished);
        assert_eq!(status(r#"{"results": [], "failedIds": ["X"]}"#), JobState::Finished);
        assert_eq!(status(r#"{"failedIds": []}"#), JobState::Finished);
        assert_eq!(status(r#"{"jobStatus": "ERROR"}"#), JobState::Failed("ERROR".into()));
        assert_eq!(status(r#"{"jobStatus": "FAILED"}"#), JobState::Failed("FAILED".into()));
        assert_eq!(status("{}"), JobState::Running("UNKNOWN".into()));
    }

    #[test]
    fn test_domain_sequences_json_shape() {
        let sequences = DomainSequences {
            records: vec![DomainSequence {
                key: DomainKey::new("P12345", 2, 4),
                sequence: "BCD".to_string(),
                entry: "IPR000001".to_string(),
                accession: "P12345".to_string(),
                start: 2,
                end: 4,
            }],
            missing: vec![],
        };

        let value = serde_json::to_value(&sequences).unwrap();
        assert_eq!(value["P12345[2-4]"]["sequence"], "BCD");
        assert_eq!(value["P12345[2-4]"]["entry"], "IPR000001");
        assert_eq!(value["P12345[2-4]"]["start"], 2);
    }
}
