//! End-to-end orchestrator runs against mocked InterPro, UniProt and AlphaFold

mod common;

use common::{interpro_page, pdb_text, test_config};
use protdom_retriever::orchestrator::{PipelineOrchestrator, PipelineRequest, PipelineState};
use protdom_retriever::progress::{CancellationToken, Progress};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, MockServer, ResponseTemplate,
};

const SEQ_P00001: &str = "MKTAYIAKQRQISFVKSHFSRQLEERLGLIEV";
const SEQ_P00002: &str = "MSTNPKPQRKTKRNTNRRPQDVKFPGG";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// P00001 and P00002 carry IPR000001; NODOM1 only matches an unrequested entry
async fn mount_interpro(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P00001"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(interpro_page(&[("IPR000001", 5, 15)], None)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P00002"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(interpro_page(&[("IPR000001", 3, 8)], None)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/NODOM1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(interpro_page(&[("IPR055555", 1, 90)], None)),
        )
        .mount(server)
        .await;
}

async fn mount_uniprot(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/idmapping/run"))
        .and(body_string_contains("ids=P00001%2CP00002&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "run1"})))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/idmapping/status/run1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobStatus": "FINISHED"})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/idmapping/details/run1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "redirectURL": format!("{}/idmapping/uniprotkb/results/run1", server.uri())
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/idmapping/uniprotkb/results/run1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            ">sp|P00001|ONE_HUMAN\n{}\n>sp|P00002|TWO_HUMAN\n{}\n",
            SEQ_P00001, SEQ_P00002
        )))
        .mount(server)
        .await;
}

async fn mount_alphafold(server: &MockServer, accession: &str) {
    let entry_id = format!("AF-{}-F1", accession);
    Mock::given(method("GET"))
        .and(path(format!("/prediction/{}", accession)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "entryId": entry_id,
            "pdbUrl": format!("{}/files/{}-model_v4.pdb", server.uri(), entry_id),
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/files/{}-model_v4.pdb", entry_id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(pdb_text(1..=20)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_run_excludes_proteins_without_domains() {
    let server = MockServer::start().await;
    mount_interpro(&server).await;
    mount_uniprot(&server).await;
    mount_alphafold(&server, "P00001").await;
    mount_alphafold(&server, "P00002").await;

    Mock::given(method("GET"))
        .and(path("/prediction/NODOM1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let mut orchestrator = PipelineOrchestrator::new(config, Progress::none()).unwrap();

    let request = PipelineRequest::new(
        strings(&["P00001", "NODOM1", "P00002"]),
        strings(&["IPR000001"]),
    )
    .with_sequences()
    .with_structures()
    .with_trimming();

    let result = orchestrator.run(request).await.unwrap();
    assert_eq!(orchestrator.state(), PipelineState::Done);

    assert_eq!(result.proteins_with_domains(), 2);
    let annotations = result.annotations.as_ref().unwrap();
    assert!(!annotations.get("NODOM1").unwrap().has_domains());

    let sequences = result.sequences.as_ref().unwrap();
    let keys: Vec<String> = sequences.iter().map(|r| r.key.to_string()).collect();
    assert_eq!(keys, vec!["P00001[5-15]", "P00002[3-8]"]);
    assert_eq!(sequences.iter().next().unwrap().sequence, "YIAKQRQISFV");

    let fasta = std::fs::read_to_string(dir.path().join("domain_sequences.fasta")).unwrap();
    assert!(!fasta.contains("NODOM1"));

    let structures = result.structures.as_ref().unwrap();
    assert_eq!(structures.len(), 2);
    assert!(structures.get("NODOM1").is_none());

    let trimmed = result.trimmed.as_ref().unwrap();
    let ids: Vec<&str> = trimmed.trimmed.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["P00001_domain1", "P00002_domain1"]);
    assert_eq!(trimmed.get("P00001_domain1").unwrap().atoms_kept, 11);
    assert!(!result.trim_skipped);

    let trimmed_file = dir
        .path()
        .join("trimmed_structures/P00002_domain1_trimmed.pdb");
    let atoms = std::fs::read_to_string(trimmed_file)
        .unwrap()
        .lines()
        .filter(|l| l.starts_with("ATOM"))
        .count();
    assert_eq!(atoms, 6);
    assert!(!dir
        .path()
        .join("trimmed_structures/NODOM1_domain1_trimmed.pdb")
        .exists());

    assert!(result.summary.contains("Initial Input: 3 protein accessions"));
    assert!(result.summary.contains("2 proteins with matching domains"));
    assert!(result.summary.contains("Domain-Trimmed Structures: 2 generated"));
    assert!(result.finished_at.is_some());
}

#[tokio::test]
async fn test_trimming_skipped_when_no_structures_download() {
    let server = MockServer::start().await;
    mount_interpro(&server).await;

    Mock::given(method("GET"))
        .and(path("/prediction/P00001"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/prediction/P00002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let mut orchestrator = PipelineOrchestrator::new(config, Progress::none()).unwrap();

    let request = PipelineRequest::new(
        strings(&["P00001", "NODOM1", "P00002"]),
        strings(&["IPR000001"]),
    )
    .with_structures()
    .with_trimming();

    let result = orchestrator.run(request).await.unwrap();

    assert!(result.trim_skipped);
    assert!(result.structures.is_none());
    assert!(result.trimmed.is_none());
    assert!(result.summary.contains("skipped, no structures available"));
    assert!(!dir.path().join("trimmed_structures").exists());
    assert_eq!(orchestrator.state(), PipelineState::Done);
}

#[tokio::test]
async fn test_annotation_failure_is_wrapped_with_stage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let mut orchestrator = PipelineOrchestrator::new(config, Progress::none()).unwrap();

    let failure = orchestrator
        .run(PipelineRequest::new(strings(&["P00001"]), strings(&["IPR000001"])).with_sequences())
        .await
        .unwrap_err();

    assert_eq!(failure.error.kind(), "ProcessingError");
    assert_eq!(failure.error.root().kind(), "APIError");
    assert!(failure.to_string().starts_with("annotation stage failed"));
    assert!(failure.partial.annotations.is_none());
    assert_eq!(orchestrator.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_stop_after_annotation_keeps_partial_results() {
    let server = MockServer::start().await;
    mount_interpro(&server).await;

    Mock::given(method("POST"))
        .and(path("/idmapping/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress = Progress::new(Arc::new(move |message: &str, _percent: f64| {
        if message == "Domain annotation complete" {
            trigger.cancel();
        }
    }));

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let mut orchestrator = PipelineOrchestrator::new(config, progress)
        .unwrap()
        .with_cancellation(cancel);

    let failure = orchestrator
        .run(
            PipelineRequest::new(strings(&["P00001", "P00002"]), strings(&["IPR000001"]))
                .with_sequences(),
        )
        .await
        .unwrap_err();

    assert!(failure.is_stopped());
    assert_eq!(orchestrator.state(), PipelineState::Stopped);
    assert_eq!(failure.partial.proteins_with_domains(), 2);
    assert!(failure.partial.sequences.is_none());
    assert!(dir.path().join("domain_ranges.txt").exists());
}
