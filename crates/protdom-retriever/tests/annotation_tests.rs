//! Annotation stage against a mock InterPro API

mod common;

use common::{interpro_page, test_config};
use protdom_retriever::annotation::AnnotationStage;
use protdom_retriever::progress::Progress;
use protdom_retriever::retry::RetryingClient;
use tempfile::TempDir;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_annotation_filters_entries_and_follows_pages() {
    let server = MockServer::start().await;
    let next = format!("{}/entry/all/protein/uniprot/P12345?cursor=page2", server.uri());

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P12345"))
        .and(query_param("page_size", "200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(interpro_page(
            &[("IPR000001", 1, 50), ("IPR099999", 1, 300), ("IPR000001", 40, 45)],
            Some(next),
        )))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P12345"))
        .and(query_param("cursor", "page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(interpro_page(&[("IPR000002", 60, 100)], None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/Q99999"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let client = RetryingClient::new(&config.http).unwrap();

    let results = AnnotationStage::new(&config, &client, Progress::none())
        .run(
            &strings(&["P12345", "Q99999"]),
            &strings(&["IPR000001", "ipr000002"]),
        )
        .await
        .unwrap();

    assert_eq!(results.proteins.len(), 2);
    let p12345 = results.get("P12345").unwrap();
    let ranges: Vec<(u32, u32, &str)> = p12345
        .layout()
        .iter()
        .map(|d| (d.start, d.end, d.entry.as_str()))
        .collect();
    assert_eq!(ranges, vec![(1, 50, "IPR000001"), (60, 100, "IPR000002")]);
    assert!(!results.get("Q99999").unwrap().has_domains());
    assert_eq!(results.accessions_with_domains(), vec!["P12345"]);

    let ranges_file = std::fs::read_to_string(dir.path().join("domain_ranges.txt")).unwrap();
    assert_eq!(ranges_file, "P12345[1-50]\nP12345[60-100]\n");
    assert!(dir.path().join("domain_analysis.tsv").exists());
    assert!(dir.path().join("interpro_results.json").exists());
}

#[tokio::test]
async fn test_annotation_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P12345"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P12345"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(interpro_page(&[("IPR000001", 5, 80)], None)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let client = RetryingClient::new(&config.http).unwrap();

    let results = AnnotationStage::new(&config, &client, Progress::none())
        .run(&strings(&["P12345"]), &strings(&["IPR000001"]))
        .await
        .unwrap();

    assert_eq!(results.domain_count(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_annotation_failure_names_accession() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/BAD1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri());
    let client = RetryingClient::new(&config.http).unwrap();

    let err = AnnotationStage::new(&config, &client, Progress::none())
        .run(&strings(&["BAD1"]), &strings(&["IPR000001"]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "APIError");
    assert!(err.to_string().contains("BAD1"));
}

#[tokio::test]
async fn test_tolerant_mode_skips_failed_accessions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/BAD1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/entry/all/protein/uniprot/P12345"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(interpro_page(&[("IPR000001", 5, 80)], None)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path(), &server.uri()).with_tolerate_partial(true);
    let client = RetryingClient::new(&config.http).unwrap();

    let results = AnnotationStage::new(&config, &client, Progress::none())
        .run(&strings(&["BAD1", "P12345"]), &strings(&["IPR000001"]))
        .await
        .unwrap();

    assert_eq!(results.failed, vec!["BAD1"]);
    assert_eq!(results.accessions_with_domains(), vec!["P12345"]);
}
