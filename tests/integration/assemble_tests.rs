//! End-to-end harvest runs: crawl, fetch, enrich and store

use crate::common::{directory_page, test_config, Row};
use directory_harvest::crawler::{run_harvest, HarvestMode};
use directory_harvest::storage::{RunLog, RunStatus, SqliteStorage};
use directory_harvest::{PartitionStatus, StopReason};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0portrait-bytes\xff\xd9";

async fn mount_prediction_service(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/gender"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "gender": "female" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/ethnicity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ethnicity": "nh_white" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/image"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "age": 44, "gender": "Woman", "race": "white" })),
        )
        .mount(server)
        .await;
}

async fn mount_directory(server: &MockServer) {
    let base = server.uri();
    let adams = format!("{}/img/adams.jpg", base);
    let allen = format!("{}/img/NoImageProvided.png", base);
    let ames = format!("{}/img/ames.jpg", base);

    Mock::given(method("GET"))
        .and(path("/directory/A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(
            &[
                Row::new("Adams, Alice").image(&adams).department("Surgery"),
                Row::new("Allen, Bob").image(&allen),
            ],
            Some("/directory/A/2"),
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directory/A/2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(directory_page(
            &[Row::new("Ames, Carol").image(&ames), Row::new("Arno")],
            Some("/directory/A"),
        )))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directory/B"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/adams.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/NoImageProvided.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"placeholder".to_vec()))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/ames.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_directory(&server).await;
    mount_prediction_service(&server).await;

    let config = test_config(&server.uri(), dir.path(), &["A", "B"]);
    let summary = run_harvest(&config, "hash-1", HarvestMode::Full)
        .await
        .unwrap();

    // Partition outcomes
    assert_eq!(summary.status, "completed");
    assert_eq!(summary.partitions.len(), 2);
    assert_eq!(summary.partitions[0].status, PartitionStatus::Completed);
    assert_eq!(summary.partitions[0].stop_reason, Some(StopReason::RepeatedPage));
    assert_eq!(summary.partitions[0].records_persisted, 4);
    assert_eq!(summary.partitions[1].status, PartitionStatus::Failed);
    assert!(dir.path().join("json/PAGE_A.jsonl").exists());
    assert!(!dir.path().join("json/PAGE_B.jsonl").exists());

    // Assembly counters
    let assembly = summary.assembly.clone().unwrap();
    assert_eq!(assembly.partitions_loaded, 1);
    assert_eq!(assembly.records, 4);
    assert_eq!(assembly.images_fetched, 2);
    assert_eq!(assembly.fetch_failures, 1);
    assert_eq!(assembly.records_without_image, 1);
    assert!(dir.path().join("images/adams.jpg").exists());

    // Dataset rows
    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let rows = storage.load_dataset().unwrap();
    assert_eq!(rows.len(), 4);

    let adams = &rows[0];
    assert_eq!(adams.record.name, "Adams, Alice");
    assert_eq!(adams.directory_partition, "A");
    assert_eq!(adams.record.department.as_deref(), Some("Surgery"));
    assert_eq!(adams.name_gender.as_deref(), Some("female"));
    assert_eq!(adams.name_ethnicity.as_deref(), Some("nh_white"));
    assert_eq!(adams.image_age, Some(44));
    assert!(adams.image_path.as_deref().unwrap().ends_with("adams.jpg"));

    // Placeholder image is cached but not analyzed
    let allen = &rows[1];
    assert!(allen.image_path.is_some());
    assert_eq!(allen.image_age, None);
    assert_eq!(allen.name_gender.as_deref(), Some("female"));

    // Failed fetch keeps the record without image fields
    let ames = &rows[2];
    assert_eq!(ames.record.name, "Ames, Carol");
    assert!(ames.image_path.is_none());
    assert!(ames.image_gender.is_none());
    assert_eq!(ames.name_ethnicity.as_deref(), Some("nh_white"));

    // Single-token name gets no first-name prediction
    let arno = &rows[3];
    assert_eq!(arno.name_gender, None);
    assert_eq!(arno.name_ethnicity.as_deref(), Some("nh_white"));

    // Run log and summary file
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(storage.partition_reports(run.id).unwrap(), summary.partitions);
    let markdown = std::fs::read_to_string(&config.output.summary_path).unwrap();
    assert!(markdown.contains("| A | completed | repeated_page |"));
}

#[tokio::test]
async fn test_assemble_only_reuses_cached_images() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_directory(&server).await;

    let mut config = test_config(&server.uri(), dir.path(), &["A"]);
    config.enrichment.service_url = None;

    let crawl = run_harvest(&config, "hash-1", HarvestMode::CrawlOnly)
        .await
        .unwrap();
    assert!(crawl.assembly.is_none());
    assert_eq!(crawl.partitions.len(), 1);

    let first = run_harvest(&config, "hash-1", HarvestMode::AssembleOnly)
        .await
        .unwrap();
    assert!(first.partitions.is_empty());
    assert_eq!(first.assembly.unwrap().images_fetched, 2);

    // Image mocks expect exactly one request each across both runs
    let second = run_harvest(&config, "hash-1", HarvestMode::AssembleOnly)
        .await
        .unwrap();
    let assembly = second.assembly.unwrap();
    assert_eq!(assembly.images_fetched, 0);
    assert_eq!(assembly.images_cached, 2);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path)).unwrap();
    let rows = storage.load_dataset().unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| r.name_gender.is_none() && r.image_age.is_none()));
    assert!(rows[0].image_path.is_some());
}
