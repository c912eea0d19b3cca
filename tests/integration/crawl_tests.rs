//! Partition crawling against a mock directory site and recorded pages

use crate::common::{directory_page, test_config, Row};
use directory_harvest::crawler::{
    build_http_client, FixturePageSource, HtmlTableExtractor, HttpPageSource, PageCrawler,
    PartitionOrchestrator,
};
use directory_harvest::storage::{JsonLinesStore, PartitionSource};
use directory_harvest::{Partition, PartitionStatus, StopReason};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn names(records: &[directory_harvest::DirectoryRecord]) -> Vec<&str> {
    records.iter().map(|r| r.name.as_str()).collect()
}

#[tokio::test]
async fn test_http_crawl_stops_when_pager_repeats() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/directory/A",
        directory_page(
            &[Row::new("Adams, Alice").department("Surgery"), Row::new("Allen, Bob")],
            Some("/directory/A/2"),
        ),
    )
    .await;
    // Mixed page: one new name and one repeat
    mount_page(
        &server,
        "/directory/A/2",
        directory_page(
            &[Row::new("Ames, Carol"), Row::new("Adams, Alice")],
            Some("/directory/A/3"),
        ),
    )
    .await;
    // Stale pager serving the first page again
    mount_page(
        &server,
        "/directory/A/3",
        directory_page(
            &[Row::new("Adams, Alice"), Row::new("Allen, Bob")],
            Some("/directory/A/2"),
        ),
    )
    .await;

    let config = test_config(&server.uri(), dir.path(), &["A"]);
    let client = build_http_client(&config.user_agent, Duration::from_secs(5)).unwrap();
    let mut source = HttpPageSource::new(client, &config.source).unwrap();
    let mut sink = JsonLinesStore::new(config.output.partitions_dir()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();

    let reports = {
        let crawler = PageCrawler::new(&extractor, Duration::ZERO, Some(50));
        let mut orchestrator = PartitionOrchestrator::new(crawler, &mut sink, false);
        orchestrator
            .run(&mut source, &[Partition::new("A")])
            .await
            .unwrap()
    };

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.status, PartitionStatus::Completed);
    assert_eq!(report.stop_reason, Some(StopReason::RepeatedPage));
    assert_eq!(report.pages_visited, 3);
    assert_eq!(report.records_persisted, 3);
    assert_eq!(report.duplicates_dropped, 1);

    let stored = sink.read_partition(&Partition::new("A")).unwrap();
    assert_eq!(names(&stored), ["Adams, Alice", "Allen, Bob", "Ames, Carol"]);
    assert_eq!(stored[0].department.as_deref(), Some("Surgery"));
}

#[tokio::test]
async fn test_http_crawl_last_page_without_next_control() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/directory/Q",
        directory_page(&[Row::new("Quinn, Pat")], None),
    )
    .await;

    let config = test_config(&server.uri(), dir.path(), &["Q"]);
    let client = build_http_client(&config.user_agent, Duration::from_secs(5)).unwrap();
    let mut source = HttpPageSource::new(client, &config.source).unwrap();
    let mut sink = JsonLinesStore::new(config.output.partitions_dir()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();

    let crawler = PageCrawler::new(&extractor, Duration::ZERO, None);
    let reports = PartitionOrchestrator::new(crawler, &mut sink, false)
        .run(&mut source, &[Partition::new("Q")])
        .await
        .unwrap();

    assert_eq!(reports[0].stop_reason, Some(StopReason::NoNextPage));
    assert_eq!(reports[0].records_persisted, 1);
}

#[tokio::test]
async fn test_http_error_fails_only_that_partition() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/directory/X"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/directory/Y",
        directory_page(&[Row::new("Young, Yara")], None),
    )
    .await;

    let config = test_config(&server.uri(), dir.path(), &["X", "Y"]);
    let client = build_http_client(&config.user_agent, Duration::from_secs(5)).unwrap();
    let mut source = HttpPageSource::new(client, &config.source).unwrap();
    let mut sink = JsonLinesStore::new(config.output.partitions_dir()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();

    let crawler = PageCrawler::new(&extractor, Duration::ZERO, None);
    let reports = PartitionOrchestrator::new(crawler, &mut sink, false)
        .run(&mut source, &config.source.partitions())
        .await
        .unwrap();

    assert_eq!(reports[0].status, PartitionStatus::Failed);
    assert!(reports[0].error.as_deref().unwrap().contains("503"));
    assert_eq!(reports[1].status, PartitionStatus::Completed);

    assert_eq!(sink.list_partitions().unwrap(), vec![Partition::new("Y")]);
}

#[tokio::test]
async fn test_fixture_run_isolates_failure_and_closes_source() {
    let dir = TempDir::new().unwrap();
    fn page(rows: &[Row<'_>]) -> String {
        directory_page(rows, Some("next"))
    }

    let mut source = FixturePageSource::new()
        .with_partition("A", [page(&[Row::new("Adams, Alice")])])
        .with_partition(
            "B",
            [
                page(&[Row::new("Baker, Bo")]),
                page(&[Row::new("Banks, Bea")]),
            ],
        )
        .with_partition("C", [page(&[Row::new("Cole, Cy")])])
        .failing_at("B", 1)
        .wrapping();

    let mut sink = JsonLinesStore::new(dir.path()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();
    let partitions: Vec<Partition> = ["A", "B", "C"].into_iter().map(Partition::new).collect();

    let reports = {
        let crawler = PageCrawler::new(&extractor, Duration::ZERO, Some(10));
        PartitionOrchestrator::new(crawler, &mut sink, false)
            .run(&mut source, &partitions)
            .await
            .unwrap()
    };

    let statuses: Vec<_> = reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            PartitionStatus::Completed,
            PartitionStatus::Failed,
            PartitionStatus::Completed
        ]
    );
    assert!(source.is_closed());

    // Partial records of B are discarded by default
    assert_eq!(
        sink.list_partitions().unwrap(),
        vec![Partition::new("A"), Partition::new("C")]
    );
}

#[tokio::test]
async fn test_fixture_run_persists_partial_records_when_enabled() {
    let dir = TempDir::new().unwrap();
    let mut source = FixturePageSource::new()
        .with_partition(
            "B",
            [
                directory_page(&[Row::new("Baker, Bo"), Row::new("Banks, Bea")], Some("next")),
                directory_page(&[Row::new("Bell, Ben")], None),
            ],
        )
        .failing_at("B", 1);

    let mut sink = JsonLinesStore::new(dir.path()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();

    let reports = {
        let crawler = PageCrawler::new(&extractor, Duration::ZERO, None);
        PartitionOrchestrator::new(crawler, &mut sink, true)
            .run(&mut source, &[Partition::new("B")])
            .await
            .unwrap()
    };

    assert_eq!(reports[0].status, PartitionStatus::Failed);
    assert_eq!(reports[0].records_persisted, 2);

    let stored = sink.read_partition(&Partition::new("B")).unwrap();
    assert_eq!(names(&stored), ["Baker, Bo", "Banks, Bea"]);
}

#[tokio::test]
async fn test_http_crawl_resolves_relative_image_refs() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/directory/R",
        directory_page(
            &[
                Row::new("Reed, Ray").image("/photos/reed.jpg"),
                Row::new("Rios, Ana").image("https://cdn.example.org/rios.jpg"),
            ],
            None,
        ),
    )
    .await;

    let config = test_config(&server.uri(), dir.path(), &["R"]);
    let client = build_http_client(&config.user_agent, Duration::from_secs(5)).unwrap();
    let mut source = HttpPageSource::new(client, &config.source).unwrap();
    let mut sink = JsonLinesStore::new(config.output.partitions_dir()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();

    let crawler = PageCrawler::new(&extractor, Duration::ZERO, None);
    PartitionOrchestrator::new(crawler, &mut sink, false)
        .run(&mut source, &[Partition::new("R")])
        .await
        .unwrap();

    let stored = sink.read_partition(&Partition::new("R")).unwrap();
    let expected = format!("{}/photos/reed.jpg", server.uri());
    assert_eq!(stored[0].image_ref.as_deref(), Some(expected.as_str()));
    assert_eq!(
        stored[1].image_ref.as_deref(),
        Some("https://cdn.example.org/rios.jpg")
    );
}

#[tokio::test]
async fn test_http_crawl_postback_pager_ends_after_first_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/directory/P",
        directory_page(
            &[Row::new("Park, Lee"), Row::new("Pham, An")],
            Some("javascript:__doPostBack('grid','Page$Next')"),
        ),
    )
    .await;

    let config = test_config(&server.uri(), dir.path(), &["P"]);
    let client = build_http_client(&config.user_agent, Duration::from_secs(5)).unwrap();
    let mut source = HttpPageSource::new(client, &config.source).unwrap();
    let mut sink = JsonLinesStore::new(config.output.partitions_dir()).unwrap();
    let extractor = HtmlTableExtractor::new().unwrap();

    let crawler = PageCrawler::new(&extractor, Duration::ZERO, None);
    let reports = PartitionOrchestrator::new(crawler, &mut sink, false)
        .run(&mut source, &[Partition::new("P")])
        .await
        .unwrap();

    assert_eq!(reports[0].stop_reason, Some(StopReason::NoNextPage));
    assert_eq!(reports[0].pages_visited, 1);
    assert_eq!(reports[0].records_persisted, 2);
}
