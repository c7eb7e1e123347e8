//! Integration tests for the ingestion pipeline
//!
//! These tests use wiremock to stand in for the archive site and run whole
//! sessions end-to-end against a temporary data directory.

mod support;

use kyotei_archive::archive::ArchiveKind;
use kyotei_archive::convert::{program_header, results_header};
use kyotei_archive::fetch::{CircuitBreaker, CircuitState};
use kyotei_archive::pipeline::{PublishStatus, Stage};
use kyotei_archive::{KindSelection, RunMode, RunPlan, SessionOutcome};
use std::path::Path;
use std::time::Duration;
use support::{
    archive_path, date, program_archive, results_archive, HarnessBuilder, RecordingPublisher,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn results_plan(first: u32, last: u32) -> RunPlan {
    RunPlan::range(RunMode::Backfill, date(first), date(last), KindSelection::Results).unwrap()
}

fn serve(body: Vec<u8>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_bytes(body)
}

async fn mount(server: &MockServer, day: u32, kind: ArchiveKind, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(archive_path(date(day), kind)))
        .respond_with(response)
        .mount(server)
        .await;
}

fn read_rows(file: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(file).unwrap();
    let header = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|record| record.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

#[tokio::test]
async fn test_converts_and_writes_both_kinds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount(&server, 1, ArchiveKind::Result, serve(results_archive())).await;
    mount(&server, 1, ArchiveKind::Program, serve(program_archive())).await;

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    let plan = RunPlan::range(RunMode::Backfill, date(1), date(1), KindSelection::All).unwrap();
    let session = harness.pipeline.run(&plan).await;

    assert_eq!(session.outcome, SessionOutcome::Completed);
    assert_eq!(session.exit_code(), 0);
    assert_eq!(session.written, 2);
    assert_eq!(session.races_skipped, 2);

    let results_file = dir.path().join("results/2023/12/01.csv");
    let (header, rows) = read_rows(&results_file);
    assert_eq!(header, results_header());
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.len() == header.len()));
    assert_eq!(rows[0][0], "202312010101");

    let programs_file = dir.path().join("programs/2023/12/01.csv");
    let (header, rows) = read_rows(&programs_file);
    assert_eq!(header, program_header());
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.len() == header.len()));

    // Written files are handed to the publisher once, after the loop
    let calls = harness.publisher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, vec![results_file, programs_file]);
    assert_eq!(calls[0].1, "Update boatrace data: 2023-12-01");
    assert_eq!(
        session.publish,
        PublishStatus::Published {
            commit: Some("1a2b3c4".to_string())
        }
    );
}

#[tokio::test]
async fn test_second_run_skips_existing_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path(archive_path(date(1), ArchiveKind::Result)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(results_archive()))
        .expect(1)
        .mount(&server)
        .await;

    let plan = results_plan(1, 1);
    let first = HarnessBuilder::new(&server, dir.path()).build().pipeline.run(&plan).await;
    assert_eq!(first.written, 1);
    let file = dir.path().join("results/2023/12/01.csv");
    let before = std::fs::read(&file).unwrap();

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    let second = harness.pipeline.run(&plan).await;

    assert_eq!(second.skipped_existing, 1);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.written, 0);
    assert_eq!(second.exit_code(), 0);
    assert_eq!(std::fs::read(&file).unwrap(), before);
    assert!(harness.publisher.calls().is_empty());
}

#[tokio::test]
async fn test_force_rewrites_existing_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount(&server, 1, ArchiveKind::Result, serve(results_archive())).await;

    let file = dir.path().join("results/2023/12/01.csv");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "stale\n").unwrap();

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    harness.pipeline = harness.pipeline.with_force(true);
    let session = harness.pipeline.run(&results_plan(1, 1)).await;

    assert_eq!(session.skipped_existing, 0);
    assert_eq!(session.written, 1);
    assert!(std::fs::read_to_string(&file).unwrap().starts_with("レースコード,"));
}

#[tokio::test]
async fn test_missing_archive_is_clean_skip() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path(archive_path(date(1), ArchiveKind::Result)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    let session = harness.pipeline.run(&results_plan(1, 1)).await;

    assert_eq!(session.not_available, 1);
    assert_eq!(session.failed, 0);
    assert!(session.errors.is_empty());
    assert!(harness.sleeper.sleeps().is_empty());
    assert_eq!(session.outcome, SessionOutcome::Completed);
    assert_eq!(session.exit_code(), 0);
}

#[tokio::test]
async fn test_backfill_with_missing_and_corrupt_days() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount(&server, 1, ArchiveKind::Result, serve(results_archive())).await;
    mount(&server, 2, ArchiveKind::Result, ResponseTemplate::new(404)).await;
    mount(
        &server,
        3,
        ArchiveKind::Result,
        ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"),
    )
    .await;

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    let session = harness.pipeline.run(&results_plan(1, 3)).await;

    assert_eq!(session.outcome, SessionOutcome::Completed);
    assert_eq!(session.written, 1);
    assert_eq!(session.not_available, 1);
    assert_eq!(session.failed, 1);
    assert_eq!(session.errors[0].date, date(3));
    assert_eq!(session.errors[0].stage, Stage::Extract);
    assert_eq!(session.exit_code(), 1);

    assert!(dir.path().join("results/2023/12/01.csv").exists());
    assert!(!dir.path().join("results/2023/12/02.csv").exists());
    assert!(!dir.path().join("results/2023/12/03.csv").exists());
}

#[tokio::test]
async fn test_retry_ceiling_with_backoff() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path(archive_path(date(1), ArchiveKind::Result)))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    let session = harness.pipeline.run(&results_plan(1, 1)).await;

    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_secs(5), Duration::from_secs(10), Duration::from_secs(20)]
    );
    assert_eq!(session.failed, 1);
    assert_eq!(session.errors[0].stage, Stage::Fetch);
    assert_eq!(session.errors[0].retry_count, 3);
    assert_eq!(session.exit_code(), 1);
}

#[tokio::test]
async fn test_breaker_degrades_after_five_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path())
        .without_retries()
        .breaker(CircuitBreaker::new(5, 10))
        .build();
    let session = harness.pipeline.run(&results_plan(1, 7)).await;

    assert_eq!(session.outcome, SessionOutcome::Degraded);
    assert_eq!(harness.pipeline.circuit_state(), CircuitState::Degraded);
    assert_eq!(session.failed, 5);
    assert_eq!(session.not_attempted, 2);
    assert_eq!(session.exit_code(), 1);
}

#[tokio::test]
async fn test_item_in_flight_keeps_retrying_after_degrading() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(8)
        .mount(&server)
        .await;

    // four attempts per item: the streak reaches 5 on the second item's
    // first attempt and that item still uses its three retries
    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    let session = harness.pipeline.run(&results_plan(1, 5)).await;

    assert_eq!(session.outcome, SessionOutcome::Degraded);
    assert_eq!(harness.pipeline.circuit_state(), CircuitState::Degraded);
    assert_eq!(session.failed, 2);
    assert_eq!(session.errors[1].retry_count, 3);
    assert_eq!(session.not_attempted, 3);
    assert_eq!(session.exit_code(), 1);
}

#[tokio::test]
async fn test_breaker_aborts_at_default_thresholds() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(10)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path())
        .max_retries(10)
        .breaker(CircuitBreaker::default())
        .build();
    let session = harness.pipeline.run(&results_plan(1, 3)).await;

    assert_eq!(session.outcome, SessionOutcome::Aborted);
    assert_eq!(harness.pipeline.circuit_state(), CircuitState::Aborted);
    // the tenth failed attempt ends the fetch before its last retry
    assert_eq!(harness.sleeper.sleeps().len(), 9);
    assert_eq!(session.failed, 1);
    assert_eq!(session.errors[0].retry_count, 9);
    assert_eq!(session.not_attempted, 2);
    assert_eq!(session.exit_code(), 2);
    assert!(harness.publisher.calls().is_empty());
}

#[tokio::test]
async fn test_breaker_aborts_after_ten_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(10)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path())
        .without_retries()
        .breaker(CircuitBreaker::new(0, 10))
        .build();
    let session = harness.pipeline.run(&results_plan(1, 12)).await;

    assert_eq!(session.outcome, SessionOutcome::Aborted);
    assert_eq!(session.failed, 10);
    assert_eq!(session.not_attempted, 2);
    assert_eq!(session.exit_code(), 2);
    assert!(harness.publisher.calls().is_empty());
}

#[tokio::test]
async fn test_success_resets_failure_streak() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount(&server, 5, ArchiveKind::Result, serve(results_archive())).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path())
        .without_retries()
        .breaker(CircuitBreaker::new(5, 10))
        .build();
    let session = harness.pipeline.run(&results_plan(1, 9)).await;

    assert_eq!(session.outcome, SessionOutcome::Completed);
    assert_eq!(session.failed, 8);
    assert_eq!(session.written, 1);
    assert_eq!(session.not_attempted, 0);
}

#[tokio::test]
async fn test_not_available_does_not_trip_breaker() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(7)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path())
        .breaker(CircuitBreaker::new(5, 10))
        .build();
    let session = harness.pipeline.run(&results_plan(1, 7)).await;

    assert_eq!(session.outcome, SessionOutcome::Completed);
    assert_eq!(session.not_available, 7);
    assert_eq!(session.exit_code(), 0);
}

#[tokio::test]
async fn test_dry_run_skips_storage_and_publishing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount(&server, 1, ArchiveKind::Result, serve(results_archive())).await;
    mount(&server, 1, ArchiveKind::Program, serve(program_archive())).await;

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    harness.pipeline = harness.pipeline.with_dry_run(true);
    let plan = RunPlan::range(RunMode::Backfill, date(1), date(1), KindSelection::All).unwrap();
    let session = harness.pipeline.run(&plan).await;

    assert_eq!(harness.store.calls(), 0);
    assert!(harness.publisher.calls().is_empty());
    assert_eq!(session.publish, PublishStatus::NotAttempted);

    assert_eq!(session.converted, 2);
    assert_eq!(session.written, 0);
    let rows: Vec<(ArchiveKind, usize)> = session
        .completed
        .iter()
        .map(|report| (report.kind, report.rows))
        .collect();
    assert_eq!(rows, vec![(ArchiveKind::Result, 4), (ArchiveKind::Program, 3)]);
    assert_eq!(session.rows, 7);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_publish_failure_is_critical() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount(&server, 1, ArchiveKind::Result, serve(results_archive())).await;

    let mut harness = HarnessBuilder::new(&server, dir.path())
        .publisher(RecordingPublisher::failing())
        .build();
    let session = harness.pipeline.run(&results_plan(1, 1)).await;

    assert_eq!(session.written, 1);
    assert!(matches!(session.publish, PublishStatus::Failed(_)));
    assert_eq!(session.exit_code(), 2);
    // The CSV itself stays in place
    assert!(dir.path().join("results/2023/12/01.csv").exists());
}

#[tokio::test]
async fn test_stop_request_leaves_items_unattempted() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(results_archive()))
        .expect(0)
        .mount(&server)
        .await;

    let mut harness = HarnessBuilder::new(&server, dir.path()).build();
    harness.shutdown.request();
    let session = harness.pipeline.run(&results_plan(1, 3)).await;

    assert_eq!(session.outcome, SessionOutcome::Degraded);
    assert_eq!(session.not_attempted, 3);
    assert_eq!(harness.store.writes(), 0);
    assert_eq!(session.exit_code(), 1);
}
