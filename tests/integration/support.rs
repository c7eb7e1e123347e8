//! Shared helpers for the pipeline integration tests

use async_trait::async_trait;
use chrono::NaiveDate;
use encoding_rs::SHIFT_JIS;
use kyotei_archive::archive::ArchiveKind;
use kyotei_archive::fetch::{
    BackoffPolicy, CircuitBreaker, RateLimitedFetcher, RequestPacer, SleepOutcome, Sleeper,
};
use kyotei_archive::pipeline::{SharedShutdown, Shutdown};
use kyotei_archive::publish::{PublishError, PublishOutcome, Publisher};
use kyotei_archive::storage::{ArchiveStore, CsvFileStore, StorageResult};
use kyotei_archive::Pipeline;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::MockServer;

pub const K_FIXTURE: &str = include_str!("../fixtures/k_sample.txt");
pub const B_FIXTURE: &str = include_str!("../fixtures/b_sample.txt");

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 12, day).unwrap()
}

/// Server path of an archive, e.g. `/K/202312/k231201.lzh`
pub fn archive_path(date: NaiveDate, kind: ArchiveKind) -> String {
    format!(
        "/{}/{}/{}{}.lzh",
        kind.source_dir(),
        date.format("%Y%m"),
        kind.file_prefix(),
        date.format("%y%m%d")
    )
}

fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for byte in data {
        crc ^= *byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    crc
}

/// Builds a level-0 LZH archive holding one stored (`-lh0-`) entry
pub fn stored_archive(name: &str, payload: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(b"-lh0-");
    header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    header.extend_from_slice(&0x5781_0000u32.to_le_bytes());
    header.push(0x20);
    header.push(0x00);
    header.push(name.len() as u8);
    header.extend_from_slice(name.as_bytes());
    header.extend_from_slice(&crc16(payload).to_le_bytes());

    let checksum = header.iter().fold(0u8, |sum, b| sum.wrapping_add(*b));
    let mut archive = vec![header.len() as u8, checksum];
    archive.extend_from_slice(&header);
    archive.extend_from_slice(payload);
    archive.push(0);
    archive
}

/// Encodes a fixture the way the source publishes it: Shift_JIS with CRLF
fn source_bytes(text: &str) -> Vec<u8> {
    let crlf = text.replace('\n', "\r\n");
    let (bytes, _, had_errors) = SHIFT_JIS.encode(&crlf);
    assert!(!had_errors, "fixture must be representable in Shift_JIS");
    bytes.into_owned()
}

pub fn results_archive() -> Vec<u8> {
    stored_archive("K231201.TXT", &source_bytes(K_FIXTURE))
}

pub fn program_archive() -> Vec<u8> {
    stored_archive("B231201.TXT", &source_bytes(B_FIXTURE))
}

/// Records requested sleeps without waiting
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) -> SleepOutcome {
        self.sleeps.lock().unwrap().push(duration);
        SleepOutcome::Elapsed
    }
}

/// CSV file store that counts how often it is consulted
pub struct RecordingStore {
    inner: CsvFileStore,
    exists_calls: AtomicUsize,
    write_calls: AtomicUsize,
}

impl RecordingStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            inner: CsvFileStore::new(dir),
            exists_calls: AtomicUsize::new(0),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst) + self.write_calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

impl ArchiveStore for RecordingStore {
    fn path_for(&self, date: NaiveDate, kind: ArchiveKind) -> PathBuf {
        self.inner.path_for(date, kind)
    }

    fn exists(&self, date: NaiveDate, kind: ArchiveKind) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(date, kind)
    }

    fn write(&self, date: NaiveDate, kind: ArchiveKind, csv: &str) -> StorageResult<PathBuf> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.write(date, kind, csv)
    }
}

/// Publisher that keeps what it was handed, optionally failing
#[derive(Default)]
pub struct RecordingPublisher {
    calls: Mutex<Vec<(Vec<PathBuf>, String)>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<(Vec<PathBuf>, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<PublishOutcome, PublishError> {
        self.calls
            .lock()
            .unwrap()
            .push((paths.to_vec(), message.to_string()));
        if self.fail {
            return Err(PublishError::Command {
                step: "push",
                status: "exit status: 1".to_string(),
                stderr: "rejected".to_string(),
            });
        }
        Ok(PublishOutcome::Published {
            commit: Some("1a2b3c4".to_string()),
        })
    }
}

/// Pipeline wired to a mock server with recording collaborators
pub struct Harness {
    pub pipeline: Pipeline,
    pub store: Arc<RecordingStore>,
    pub publisher: Arc<RecordingPublisher>,
    pub sleeper: Arc<RecordingSleeper>,
    pub shutdown: SharedShutdown,
}

pub struct HarnessBuilder<'a> {
    server: &'a MockServer,
    data_dir: &'a Path,
    backoff: BackoffPolicy,
    breaker: CircuitBreaker,
    publisher: RecordingPublisher,
}

impl<'a> HarnessBuilder<'a> {
    pub fn new(server: &'a MockServer, data_dir: &'a Path) -> Self {
        Self {
            server,
            data_dir,
            backoff: BackoffPolicy::default(),
            breaker: CircuitBreaker::default(),
            publisher: RecordingPublisher::default(),
        }
    }

    /// One attempt per fetch, no retries
    pub fn without_retries(self) -> Self {
        self.max_retries(0)
    }

    /// Default 5s/30s backoff with `retries` retries per fetch
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.backoff = BackoffPolicy::new(Duration::from_secs(5), Duration::from_secs(30), retries);
        self
    }

    pub fn breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn publisher(mut self, publisher: RecordingPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn build(self) -> Harness {
        let sleeper = Arc::new(RecordingSleeper::default());
        let fetcher = RateLimitedFetcher::new(
            reqwest::Client::new(),
            RequestPacer::new(Duration::ZERO),
            self.backoff,
            sleeper.clone(),
        );
        let store = Arc::new(RecordingStore::new(self.data_dir));
        let publisher = Arc::new(self.publisher);
        let shutdown = Shutdown::shared();
        let base_url = Url::parse(&self.server.uri()).unwrap();

        let pipeline = Pipeline::new(
            base_url,
            fetcher,
            store.clone(),
            publisher.clone(),
            self.breaker,
            shutdown.clone(),
        );

        Harness {
            pipeline,
            store,
            publisher,
            sleeper,
            shutdown,
        }
    }
}
