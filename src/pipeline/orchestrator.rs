//! Pipeline orchestrator - drives one session over a run plan
//!
//! Items are processed strictly in plan order, one at a time:
//! existence check → fetch → extract → parse → convert → write.
//! Item-level failures are recorded and the session moves on; only the
//! circuit breaker, a shutdown request or publishing end it early or
//! critically.

use crate::archive::{ArchiveExtractor, ArchiveKind, ArchiveRequest};
use crate::config::Config;
use crate::convert::{to_program_csv, to_results_csv, ConvertError, CsvTable};
use crate::fetch::{CircuitBreaker, CircuitState, FetchError, RateLimitedFetcher, TokioSleeper};
use crate::parse::{parse_program, parse_results, ParseError, ParsedFile};
use crate::pipeline::plan::{RunPlan, WorkItem};
use crate::pipeline::session::{
    ConversionSession, ItemReport, PublishStatus, SessionOutcome, Stage,
};
use crate::pipeline::shutdown::SharedShutdown;
use crate::publish::{GitPublisher, NoopPublisher, PublishOutcome, Publisher};
use crate::record::{RaceProgramRecord, RaceResultRecord};
use crate::storage::{ArchiveStore, CsvFileStore};
use crate::PipelineError;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Parsed contents of one archive
enum ParsedArchive {
    Results(ParsedFile<RaceResultRecord>),
    Programs(ParsedFile<RaceProgramRecord>),
}

impl ParsedArchive {
    fn parse(kind: ArchiveKind, text: &str, date: NaiveDate) -> Result<Self, ParseError> {
        match kind {
            ArchiveKind::Result => parse_results(text, date).map(Self::Results),
            ArchiveKind::Program => parse_program(text, date).map(Self::Programs),
        }
    }

    fn races_skipped(&self) -> usize {
        match self {
            Self::Results(parsed) => parsed.warnings.len(),
            Self::Programs(parsed) => parsed.warnings.len(),
        }
    }

    fn to_table(&self) -> Result<CsvTable, ConvertError> {
        match self {
            Self::Results(parsed) => to_results_csv(&parsed.records),
            Self::Programs(parsed) => to_program_csv(&parsed.records),
        }
    }
}

/// Main pipeline structure
pub struct Pipeline {
    base_url: Url,
    fetcher: RateLimitedFetcher,
    extractor: ArchiveExtractor,
    store: Arc<dyn ArchiveStore>,
    publisher: Arc<dyn Publisher>,
    breaker: CircuitBreaker,
    shutdown: SharedShutdown,
    dry_run: bool,
    force: bool,
    config_hash: Option<String>,
}

impl Pipeline {
    /// Creates a pipeline from its collaborators
    pub fn new(
        base_url: Url,
        fetcher: RateLimitedFetcher,
        store: Arc<dyn ArchiveStore>,
        publisher: Arc<dyn Publisher>,
        breaker: CircuitBreaker,
        shutdown: SharedShutdown,
    ) -> Self {
        Self {
            base_url,
            fetcher,
            extractor: ArchiveExtractor::new(),
            store,
            publisher,
            breaker,
            shutdown,
            dry_run: false,
            force: false,
            config_hash: None,
        }
    }

    /// Builds the production pipeline described by `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `shutdown` - Stop signal shared with the Ctrl-C handler and session timer
    ///
    /// # Returns
    ///
    /// * `Ok(Pipeline)` - Ready to run
    /// * `Err(PipelineError)` - The base URL or HTTP client could not be built
    pub fn from_config(config: &Config, shutdown: SharedShutdown) -> Result<Self, PipelineError> {
        let base_url = Url::parse(&config.source.base_url)?;
        let sleeper = Arc::new(TokioSleeper::new(shutdown.clone()));
        let fetcher = RateLimitedFetcher::from_config(&config.source, &config.fetch, sleeper)?;
        let store: Arc<dyn ArchiveStore> = Arc::new(CsvFileStore::new(&config.output.data_dir));
        let publisher: Arc<dyn Publisher> = if config.publish.enabled {
            Arc::new(GitPublisher::new(
                ".",
                config.publish.remote.clone(),
                config.publish.branch.clone(),
            ))
        } else {
            Arc::new(NoopPublisher)
        };

        Ok(Self::new(
            base_url,
            fetcher,
            store,
            publisher,
            CircuitBreaker::from_config(&config.circuit),
            shutdown,
        ))
    }

    /// Runs through conversion without writing or publishing
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Re-processes items whose CSV already exists
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Processes every item of `plan` and returns the finished session
    pub async fn run(&mut self, plan: &RunPlan) -> ConversionSession {
        let mut session = ConversionSession::new(plan, self.dry_run, self.force);
        session.config_hash = self.config_hash.clone();

        tracing::info!(
            event = "session_start",
            mode = %plan.mode(),
            start = %plan.start(),
            end = %plan.end(),
            items = plan.len(),
            dry_run = self.dry_run,
            force = self.force,
            "Starting session"
        );

        let mut outcome = SessionOutcome::Completed;
        let items = plan.items();
        for (index, item) in items.iter().enumerate() {
            if let Some(stop) = self.stop_outcome() {
                outcome = stop;
                self.skip_remaining(&mut session, &items[index..]);
                break;
            }
            self.process_item(&mut session, *item).await;
        }

        if outcome == SessionOutcome::Completed {
            if self.breaker.should_abort() {
                outcome = SessionOutcome::Aborted;
            } else if self.shutdown.is_requested() && session.not_attempted > 0 {
                outcome = SessionOutcome::Degraded;
            }
        }

        if !self.dry_run && outcome != SessionOutcome::Aborted {
            session.publish = self.publish(&session, plan).await;
        }

        session.finish(outcome);
        log_session_summary(&session);
        session
    }

    /// Why the session must stop before the next item, if it must
    fn stop_outcome(&self) -> Option<SessionOutcome> {
        if self.breaker.should_halt() {
            return Some(if self.breaker.should_abort() {
                SessionOutcome::Aborted
            } else {
                SessionOutcome::Degraded
            });
        }

        if let Some(reason) = self.shutdown.reason() {
            tracing::warn!(event = "session_stopped", reason = ?reason, "Stop requested");
            return Some(SessionOutcome::Degraded);
        }
        None
    }

    fn skip_remaining(&self, session: &mut ConversionSession, remaining: &[WorkItem]) {
        session.not_attempted += remaining.len();
        tracing::warn!(
            event = "items_not_attempted",
            count = remaining.len(),
            "Skipping remaining items"
        );
        for item in remaining {
            tracing::debug!(
                event = "item_skipped",
                date = %item.date,
                kind = %item.kind,
                reason = "not_attempted",
                "Item not attempted"
            );
        }
    }

    async fn process_item(&mut self, session: &mut ConversionSession, item: WorkItem) {
        let WorkItem { date, kind } = item;
        let started = Instant::now();

        if !self.dry_run && !self.force {
            match self.store.exists(date, kind) {
                Ok(true) => {
                    session.skipped_existing += 1;
                    let path = self.store.path_for(date, kind);
                    tracing::info!(
                        event = "item_skipped",
                        %date,
                        %kind,
                        reason = "exists",
                        path = %path.display(),
                        "CSV already exists"
                    );
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    record_failure(session, item, Stage::Store, e.to_string(), 0);
                    return;
                }
            }
        }

        let request = match ArchiveRequest::new(&self.base_url, date, kind) {
            Ok(request) => request,
            Err(e) => {
                record_failure(session, item, Stage::Fetch, e.to_string(), 0);
                return;
            }
        };

        let archive = match self.fetcher.fetch(&request, &mut self.breaker).await {
            Ok(archive) => archive,
            Err(FetchError::NotAvailable { status }) => {
                session.not_available += 1;
                tracing::info!(
                    event = "item_skipped",
                    %date,
                    %kind,
                    reason = "not_available",
                    status,
                    "Archive not published"
                );
                return;
            }
            Err(FetchError::Cancelled { attempts }) => {
                session.not_attempted += 1;
                tracing::info!(
                    event = "item_skipped",
                    %date,
                    %kind,
                    reason = "cancelled",
                    attempts,
                    "Fetch cancelled by shutdown"
                );
                return;
            }
            Err(e) => {
                let retries = e.attempts().saturating_sub(1);
                record_failure(session, item, Stage::Fetch, e.to_string(), retries);
                return;
            }
        };
        session.fetched += 1;

        let extracted = match self.extractor.extract(&archive.bytes) {
            Ok(extracted) => extracted,
            Err(e) => {
                record_failure(session, item, Stage::Extract, e.to_string(), 0);
                return;
            }
        };
        session.extracted += 1;
        if extracted.had_replacements {
            tracing::warn!(
                event = "decode_replacements",
                %date,
                %kind,
                entry = %extracted.entry_name,
                "Undecodable bytes replaced"
            );
        }

        let parsed = match ParsedArchive::parse(kind, &extracted.text, date) {
            Ok(parsed) => parsed,
            Err(e) => {
                record_failure(session, item, Stage::Parse, e.to_string(), 0);
                return;
            }
        };
        session.parsed += 1;
        session.races_skipped += parsed.races_skipped();

        let table = match parsed.to_table() {
            Ok(table) => table,
            Err(e) => {
                record_convert_failure(session, item, &e);
                return;
            }
        };
        let csv = match table.to_csv_string() {
            Ok(csv) => csv,
            Err(e) => {
                record_convert_failure(session, item, &e);
                return;
            }
        };
        session.converted += 1;

        let rows = table.row_count();
        if self.dry_run {
            tracing::info!(
                event = "item_completed",
                %date,
                %kind,
                rows,
                dry_run = true,
                duration_ms = started.elapsed().as_millis() as u64,
                "Converted (dry run, not written)"
            );
            session.record_completed(ItemReport {
                date,
                kind,
                rows,
                path: None,
            });
            return;
        }

        let path = match self.store.write(date, kind, &csv) {
            Ok(path) => path,
            Err(e) => {
                record_failure(session, item, Stage::Store, e.to_string(), 0);
                return;
            }
        };

        tracing::info!(
            event = "item_completed",
            %date,
            %kind,
            rows,
            path = %path.display(),
            attempts = archive.attempts,
            duration_ms = started.elapsed().as_millis() as u64,
            "Item completed"
        );
        session.record_completed(ItemReport {
            date,
            kind,
            rows,
            path: Some(path),
        });
    }

    async fn publish(&self, session: &ConversionSession, plan: &RunPlan) -> PublishStatus {
        let paths = session.written_paths();
        if paths.is_empty() {
            return PublishStatus::NotAttempted;
        }

        let message = format!("Update boatrace data: {}", plan.range_label());
        match self.publisher.publish(&paths, &message).await {
            Ok(PublishOutcome::Disabled) => PublishStatus::NotAttempted,
            Ok(PublishOutcome::Unchanged) => PublishStatus::Unchanged,
            Ok(PublishOutcome::Published { commit }) => PublishStatus::Published { commit },
            Err(e) => {
                tracing::error!(
                    event = "publish_failed",
                    error = %e,
                    files = paths.len(),
                    "Publishing failed"
                );
                PublishStatus::Failed(e.to_string())
            }
        }
    }
}

fn record_failure(
    session: &mut ConversionSession,
    item: WorkItem,
    stage: Stage,
    message: String,
    retry_count: u32,
) {
    tracing::warn!(
        event = "item_failed",
        date = %item.date,
        kind = %item.kind,
        %stage,
        retry_count,
        error = %message,
        "Item failed"
    );
    session.record_failure(item.date, item.kind, stage, message, retry_count);
}

/// Schema mismatches are logged at error level with a `contract_breach` marker
fn record_convert_failure(session: &mut ConversionSession, item: WorkItem, error: &ConvertError) {
    if !error.is_contract_breach() {
        record_failure(session, item, Stage::Convert, error.to_string(), 0);
        return;
    }

    tracing::error!(
        event = "item_failed",
        date = %item.date,
        kind = %item.kind,
        stage = %Stage::Convert,
        contract_breach = true,
        error = %error,
        "Converted rows do not match the CSV schema"
    );
    session.record_failure(item.date, item.kind, Stage::Convert, error.to_string(), 0);
}

fn log_session_summary(session: &ConversionSession) {
    tracing::info!(
        event = "session_summary",
        outcome = %session.outcome,
        exit_code = session.exit_code(),
        planned = session.planned,
        fetched = session.fetched,
        extracted = session.extracted,
        parsed = session.parsed,
        converted = session.converted,
        written = session.written,
        skipped_existing = session.skipped_existing,
        not_available = session.not_available,
        failed = session.failed,
        not_attempted = session.not_attempted,
        races_skipped = session.races_skipped,
        rows = session.rows,
        duration_secs = session.duration_secs().unwrap_or_default(),
        "Session finished"
    );
}
