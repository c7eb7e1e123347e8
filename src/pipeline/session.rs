//! Per-session state: counters, failures and the final outcome

use crate::archive::ArchiveKind;
use crate::pipeline::plan::{RunMode, RunPlan};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::path::PathBuf;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every planned item was attempted
    Completed,
    /// Fetching stopped early: degraded circuit, timeout or interrupt
    Degraded,
    /// The circuit breaker terminated the session
    Aborted,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed => write!(f, "completed"),
            SessionOutcome::Degraded => write!(f, "degraded"),
            SessionOutcome::Aborted => write!(f, "aborted"),
        }
    }
}

/// Pipeline stage at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Extract,
    Parse,
    Convert,
    Store,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Parse => "parse",
            Stage::Convert => "convert",
            Stage::Store => "store",
        };
        f.write_str(name)
    }
}

/// An item-level failure kept for the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub date: NaiveDate,
    pub kind: ArchiveKind,
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Retries spent before giving up; zero outside the fetch stage
    pub retry_count: u32,
}

/// Result of publishing the files written by a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublishStatus {
    /// Dry run, abort, or nothing written
    #[default]
    NotAttempted,
    Unchanged,
    Published { commit: Option<String> },
    Failed(String),
}

/// Per-item report, used for the summary and by dry runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    pub date: NaiveDate,
    pub kind: ArchiveKind,
    pub rows: usize,
    /// Written path; `None` in dry-run mode
    pub path: Option<PathBuf>,
}

/// Counters and outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct ConversionSession {
    pub mode: RunMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dry_run: bool,
    pub force: bool,
    pub config_hash: Option<String>,

    pub planned: usize,
    pub fetched: usize,
    pub extracted: usize,
    pub parsed: usize,
    pub converted: usize,
    pub written: usize,
    pub skipped_existing: usize,
    pub not_available: usize,
    pub failed: usize,
    pub not_attempted: usize,
    /// Races dropped by the parsers across all files
    pub races_skipped: usize,
    /// CSV rows produced (or that would have been written in a dry run)
    pub rows: usize,

    pub completed: Vec<ItemReport>,
    pub errors: Vec<ConversionError>,
    pub publish: PublishStatus,
    pub outcome: SessionOutcome,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConversionSession {
    pub fn new(plan: &RunPlan, dry_run: bool, force: bool) -> Self {
        Self {
            mode: plan.mode(),
            start_date: plan.start(),
            end_date: plan.end(),
            dry_run,
            force,
            config_hash: None,
            planned: plan.len(),
            fetched: 0,
            extracted: 0,
            parsed: 0,
            converted: 0,
            written: 0,
            skipped_existing: 0,
            not_available: 0,
            failed: 0,
            not_attempted: 0,
            races_skipped: 0,
            rows: 0,
            completed: Vec::new(),
            errors: Vec::new(),
            publish: PublishStatus::default(),
            outcome: SessionOutcome::Completed,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_failure(
        &mut self,
        date: NaiveDate,
        kind: ArchiveKind,
        stage: Stage,
        message: impl Into<String>,
        retry_count: u32,
    ) {
        self.failed += 1;
        self.errors.push(ConversionError {
            date,
            kind,
            stage,
            message: message.into(),
            timestamp: Utc::now(),
            retry_count,
        });
    }

    pub fn record_completed(&mut self, report: ItemReport) {
        self.rows += report.rows;
        if report.path.is_some() {
            self.written += 1;
        }
        self.completed.push(report);
    }

    /// Paths written during this session, in processing order
    pub fn written_paths(&self) -> Vec<PathBuf> {
        self.completed
            .iter()
            .filter_map(|report| report.path.clone())
            .collect()
    }

    pub fn finish(&mut self, outcome: SessionOutcome) {
        self.outcome = outcome;
        self.finished_at = Some(Utc::now());
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }

    /// Process exit code
    ///
    /// * `0` - Every attempted item succeeded or was cleanly skipped
    /// * `1` - Partial failure: item failures or a degraded session
    /// * `2` - Critical: circuit abort or failed publishing
    pub fn exit_code(&self) -> i32 {
        if self.outcome == SessionOutcome::Aborted
            || matches!(self.publish, PublishStatus::Failed(_))
        {
            return 2;
        }
        if self.failed > 0 || self.outcome == SessionOutcome::Degraded {
            return 1;
        }
        0
    }
}
