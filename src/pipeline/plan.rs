//! Which (date, kind) items a session processes, in order

use crate::archive::ArchiveKind;
use crate::PipelineError;
use chrono::{Duration, FixedOffset, NaiveDate, Utc};
use std::fmt;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Yesterday's results and today's programs, unless dates are given
    #[default]
    Daily,
    /// An explicit, inclusive date range
    Backfill,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Daily => write!(f, "daily"),
            RunMode::Backfill => write!(f, "backfill"),
        }
    }
}

/// Which archive kinds to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindSelection {
    Results,
    Programs,
    #[default]
    All,
}

impl KindSelection {
    pub fn includes(&self, kind: ArchiveKind) -> bool {
        match self {
            KindSelection::Results => kind == ArchiveKind::Result,
            KindSelection::Programs => kind == ArchiveKind::Program,
            KindSelection::All => true,
        }
    }

    fn kinds(self) -> impl Iterator<Item = ArchiveKind> {
        [ArchiveKind::Result, ArchiveKind::Program]
            .into_iter()
            .filter(move |kind| self.includes(*kind))
    }
}

/// One unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkItem {
    pub date: NaiveDate,
    pub kind: ArchiveKind,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.kind)
    }
}

/// Ordered work of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    mode: RunMode,
    start: NaiveDate,
    end: NaiveDate,
    items: Vec<WorkItem>,
}

const JST_OFFSET_SECS: i32 = 9 * 3600;

/// Today's date in Japan (UTC+9), where the archives are published
pub fn today_in_japan() -> NaiveDate {
    let now = Utc::now();
    match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(jst) => now.with_timezone(&jst).date_naive(),
        None => (now + Duration::hours(9)).date_naive(),
    }
}

impl RunPlan {
    /// Results for the day before `today` and programs for `today`
    pub fn daily(today: NaiveDate, selection: KindSelection) -> Self {
        let yesterday = today - Duration::days(1);
        let mut items = Vec::new();
        if selection.includes(ArchiveKind::Result) {
            items.push(WorkItem {
                date: yesterday,
                kind: ArchiveKind::Result,
            });
        }
        if selection.includes(ArchiveKind::Program) {
            items.push(WorkItem {
                date: today,
                kind: ArchiveKind::Program,
            });
        }

        Self {
            mode: RunMode::Daily,
            start: yesterday,
            end: today,
            items,
        }
    }

    /// Every selected kind for every date of `start..=end`, date ascending
    ///
    /// # Returns
    ///
    /// * `Ok(RunPlan)` - The range is ordered
    /// * `Err(PipelineError::InvalidRange)` - `start` is after `end`
    pub fn range(
        mode: RunMode,
        start: NaiveDate,
        end: NaiveDate,
        selection: KindSelection,
    ) -> Result<Self, PipelineError> {
        if start > end {
            return Err(PipelineError::InvalidRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        let items = start
            .iter_days()
            .take_while(|date| *date <= end)
            .flat_map(move |date| selection.kinds().map(move |kind| WorkItem { date, kind }))
            .collect();

        Ok(Self {
            mode,
            start,
            end,
            items,
        })
    }

    /// Builds the plan for the command-line inputs
    ///
    /// Backfill requires both dates. Daily mode falls back to the relative
    /// defaults, and with any explicit date it covers yesterday..today with
    /// the given bounds substituted.
    pub fn resolve(
        mode: RunMode,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        selection: KindSelection,
        today: NaiveDate,
    ) -> Result<Self, PipelineError> {
        match (mode, start, end) {
            (RunMode::Backfill, Some(start), Some(end)) => Self::range(mode, start, end, selection),
            (RunMode::Backfill, _, _) => Err(PipelineError::InvalidRange(
                "backfill mode requires both --start-date and --end-date".to_string(),
            )),
            (RunMode::Daily, None, None) => Ok(Self::daily(today, selection)),
            (RunMode::Daily, start, end) => Self::range(
                mode,
                start.unwrap_or(today - Duration::days(1)),
                end.unwrap_or(today),
                selection,
            ),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `2023-12-01` or `2023-12-01..2023-12-03`
    pub fn range_label(&self) -> String {
        if self.start == self.end {
            self.start.to_string()
        } else {
            format!("{}..{}", self.start, self.end)
        }
    }
}
