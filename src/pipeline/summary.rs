//! Human-readable session summary

use crate::pipeline::session::{ConversionSession, PublishStatus, SessionOutcome};
use std::fmt::Write;

/// Renders the end-of-session summary
///
/// # Arguments
///
/// * `session` - The finished session
/// * `max_errors` - How many item failures to list individually
pub fn render_summary(session: &ConversionSession, max_errors: usize) -> String {
    let mut out = String::new();

    let headline = match (session.outcome, session.dry_run) {
        (SessionOutcome::Completed, true) => "COMPLETED (dry-run - no files written)",
        (SessionOutcome::Completed, false) => "COMPLETED",
        (SessionOutcome::Degraded, _) => "DEGRADED (stopped early)",
        (SessionOutcome::Aborted, _) => "ABORTED (circuit breaker)",
    };
    let _ = writeln!(out, "=== Session Summary: {} ===\n", headline);

    let _ = writeln!(out, "Run:");
    let _ = writeln!(out, "  Mode: {}", session.mode);
    let _ = writeln!(out, "  Dates: {} to {}", session.start_date, session.end_date);
    if let Some(hash) = &session.config_hash {
        let _ = writeln!(out, "  Config hash: {}", hash);
    }
    if let Some(secs) = session.duration_secs() {
        let _ = writeln!(out, "  Duration: {:.1}s", secs);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Items ({} planned):", session.planned);
    let _ = writeln!(out, "  Files downloaded: {}", session.fetched);
    let _ = writeln!(out, "  Files decompressed: {}", session.extracted);
    let _ = writeln!(out, "  Files parsed: {}", session.parsed);
    let _ = writeln!(out, "  Files converted: {}", session.converted);
    let _ = writeln!(out, "  CSV files created: {}", session.written);
    let _ = writeln!(out, "  CSV files skipped (existing): {}", session.skipped_existing);
    let _ = writeln!(out, "  Not available: {}", session.not_available);
    let _ = writeln!(out, "  Not attempted: {}", session.not_attempted);
    let _ = writeln!(out, "  Failed: {}", session.failed);
    let _ = writeln!(out, "  Rows: {}", session.rows);
    if session.races_skipped > 0 {
        let _ = writeln!(out, "  Races skipped while parsing: {}", session.races_skipped);
    }
    let _ = writeln!(out);

    match &session.publish {
        PublishStatus::NotAttempted => {}
        PublishStatus::Unchanged => {
            let _ = writeln!(out, "Publish: nothing to commit\n");
        }
        PublishStatus::Published { commit } => {
            let _ = writeln!(
                out,
                "Publish: SUCCESS (commit {})\n",
                commit.as_deref().unwrap_or("unknown")
            );
        }
        PublishStatus::Failed(reason) => {
            let _ = writeln!(out, "Publish: FAILED ({})\n", reason);
        }
    }

    if !session.errors.is_empty() {
        let _ = writeln!(out, "Errors ({}):", session.errors.len());
        for error in session.errors.iter().take(max_errors) {
            let _ = writeln!(
                out,
                "  - {} {} [{}] {}{}",
                error.date,
                error.kind,
                error.stage,
                error.message,
                if error.retry_count > 0 {
                    format!(" (after {} retries)", error.retry_count)
                } else {
                    String::new()
                }
            );
        }
        if session.errors.len() > max_errors {
            let _ = writeln!(out, "  ... and {} more", session.errors.len() - max_errors);
        }
        let _ = writeln!(out);
    }

    let _ = write!(out, "Exit code: {}", session.exit_code());
    out
}

/// Prints the session summary to stdout
pub fn print_summary(session: &ConversionSession, max_errors: usize) {
    println!("{}", render_summary(session, max_errors));
}
