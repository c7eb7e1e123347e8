//! Session orchestration
//!
//! This module ties the stages together:
//! - [`RunPlan`]: the ordered (date, kind) items of a session
//! - [`Pipeline`]: sequential processing with the circuit breaker
//! - [`ConversionSession`]: counters, failures and the exit code
//! - [`Shutdown`]: graceful stop on Ctrl-C or session timeout

mod orchestrator;
mod plan;
mod session;
mod shutdown;
mod summary;

pub use orchestrator::Pipeline;
pub use plan::{today_in_japan, KindSelection, RunMode, RunPlan, WorkItem};
pub use session::{
    ConversionError, ConversionSession, ItemReport, PublishStatus, SessionOutcome, Stage,
};
pub use shutdown::{spawn_ctrl_c_handler, spawn_session_timer, SharedShutdown, Shutdown, StopReason};
pub use summary::{print_summary, render_summary};
