//! Publishing of newly written CSV files
//!
//! The orchestrator hands a publisher the paths written during a session,
//! only after every write has completed.

mod git;

pub use git::GitPublisher;

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while publishing
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to run git {step}: {source}")]
    Spawn {
        step: &'static str,
        source: std::io::Error,
    },

    #[error("git {step} exited with {status}: {stderr}")]
    Command {
        step: &'static str,
        status: String,
        stderr: String,
    },
}

/// What a publish call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Publishing is turned off
    Disabled,
    /// Nothing was handed over or nothing changed
    Unchanged,
    /// Files were committed and pushed; holds the short commit hash when known
    Published { commit: Option<String> },
}

/// Receives the files written by a session
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publishes `paths` with a commit message
    ///
    /// # Arguments
    ///
    /// * `paths` - Newly written CSV files
    /// * `message` - Description of the change
    async fn publish(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<PublishOutcome, PublishError>;
}

/// Publisher used when publishing is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(
        &self,
        paths: &[PathBuf],
        _message: &str,
    ) -> Result<PublishOutcome, PublishError> {
        tracing::debug!(files = paths.len(), "Publishing disabled");
        Ok(PublishOutcome::Disabled)
    }
}
