use crate::publish::{PublishError, PublishOutcome, Publisher};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Output;
use tokio::process::Command;

/// Commits written files and pushes them to a remote branch
#[derive(Debug, Clone)]
pub struct GitPublisher {
    repo_dir: PathBuf,
    remote: String,
    branch: String,
}

impl GitPublisher {
    pub fn new(
        repo_dir: impl Into<PathBuf>,
        remote: impl Into<String>,
        branch: impl Into<String>,
    ) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.into(),
            branch: branch.into(),
        }
    }

    async fn git(&self, step: &'static str, args: &[&str]) -> Result<Output, PublishError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PublishError::Spawn { step, source })?;
        tracing::debug!(step, status = %output.status, "git finished");
        Ok(output)
    }

    async fn git_checked(&self, step: &'static str, args: &[&str]) -> Result<Output, PublishError> {
        let output = self.git(step, args).await?;
        if !output.status.success() {
            return Err(command_error(step, &output));
        }
        Ok(output)
    }
}

fn command_error(step: &'static str, output: &Output) -> PublishError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stderr = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };
    PublishError::Command {
        step,
        status: output.status.to_string(),
        stderr,
    }
}

/// Extracts the short hash from `[main 1a2b3c4] message`
fn commit_hash(stdout: &str) -> Option<String> {
    let start = stdout.find('[')? + 1;
    let end = start + stdout[start..].find(']')?;
    stdout[start..end].split_whitespace().last().map(str::to_string)
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(
        &self,
        paths: &[PathBuf],
        message: &str,
    ) -> Result<PublishOutcome, PublishError> {
        if paths.is_empty() {
            return Ok(PublishOutcome::Unchanged);
        }

        let mut add: Vec<&str> = vec!["add", "--"];
        add.extend(paths.iter().filter_map(|path| path.to_str()));
        self.git_checked("add", &add).await?;

        let commit = self.git("commit", &["commit", "-m", message]).await?;
        let stdout = String::from_utf8_lossy(&commit.stdout);
        if !commit.status.success() {
            if stdout.contains("nothing to commit") {
                tracing::info!(
                    event = "publish_skipped",
                    reason = "no_changes",
                    "Nothing to publish"
                );
                return Ok(PublishOutcome::Unchanged);
            }
            return Err(command_error("commit", &commit));
        }
        let hash = commit_hash(&stdout);

        let (remote, branch) = (self.remote.as_str(), self.branch.as_str());
        self.git_checked("pull", &["pull", "--rebase", remote, branch]).await?;
        self.git_checked("push", &["push", remote, branch]).await?;

        tracing::info!(
            event = "publish_success",
            commit = hash.as_deref().unwrap_or("unknown"),
            remote = %self.remote,
            branch = %self.branch,
            files = paths.len(),
            "Published archive files"
        );
        Ok(PublishOutcome::Published { commit: hash })
    }
}
