//! Git-backed worktree inspection and round integration.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use packetflow_core::api::{IntegrationOutcome, Integrator, MergeStrategy, Track, Workspace};

/// Run `git <args>` in `dir` and return trimmed stdout.
async fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = git_output(dir, args).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed in {}: {}", args.join(" "), dir.display(), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn git_output(dir: &Path, args: &[&str]) -> Result<std::process::Output> {
    tracing::debug!(dir = %dir.display(), "git {}", args.join(" "));
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("failed to run git in {}", dir.display()))
}

fn lines(s: &str) -> Vec<String> {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads branches and commits from track worktrees and records task commits.
#[derive(Debug, Clone, Default)]
pub struct GitWorkspace;

impl GitWorkspace {
    pub fn new() -> Self {
        Self
    }

    /// Stage everything and commit. Returns the new HEAD, or the current HEAD
    /// when the tree was already clean.
    pub async fn commit_all(&self, worktree: &Path, message: &str) -> Result<String> {
        run_git(worktree, &["add", "-A"]).await?;
        let status = run_git(worktree, &["status", "--porcelain"]).await?;
        if status.is_empty() {
            tracing::debug!(worktree = %worktree.display(), "nothing to commit");
        } else {
            run_git(worktree, &["commit", "-m", message]).await?;
        }
        run_git(worktree, &["rev-parse", "HEAD"]).await
    }
}

#[async_trait]
impl Workspace for GitWorkspace {
    async fn current_branch(&self, worktree: &Path) -> Result<String> {
        run_git(worktree, &["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn head_commit(&self, worktree: &Path) -> Result<String> {
        run_git(worktree, &["rev-parse", "HEAD"]).await
    }
}

/// Folds track branches into the base worktree, one `git merge` per track.
#[derive(Debug, Clone)]
pub struct GitIntegrator {
    base: PathBuf,
}

impl GitIntegrator {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    async fn unmerged_paths(&self) -> Result<Vec<String>> {
        let out = run_git(&self.base, &["diff", "--name-only", "--diff-filter=U"]).await?;
        Ok(lines(&out))
    }

    async fn merge_in_progress(&self) -> Result<bool> {
        let out = git_output(&self.base, &["rev-parse", "-q", "--verify", "MERGE_HEAD"]).await?;
        Ok(out.status.success())
    }

    fn message(track: &Track, strategy: MergeStrategy) -> String {
        match strategy {
            MergeStrategy::Merge => format!("Merge track {} ({})", track.id, track.branch_name),
            MergeStrategy::Squash => format!("Squash track {} ({})", track.id, track.branch_name),
        }
    }
}

#[async_trait]
impl Integrator for GitIntegrator {
    fn name(&self) -> &str {
        "git"
    }

    async fn integrate(&self, track: &Track, strategy: MergeStrategy) -> Result<IntegrationOutcome> {
        let message = Self::message(track, strategy);
        let branch = track.branch_name.as_str();
        let args: Vec<&str> = match strategy {
            MergeStrategy::Merge => vec!["merge", "--no-ff", "--no-edit", "-m", message.as_str(), branch],
            MergeStrategy::Squash => vec!["merge", "--squash", branch],
        };

        let output = git_output(&self.base, &args).await?;
        if !output.status.success() {
            let paths = self.unmerged_paths().await?;
            if !paths.is_empty() {
                tracing::warn!(track = %track.id, paths = ?paths, "merge conflict");
                return Ok(IntegrationOutcome::Conflict { paths });
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git {} failed in {}: {}",
                args.join(" "),
                self.base.display(),
                stderr.trim()
            );
        }

        if strategy == MergeStrategy::Squash {
            let staged = run_git(&self.base, &["diff", "--cached", "--name-only"]).await?;
            if !staged.is_empty() {
                run_git(&self.base, &["commit", "-m", message.as_str()]).await?;
            }
        }

        let commit = run_git(&self.base, &["rev-parse", "HEAD"]).await?;
        Ok(IntegrationOutcome::Clean { commit })
    }

    async fn conclude(&self, track: &Track, strategy: MergeStrategy) -> Result<IntegrationOutcome> {
        let paths = self.unmerged_paths().await?;
        if !paths.is_empty() {
            return Ok(IntegrationOutcome::Conflict { paths });
        }

        let message = Self::message(track, strategy);
        if self.merge_in_progress().await? {
            run_git(&self.base, &["commit", "--no-edit"]).await?;
        } else {
            // squash merges leave no MERGE_HEAD; the resolution sits in the index
            let staged = run_git(&self.base, &["diff", "--cached", "--name-only"]).await?;
            if !staged.is_empty() {
                run_git(&self.base, &["commit", "-m", message.as_str()]).await?;
            }
        }

        let commit = run_git(&self.base, &["rev-parse", "HEAD"]).await?;
        Ok(IntegrationOutcome::Clean { commit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    async fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .await
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    async fn init_repo(dir: &Path) {
        run_git(dir, &["init", "-q", "-b", "main"]).await.unwrap();
        run_git(dir, &["config", "user.email", "dev@example.com"]).await.unwrap();
        run_git(dir, &["config", "user.name", "dev"]).await.unwrap();
        std::fs::write(dir.join("cart.txt"), "base\n").unwrap();
        run_git(dir, &["add", "-A"]).await.unwrap();
        run_git(dir, &["commit", "-q", "-m", "init"]).await.unwrap();
    }

    fn track(id: &str, branch: &str) -> Track {
        Track {
            id: id.to_string(),
            name: id.to_string(),
            packet_ref: PathBuf::from(format!("packets/{id}.json")),
            worktree_ref: PathBuf::from("."),
            branch_name: branch.to_string(),
            depends_on: BTreeSet::new(),
        }
    }

    async fn branch_with(dir: &Path, branch: &str, content: &str) {
        run_git(dir, &["checkout", "-q", "-b", branch, "main"]).await.unwrap();
        std::fs::write(dir.join("cart.txt"), content).unwrap();
        GitWorkspace::new().commit_all(dir, branch).await.unwrap();
        run_git(dir, &["checkout", "-q", "main"]).await.unwrap();
    }

    #[tokio::test]
    async fn workspace_reports_branch_and_head() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;

        let ws = GitWorkspace::new();
        assert_eq!(ws.current_branch(dir.path()).await.unwrap(), "main");
        let head = ws.head_commit(dir.path()).await.unwrap();
        assert_eq!(head.len(), 40);

        // clean tree keeps HEAD
        assert_eq!(ws.commit_all(dir.path(), "noop").await.unwrap(), head);
    }

    #[tokio::test]
    async fn conflicting_branch_reports_paths_then_concludes() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;
        branch_with(dir.path(), "track/a", "from a\n").await;
        branch_with(dir.path(), "track/b", "from b\n").await;

        let integrator = GitIntegrator::new(dir.path());
        let a = track("a", "track/a");
        let b = track("b", "track/b");

        let first = integrator.integrate(&a, MergeStrategy::Merge).await.unwrap();
        assert!(matches!(first, IntegrationOutcome::Clean { .. }));

        let second = integrator.integrate(&b, MergeStrategy::Merge).await.unwrap();
        assert_eq!(
            second,
            IntegrationOutcome::Conflict {
                paths: vec!["cart.txt".to_string()]
            }
        );

        // still unresolved
        let again = integrator.conclude(&b, MergeStrategy::Merge).await.unwrap();
        assert!(matches!(again, IntegrationOutcome::Conflict { .. }));

        std::fs::write(dir.path().join("cart.txt"), "from a and b\n").unwrap();
        run_git(dir.path(), &["add", "cart.txt"]).await.unwrap();
        let done = integrator.conclude(&b, MergeStrategy::Merge).await.unwrap();
        assert!(matches!(done, IntegrationOutcome::Clean { .. }));
        assert!(!integrator.merge_in_progress().await.unwrap());
    }

    #[tokio::test]
    async fn squash_produces_a_single_commit() {
        if !git_available().await {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path()).await;
        branch_with(dir.path(), "track/a", "from a\n").await;

        let integrator = GitIntegrator::new(dir.path());
        let outcome = integrator
            .integrate(&track("a", "track/a"), MergeStrategy::Squash)
            .await
            .unwrap();
        let IntegrationOutcome::Clean { commit } = outcome else {
            panic!("expected a clean squash");
        };
        let parents = run_git(dir.path(), &["rev-list", "--parents", "-n", "1", commit.as_str()])
            .await
            .unwrap();
        assert_eq!(parents.split_whitespace().count(), 2);
    }
}
