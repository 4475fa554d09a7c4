//! Git transport for remote-backed cauldrons.
//!
//! A cauldron may be synchronized with a remote Git repository holding the
//! `cauldron.json` document. This uses the system git command, which
//! automatically handles:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Personal access tokens
//! - Any authentication configured in ~/.gitconfig

use std::fs;
use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// Rewrite common authentication failures into an actionable message.
fn auth_hint(stderr: &str) -> Option<String> {
    if stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("Could not read from remote repository")
    {
        Some(
            "Authentication failed. Make sure you have access to the cauldron repository.\n\
             For private repos, ensure you have:\n\
             - SSH key added to ssh-agent\n\
             - Git credentials configured\n\
             - Personal access token set up"
                .to_string(),
        )
    } else {
        None
    }
}

fn run_git(url: &str, work_dir: Option<&Path>, args: &[&str]) -> Result<std::process::Output> {
    let mut command = Command::new("git");
    if let Some(dir) = work_dir {
        command.current_dir(dir);
    }
    let output = command.args(args).output().map_err(|e| Error::GitCommand {
        command: args.join(" "),
        url: url.to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            url: url.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(output)
}

/// Clone the cauldron repository into `target_dir`.
///
/// A full clone, not a shallow one: commits made against the cauldron are
/// pushed back to the remote.
pub fn clone(url: &str, target_dir: &Path) -> Result<()> {
    if let Some(parent) = target_dir.parent() {
        fs::create_dir_all(parent)?;
    }

    let output = Command::new("git")
        .args(["clone", url])
        .arg(target_dir)
        .output()
        .map_err(|e| Error::GitSync {
            url: url.to_string(),
            message: e.to_string(),
            hint: None,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let hint = auth_hint(&stderr);
        return Err(Error::GitSync {
            url: url.to_string(),
            message: stderr,
            hint,
        });
    }

    Ok(())
}

/// Fast-forward the local cauldron clone to the remote state.
pub fn pull(url: &str, repo_dir: &Path) -> Result<()> {
    run_git(url, Some(repo_dir), &["pull", "--ff-only"])?;
    Ok(())
}

/// Whether the working tree in `repo_dir` has uncommitted changes.
pub fn has_changes(url: &str, repo_dir: &Path) -> Result<bool> {
    let output = run_git(url, Some(repo_dir), &["status", "--porcelain"])?;
    Ok(!output.stdout.is_empty())
}

/// Commit the working tree and push to the remote.
///
/// A clean working tree is a no-op: regenerating a container at an
/// unchanged manifest leaves nothing for git to record.
pub fn commit_and_push(url: &str, repo_dir: &Path, message: &str) -> Result<()> {
    if !has_changes(url, repo_dir)? {
        return Ok(());
    }

    run_git(url, Some(repo_dir), &["add", "-A"])?;
    run_git(url, Some(repo_dir), &["commit", "-m", message])?;

    match run_git(url, Some(repo_dir), &["push"]) {
        Ok(_) => Ok(()),
        Err(Error::GitCommand { stderr, .. }) => {
            let hint = auth_hint(&stderr);
            Err(Error::GitSync {
                url: url.to_string(),
                message: format!("push rejected: {}", stderr),
                hint,
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_hint_on_permission_denied() {
        let hint = auth_hint("git@github.com: Permission denied (publickey).");
        assert!(hint.is_some());
        assert!(hint.unwrap().contains("SSH key"));
    }

    #[test]
    fn test_no_auth_hint_on_other_errors() {
        assert!(auth_hint("fatal: not a git repository").is_none());
    }

    #[test]
    fn test_run_git_reports_failed_command() {
        let dir = tempfile::tempdir().unwrap();
        // `git log` in an empty, non-repository directory must fail
        let result = run_git("https://example.com/cauldron.git", Some(dir.path()), &["log"]);
        assert!(matches!(result, Err(Error::GitCommand { .. })));
    }
}
