//! Repository context captured when a work session starts.
//!
//! Detection is optional: any failure (not a repository, `git` missing)
//! yields `None` and the session starts without context.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitContext {
    pub branch: String,
    pub commit: String,
    /// Paths with uncommitted changes at session start.
    #[serde(default)]
    pub modified_files: Vec<String>,
}

impl GitContext {
    pub fn is_dirty(&self) -> bool {
        !self.modified_files.is_empty()
    }
}

pub trait GitContextProvider {
    fn detect(&self, dir: &Path) -> Option<GitContext>;
}

/// Reads context by shelling out to the `git` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    fn run(dir: &Path, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| tracing::debug!("failed to run git: {e}"))
            .ok()?;
        if !output.status.success() {
            tracing::debug!("git {:?} returned {:?}", args, output.status);
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitContextProvider for GitCli {
    fn detect(&self, dir: &Path) -> Option<GitContext> {
        let branch = Self::run(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let commit = Self::run(dir, &["rev-parse", "--short", "HEAD"])?;
        let status = Self::run(dir, &["status", "--porcelain"]).unwrap_or_default();
        Some(GitContext {
            branch: branch.trim().to_string(),
            commit: commit.trim().to_string(),
            modified_files: parse_porcelain(&status),
        })
    }
}

/// Extract paths from `git status --porcelain` (v1) output.
fn parse_porcelain(status: &str) -> Vec<String> {
    status
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let path = &line[3..];
            // Renames are reported as "old -> new".
            match path.split_once(" -> ") {
                Some((_, new)) => new.to_string(),
                None => path.to_string(),
            }
        })
        .collect()
}
