use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};

pub struct GitOutput {
    pub(crate) stdout: String,
}

impl GitOutput {
    pub fn output_or(self, message: impl AsRef<str>) -> Result<String> {
        if self.stdout.is_empty() {
            Err(anyhow!("{}", message.as_ref()))
        } else {
            Ok(self.stdout)
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().filter(|line| !line.trim().is_empty())
    }
}

/// Run `git` and capture stdout with trailing newlines removed. Leading
/// whitespace is kept since `git branch` uses it as the "not checked out"
/// marker.
pub(crate) fn run_git(args: &[&str]) -> Result<GitOutput> {
    tracing::debug!("Running `git {}`", args.join(" "));
    let out = Command::new("git")
        .args(args)
        .output()
        .with_context(|| format!("running git {args:?}"))?;

    if !out.status.success() {
        bail!("git {:?} failed with exit status: {}", args, out.status);
    }
    Ok(GitOutput {
        stdout: String::from_utf8_lossy(&out.stdout)
            .trim_end()
            .to_string(),
    })
}

pub(crate) fn run_git_ok(args: &[&str]) -> Result<bool> {
    tracing::debug!("Running `git {}`", args.join(" "));
    let out = Command::new("git")
        .args(args)
        .output()
        .with_context(|| format!("running git {args:?}"))?;
    Ok(out.status.success())
}

/// Fails unless the current directory is inside a git working tree.
pub(crate) fn ensure_work_tree() -> Result<()> {
    if !run_git_ok(&["rev-parse", "--is-inside-work-tree"])? {
        bail!("not inside a git working tree");
    }
    Ok(())
}

/// Raw `git branch -vv` listing, one entry per local branch.
pub(crate) fn list_branches() -> Result<Vec<String>> {
    let listing = run_git(&["branch", "-vv", "--no-color"])?;
    Ok(listing.lines().map(str::to_string).collect())
}

pub(crate) fn config_value(key: &str) -> Option<String> {
    run_git(&["config", "--get", key])
        .ok()?
        .output_or(format!("{key} is not set"))
        .ok()
        .map(|value| value.trim().to_string())
}

pub(crate) fn after_text(s: &str, needle: impl AsRef<str>) -> Option<&str> {
    let needle = needle.as_ref();
    s.find(needle).map(|pos| &s[pos + needle.len()..])
}
