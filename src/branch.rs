//! Branch records and the parser for `git branch -vv` lines.

use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    github::PullRequest,
    repo::{RepoQueries, Upstream},
};

/// Commits ahead of and behind some reference branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deltas {
    pub ahead: usize,
    pub behind: usize,
}

impl Deltas {
    pub fn new(ahead: usize, behind: usize) -> Self {
        Self { ahead, behind }
    }
}

/// Where a branch is checked out. A branch is checked out in at most one
/// working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checkout {
    Nowhere,
    Here,
    /// Checked out in another worktree; holds the base name of its path.
    Elsewhere { worktree: String },
}

/// The remote-tracking branch of the same name and whether it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTracking {
    pub ref_name: String,
    pub in_sync: bool,
}

#[derive(Debug, Clone)]
pub struct BranchRecord {
    pub name: String,
    pub checkout: Checkout,
    pub commit: String,
    pub summary: String,
    pub upstream: Option<Upstream>,
    /// Ahead/behind as printed in the `[upstream: ...]` segment of the listing.
    pub listed_deltas: Deltas,
    /// Ahead/behind to display. `None` hides them.
    pub deltas: Option<Deltas>,
    pub remote: Option<RemoteTracking>,
    pub pull_request: Option<PullRequest>,
}

impl BranchRecord {
    pub fn worktree(&self) -> Option<&str> {
        match &self.checkout {
            Checkout::Elsewhere { worktree } => Some(worktree),
            _ => None,
        }
    }

    /// Name of the local branch this one tracks, if it tracks one.
    pub fn local_upstream(&self) -> Option<&str> {
        match &self.upstream {
            Some(Upstream::Local(name)) => Some(name),
            _ => None,
        }
    }
}

/// Parse one line of `git branch -vv` output of the form
/// `<marker><name> <commit> [(<worktree>)] [[<upstream>: ahead N, behind M]] <summary>`.
///
/// Returns `Ok(None)` for the detached-HEAD pseudo entry. Any other line that
/// lacks a name or commit is an error.
pub fn parse_branch_line(line: &str, queries: &dyn RepoQueries) -> Result<Option<BranchRecord>> {
    let (here, elsewhere, rest) = if let Some(rest) = line.strip_prefix("* ") {
        (true, false, rest)
    } else if let Some(rest) = line.strip_prefix("+ ") {
        (false, true, rest)
    } else {
        (false, false, line)
    };

    let rest = rest.trim_start();
    if rest.starts_with('(') {
        tracing::debug!("Skipping non-branch entry {:?}", line);
        return Ok(None);
    }

    let (name, rest) = next_token(rest)
        .ok_or_else(|| anyhow!("missing branch name in {line:?}"))?;
    let (commit, mut rest) = next_token(rest)
        .ok_or_else(|| anyhow!("missing commit in {line:?}"))?;

    let checkout = if here {
        Checkout::Here
    } else if elsewhere {
        let (path, after) = rest
            .trim_start()
            .strip_prefix('(')
            .and_then(|inner| inner.split_once(')'))
            .ok_or_else(|| anyhow!("missing worktree path in {line:?}"))?;
        rest = after;
        Checkout::Elsewhere {
            worktree: base_name(path),
        }
    } else {
        Checkout::Nowhere
    };

    let upstream = queries.upstream(name);
    let mut listed_deltas = Deltas::default();
    if let Some(upstream) = &upstream
        && let Some((segment, after)) = upstream_segment(rest, upstream.name())
    {
        listed_deltas = parse_deltas(segment)
            .with_context(|| format!("parsing upstream info in {line:?}"))?;
        rest = after;
    }

    Ok(Some(BranchRecord {
        name: name.to_string(),
        checkout,
        commit: commit.to_string(),
        summary: rest.trim_start().to_string(),
        upstream,
        listed_deltas,
        deltas: None,
        remote: None,
        pull_request: None,
    }))
}

fn next_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (end > 0).then(|| (&s[..end], &s[end..]))
}

fn base_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// Splits off a leading `[<upstream>...]` segment, returning the text after
/// the upstream name and the remainder of the line. A bracket that does not
/// name `upstream` belongs to the commit summary.
fn upstream_segment<'a>(rest: &'a str, upstream: &str) -> Option<(&'a str, &'a str)> {
    let inner = rest.trim_start().strip_prefix('[')?;
    let (segment, after) = inner.split_once(']')?;
    let clauses = segment.strip_prefix(upstream)?;
    if clauses.is_empty() {
        return Some(("", after));
    }
    clauses.strip_prefix(':').map(|clauses| (clauses, after))
}

/// Parses `ahead N, behind M` in either order, either clause optional.
fn parse_deltas(clauses: &str) -> Result<Deltas> {
    let mut deltas = Deltas::default();
    for clause in clauses.split(',').map(str::trim) {
        if let Some(count) = clause.strip_prefix("ahead ") {
            deltas.ahead = count
                .trim()
                .parse()
                .with_context(|| format!("bad ahead count {count:?}"))?;
        } else if let Some(count) = clause.strip_prefix("behind ") {
            deltas.behind = count
                .trim()
                .parse()
                .with_context(|| format!("bad behind count {count:?}"))?;
        } else if !clause.is_empty() && clause != "gone" {
            bail!("unexpected upstream clause {clause:?}");
        }
    }
    Ok(deltas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::fake::FakeRepo;

    fn parse(line: &str, repo: &FakeRepo) -> BranchRecord {
        parse_branch_line(line, repo).unwrap().unwrap()
    }

    #[test]
    fn test_parse_checked_out_without_upstream() {
        let repo = FakeRepo::new();
        let record = parse("* main      1a2b3c4 Initial commit", &repo);
        assert_eq!(record.name, "main");
        assert_eq!(record.checkout, Checkout::Here);
        assert_eq!(record.commit, "1a2b3c4");
        assert_eq!(record.summary, "Initial commit");
        assert_eq!(record.upstream, None);
        assert_eq!(record.listed_deltas, Deltas::default());
    }

    #[test]
    fn test_parse_local_upstream_with_deltas() {
        let repo = FakeRepo::new().local_upstream("feature", "main");
        let line = "  feature   9f8e7d6 [main: ahead 2, behind 5] Add the thing";
        let record = parse(line, &repo);
        assert_eq!(record.checkout, Checkout::Nowhere);
        assert_eq!(record.upstream, Some(Upstream::Local("main".into())));
        assert_eq!(record.listed_deltas, Deltas::new(2, 5));
        assert_eq!(record.summary, "Add the thing");
    }

    #[test]
    fn test_parse_deltas_any_order_and_optional() {
        let repo = FakeRepo::new()
            .local_upstream("a", "main")
            .local_upstream("b", "main");
        let a = parse("  a 1111111 [main: behind 3] msg", &repo);
        assert_eq!(a.listed_deltas, Deltas::new(0, 3));
        let b = parse("  b 2222222 [main: behind 1, ahead 4] msg", &repo);
        assert_eq!(b.listed_deltas, Deltas::new(4, 1));
    }

    #[test]
    fn test_parse_upstream_in_sync_and_gone() {
        let repo = FakeRepo::new()
            .remote_upstream("main", "origin/main")
            .gone_upstream("old", "deleted");
        let main = parse("* main 1111111 [origin/main] Merge", &repo);
        assert_eq!(main.listed_deltas, Deltas::default());
        assert_eq!(main.summary, "Merge");
        let old = parse("  old 2222222 [deleted: gone] Stale", &repo);
        assert_eq!(old.upstream, Some(Upstream::Gone("deleted".into())));
        assert_eq!(old.local_upstream(), None);
        assert_eq!(old.listed_deltas, Deltas::default());
        assert_eq!(old.summary, "Stale");
    }

    #[test]
    fn test_parse_other_worktree() {
        let repo = FakeRepo::new().local_upstream("wt", "main");
        let record = parse("+ wt 3333333 (/repos/foo/bar) [main: ahead 1] Work", &repo);
        assert_eq!(
            record.checkout,
            Checkout::Elsewhere {
                worktree: "bar".into()
            }
        );
        assert_eq!(record.worktree(), Some("bar"));
        assert_eq!(record.listed_deltas, Deltas::new(1, 0));
        assert_eq!(record.summary, "Work");
    }

    #[test]
    fn test_bracket_in_summary_is_not_upstream_info() {
        let repo = FakeRepo::new();
        let record = parse("  wip 4444444 [WIP] half done", &repo);
        assert_eq!(record.summary, "[WIP] half done");
        assert_eq!(record.listed_deltas, Deltas::default());
    }

    #[test]
    fn test_detached_head_is_skipped() {
        let repo = FakeRepo::new();
        let line = "* (HEAD detached at 5555555) 5555555 msg";
        assert!(parse_branch_line(line, &repo).unwrap().is_none());
    }

    #[test]
    fn test_missing_commit_is_an_error() {
        let repo = FakeRepo::new();
        assert!(parse_branch_line("  lonely", &repo).is_err());
        assert!(parse_branch_line("", &repo).is_err());
    }

    #[test]
    fn test_bad_delta_count_is_an_error() {
        let repo = FakeRepo::new().local_upstream("x", "main");
        let line = "  x 6666666 [main: ahead lots] msg";
        assert!(parse_branch_line(line, &repo).is_err());
    }

    #[test]
    fn test_worktree_marker_without_path_is_an_error() {
        let repo = FakeRepo::new();
        assert!(parse_branch_line("+ wt 7777777 msg", &repo).is_err());
    }
}
