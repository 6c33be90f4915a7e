//! git2-backed repository queries.
//!
//! Per-branch lookups go through libgit2 rather than spawning a `git`
//! process for each one.

use anyhow::{Context, Result, anyhow};
use git2::{BranchType, Oid, Repository};

use crate::{
    branch::Deltas,
    git::after_text,
    repo::{RepoQueries, Upstream},
};

pub struct GitRepo {
    repo: Repository,
    remote: String,
}

impl GitRepo {
    /// Open the repository containing `path`.
    pub fn discover(path: &str, remote: &str) -> Result<Self> {
        let repo = Repository::discover(path).context("Failed to open repository with git2")?;
        Ok(Self {
            repo,
            remote: remote.to_string(),
        })
    }

    /// Short name of the remote's default branch, from
    /// `refs/remotes/<remote>/HEAD`.
    pub fn default_branch(&self) -> Result<String> {
        let ref_name = format!("refs/remotes/{}/HEAD", self.remote);
        let reference = self.repo.find_reference(&ref_name).with_context(|| {
            format!(
                "Failed to find {ref_name}; try `git remote set-head {} --auto`",
                self.remote
            )
        })?;
        let target = reference
            .symbolic_target()
            .ok_or_else(|| anyhow!("{} is not a symbolic reference", ref_name))?;
        let branch = after_text(target, format!("refs/remotes/{}/", self.remote))
            .filter(|branch| !branch.is_empty())
            .ok_or_else(|| anyhow!("Unexpected target {target} for {ref_name}"))?;
        tracing::debug!("Default branch is {}", branch);
        Ok(branch.to_string())
    }

    pub fn remote_url(&self) -> Option<String> {
        let remote = self.repo.find_remote(&self.remote).ok()?;
        remote.url().map(str::to_string)
    }

    fn commit_oid(&self, ref_name: &str) -> Result<Oid> {
        let commit = self
            .repo
            .revparse_single(ref_name)
            .and_then(|obj| obj.peel_to_commit())
            .with_context(|| format!("Failed to resolve ref: {}", ref_name))?;
        Ok(commit.id())
    }

    /// Short upstream name from `branch.<name>.remote` and `.merge`, as `git
    /// branch -vv` prints it. Works when the upstream ref no longer exists.
    fn configured_upstream(&self, branch: &str) -> Option<String> {
        let mut config = self.repo.config().ok()?;
        let config = config.snapshot().ok()?;
        let remote = config.get_string(&format!("branch.{branch}.remote")).ok()?;
        let merge = config.get_string(&format!("branch.{branch}.merge")).ok()?;
        let merge = merge.strip_prefix("refs/heads/").unwrap_or(&merge);
        if remote == "." {
            Some(merge.to_string())
        } else {
            Some(format!("{remote}/{merge}"))
        }
    }

    fn tree_oid(&self, ref_name: &str) -> Result<Oid> {
        let tree = self
            .repo
            .revparse_single(ref_name)
            .and_then(|obj| obj.peel_to_tree())
            .with_context(|| format!("Failed to resolve tree of: {}", ref_name))?;
        Ok(tree.id())
    }
}

impl RepoQueries for GitRepo {
    fn upstream(&self, branch: &str) -> Option<Upstream> {
        tracing::debug!("git2: upstream of {}", branch);
        let local_branch = self.repo.find_branch(branch, BranchType::Local).ok()?;
        let Ok(upstream) = local_branch.upstream() else {
            return self.configured_upstream(branch).map(Upstream::Gone);
        };
        let name = upstream.name().ok()??.to_string();
        if upstream.get().is_remote() {
            Some(Upstream::Remote(name))
        } else {
            Some(Upstream::Local(name))
        }
    }

    fn count_divergence(&self, reference: &str, branch: &str) -> Result<Deltas> {
        tracing::debug!("git2: ahead/behind {}...{}", reference, branch);
        let (ahead, behind) = self
            .repo
            .graph_ahead_behind(self.commit_oid(branch)?, self.commit_oid(reference)?)
            .with_context(|| {
                format!("Failed to count commits between {reference} and {branch}")
            })?;
        Ok(Deltas::new(ahead, behind))
    }

    fn remote_counterpart(&self, branch: &str) -> Option<String> {
        let name = format!("{}/{}", self.remote, branch);
        self.repo
            .find_branch(&name, BranchType::Remote)
            .ok()
            .map(|_| name)
    }

    fn differs(&self, local: &str, remote: &str) -> Result<bool> {
        tracing::debug!("git2: diff {} {}", remote, local);
        Ok(self.tree_oid(local)? != self.tree_oid(remote)?)
    }
}
