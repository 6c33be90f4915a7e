//! Read-only queries the tree needs from the repository.
//!
//! Everything that would otherwise shell out or open the object database
//! goes through [`RepoQueries`], so parsing, tree building and rendering can
//! run against canned answers.

use anyhow::Result;

use crate::branch::Deltas;

/// The configured upstream of a local branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    /// Another local branch, e.g. `feature-1`.
    Local(String),
    /// A remote-tracking branch, by short name, e.g. `origin/main`.
    Remote(String),
    /// Configured, but the ref no longer exists. Holds the short name `git
    /// branch -vv` prints for it.
    Gone(String),
}

impl Upstream {
    pub fn name(&self) -> &str {
        match self {
            Self::Local(name) | Self::Remote(name) | Self::Gone(name) => name,
        }
    }
}

pub trait RepoQueries {
    /// Upstream configured for `branch`, or `None` when there is none. A
    /// configured upstream whose ref is missing is [`Upstream::Gone`].
    fn upstream(&self, branch: &str) -> Option<Upstream>;

    /// Commits unique to `branch` (ahead) and to `reference` (behind).
    fn count_divergence(&self, reference: &str, branch: &str) -> Result<Deltas>;

    /// Short name of the remote-tracking branch with the same name as
    /// `branch`, if one exists.
    fn remote_counterpart(&self, branch: &str) -> Option<String>;

    /// Whether the content of `local` differs from `remote`.
    fn differs(&self, local: &str, remote: &str) -> Result<bool>;
}

#[cfg(test)]
pub(crate) mod fake {
    use std::collections::HashMap;

    use anyhow::{Result, anyhow};

    use super::{RepoQueries, Upstream};
    use crate::branch::Deltas;

    /// Canned answers for [`RepoQueries`]. Anything not registered behaves
    /// like a missing ref.
    #[derive(Debug, Default)]
    pub struct FakeRepo {
        upstreams: HashMap<String, Upstream>,
        divergence: HashMap<(String, String), Deltas>,
        /// branch -> whether its `origin/<branch>` counterpart is in sync
        remotes: HashMap<String, bool>,
    }

    impl FakeRepo {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn local_upstream(mut self, branch: &str, parent: &str) -> Self {
            self.upstreams
                .insert(branch.to_string(), Upstream::Local(parent.to_string()));
            self
        }

        pub fn remote_upstream(mut self, branch: &str, remote_ref: &str) -> Self {
            self.upstreams
                .insert(branch.to_string(), Upstream::Remote(remote_ref.to_string()));
            self
        }

        pub fn gone_upstream(mut self, branch: &str, upstream: &str) -> Self {
            self.upstreams
                .insert(branch.to_string(), Upstream::Gone(upstream.to_string()));
            self
        }

        pub fn divergence(
            mut self,
            reference: &str,
            branch: &str,
            ahead: usize,
            behind: usize,
        ) -> Self {
            self.divergence.insert(
                (reference.to_string(), branch.to_string()),
                Deltas::new(ahead, behind),
            );
            self
        }

        pub fn remote(mut self, branch: &str, in_sync: bool) -> Self {
            self.remotes.insert(branch.to_string(), in_sync);
            self
        }
    }

    impl RepoQueries for FakeRepo {
        fn upstream(&self, branch: &str) -> Option<Upstream> {
            self.upstreams.get(branch).cloned()
        }

        fn count_divergence(&self, reference: &str, branch: &str) -> Result<Deltas> {
            self.divergence
                .get(&(reference.to_string(), branch.to_string()))
                .copied()
                .ok_or_else(|| anyhow!("unknown revision {reference}...{branch}"))
        }

        fn remote_counterpart(&self, branch: &str) -> Option<String> {
            self.remotes
                .contains_key(branch)
                .then(|| format!("origin/{branch}"))
        }

        fn differs(&self, local: &str, _remote: &str) -> Result<bool> {
            self.remotes
                .get(local)
                .map(|in_sync| !in_sync)
                .ok_or_else(|| anyhow!("no remote for {local}"))
        }
    }
}
