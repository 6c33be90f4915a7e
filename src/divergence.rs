//! Picks the reference each branch's ahead/behind is measured against, and
//! works out whether a branch matches its remote-tracking counterpart.

use crate::{
    branch::{BranchRecord, Deltas, RemoteTracking},
    repo::RepoQueries,
    tree::Lineage,
};

pub struct Resolver<'a> {
    queries: &'a dyn RepoQueries,
    default_branch: &'a str,
    /// What branches without a local parent are compared against: the local
    /// default branch, or its remote-tracking ref when there is no local one.
    fallback_ref: String,
}

impl<'a> Resolver<'a> {
    pub fn new(
        queries: &'a dyn RepoQueries,
        default_branch: &'a str,
        fallback_ref: String,
    ) -> Self {
        Self {
            queries,
            default_branch,
            fallback_ref,
        }
    }

    /// Presence and sync state of `<remote>/<name>`.
    pub fn remote_tracking(&self, name: &str) -> Option<RemoteTracking> {
        let ref_name = self.queries.remote_counterpart(name)?;
        let in_sync = match self.queries.differs(name, &ref_name) {
            Ok(differs) => !differs,
            Err(error) => {
                tracing::warn!(branch = name, %error, "Unable to compare branch with {}", ref_name);
                false
            }
        };
        Some(RemoteTracking { ref_name, in_sync })
    }

    /// Deltas to display for `record`, placed in the tree as `lineage`.
    /// Expects `record.remote` to be filled.
    pub fn deltas(&self, record: &BranchRecord, lineage: Lineage) -> Option<Deltas> {
        if record.name == self.default_branch {
            return match &record.remote {
                Some(remote) if !remote.in_sync => {
                    Some(self.count(&remote.ref_name, &record.name))
                }
                _ => None,
            };
        }

        match lineage {
            Lineage::Tracked => Some(record.listed_deltas),
            Lineage::Root | Lineage::Inferred => Some(self.count(&self.fallback_ref, &record.name)),
        }
    }

    fn count(&self, reference: &str, branch: &str) -> Deltas {
        self.queries
            .count_divergence(reference, branch)
            .inspect_err(|error| {
                tracing::warn!(
                    branch,
                    %error,
                    "Unable to determine ahead/behind against {}",
                    reference
                )
            })
            .unwrap_or_default()
    }
}
