//! Turns the raw branch listing into resolved branch records.

use std::collections::{HashMap, HashSet};

use anyhow::Result;

use crate::{
    branch::{BranchRecord, parse_branch_line},
    divergence::Resolver,
    github::{PullRequest, join_pull_requests},
    repo::RepoQueries,
    tree::{Lineage, assign_parents},
};

/// All local branches in listing order, plus the default branch name.
#[derive(Debug)]
pub struct BranchSet {
    default_branch: String,
    branches: Vec<BranchRecord>,
    index: HashMap<String, usize>,
}

impl BranchSet {
    pub fn new(default_branch: &str, branches: Vec<BranchRecord>) -> Self {
        let index = branches
            .iter()
            .enumerate()
            .map(|(i, branch)| (branch.name.clone(), i))
            .collect();
        Self {
            default_branch: default_branch.to_string(),
            branches,
            index,
        }
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn get(&self, name: &str) -> Option<&BranchRecord> {
        self.index.get(name).map(|&i| &self.branches[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn records(&self) -> &[BranchRecord] {
        &self.branches
    }

    pub fn iter(&self) -> impl Iterator<Item = &BranchRecord> {
        self.branches.iter()
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }
}

pub fn collect_branches<S: AsRef<str>>(
    lines: &[S],
    default_branch: &str,
    remote: &str,
    queries: &dyn RepoQueries,
    prs: &HashMap<String, PullRequest>,
) -> Result<BranchSet> {
    let mut records: Vec<BranchRecord> = Vec::with_capacity(lines.len());
    let mut local_names = HashSet::new();
    for line in lines {
        let Some(record) = parse_branch_line(line.as_ref(), queries)? else {
            continue;
        };
        if local_names.insert(record.name.clone()) {
            records.push(record);
        } else {
            tracing::warn!(branch = %record.name, "Branch listed twice, keeping the first entry");
        }
    }

    let fallback_ref = if local_names.contains(default_branch) {
        default_branch.to_string()
    } else {
        format!("{remote}/{default_branch}")
    };
    let lineage: HashMap<String, Lineage> = assign_parents(&records, default_branch)
        .into_iter()
        .map(|placement| (placement.name.to_string(), placement.lineage))
        .collect();

    let resolver = Resolver::new(queries, default_branch, fallback_ref);
    for record in records.iter_mut() {
        let kind = lineage
            .get(&record.name)
            .copied()
            .unwrap_or(Lineage::Inferred);
        record.remote = resolver.remote_tracking(&record.name);
        record.deltas = resolver.deltas(record, kind);
    }

    join_pull_requests(&mut records, prs);
    Ok(BranchSet::new(default_branch, records))
}
