//! Parent/child forest of local branches and its depth-first print order.

use std::collections::{HashMap, HashSet};

use crate::{branch::BranchRecord, collect::BranchSet};

/// How a branch's parent was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lineage {
    /// The default branch, at the top of the tree.
    Root,
    /// Tracks a local branch that exists.
    Tracked,
    /// No usable local upstream, so the default branch is assumed.
    Inferred,
}

/// Children lists keep the order branches appeared in the listing.
#[derive(Debug, Default)]
pub struct Forest {
    roots: Vec<String>,
    children: HashMap<String, Vec<String>>,
    lineage: HashMap<String, Lineage>,
}

/// One printed line of the tree: box-drawing prefix plus branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintEntry {
    pub prefix: String,
    pub name: String,
}

/// Where one branch goes in the tree. A `None` parent is a top-level entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement<'a> {
    pub name: &'a str,
    pub parent: Option<&'a str>,
    pub lineage: Lineage,
}

/// Decide every branch's parent, in listing order.
///
/// A branch tracking a local branch that exists hangs under it. Anything
/// else, including a branch whose upstream chain loops, hangs under the
/// default branch, or goes on top when there is no local default branch.
pub fn assign_parents<'a>(
    records: &'a [BranchRecord],
    default_branch: &'a str,
) -> Vec<Placement<'a>> {
    let local: HashSet<&str> = records.iter().map(|record| record.name.as_str()).collect();
    let assumed = local.contains(default_branch).then_some(default_branch);

    let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
    let mut lineage: HashMap<&str, Lineage> = HashMap::new();
    for record in records {
        let name = record.name.as_str();
        let (parent, kind) = if name == default_branch {
            (None, Lineage::Root)
        } else {
            match record.local_upstream() {
                Some(upstream) if local.contains(upstream) => (Some(upstream), Lineage::Tracked),
                Some(upstream) => {
                    tracing::debug!(branch = name, "Upstream {} is not a local branch", upstream);
                    (assumed, Lineage::Inferred)
                }
                None => (assumed, Lineage::Inferred),
            }
        };
        parents.insert(name, parent);
        lineage.insert(name, kind);
    }

    // Stale tracking config can form a loop that never reaches the top.
    for record in records {
        let name = record.name.as_str();
        if !reaches_top(name, &parents) {
            tracing::warn!(
                branch = name,
                "Upstream chain loops back on itself, assuming {}",
                default_branch
            );
            parents.insert(name, assumed);
            lineage.insert(name, Lineage::Inferred);
        }
    }

    records
        .iter()
        .map(|record| {
            let name = record.name.as_str();
            Placement {
                name,
                parent: parents.get(name).copied().flatten(),
                lineage: lineage.get(name).copied().unwrap_or(Lineage::Inferred),
            }
        })
        .collect()
}

impl Forest {
    pub fn build(set: &BranchSet) -> Self {
        let mut forest = Forest::default();
        for placement in assign_parents(set.records(), set.default_branch()) {
            let name = placement.name.to_string();
            match placement.parent {
                Some(parent) => forest
                    .children
                    .entry(parent.to_string())
                    .or_default()
                    .push(name.clone()),
                None => forest.roots.push(name.clone()),
            }
            forest.lineage.insert(name, placement.lineage);
        }
        forest
    }

    #[cfg(test)]
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn children(&self, name: &str) -> &[String] {
        self.children
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub fn parent(&self, name: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|(_, children)| children.iter().any(|child| child == name))
            .map(|(parent, _)| parent.as_str())
    }

    pub fn lineage(&self, name: &str) -> Option<Lineage> {
        self.lineage.get(name).copied()
    }

    /// Pre-order walk. Top-level branches get no connector; below them each
    /// branch gets `├──` or, if it is the last sibling, `└──`.
    pub fn linearize(&self) -> Vec<PrintEntry> {
        let mut entries = Vec::new();
        self.collect_entries(&self.roots, "", true, &mut entries);
        entries
    }

    fn collect_entries(
        &self,
        siblings: &[String],
        prefix: &str,
        top: bool,
        entries: &mut Vec<PrintEntry>,
    ) {
        for (index, name) in siblings.iter().enumerate() {
            let (connector, continuation) = if top {
                ("", " ")
            } else if index + 1 < siblings.len() {
                ("├──", "│  ")
            } else {
                ("└──", "   ")
            };
            entries.push(PrintEntry {
                prefix: format!("{prefix}{connector}"),
                name: name.clone(),
            });
            let child_prefix = format!("{prefix}{continuation}");
            self.collect_entries(self.children(name), &child_prefix, false, entries);
        }
    }
}

fn reaches_top(name: &str, parents: &HashMap<&str, Option<&str>>) -> bool {
    let mut current = name;
    for _ in 0..=parents.len() {
        match parents.get(current).copied().flatten() {
            Some(parent) => current = parent,
            None => return true,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{collect::collect_branches, repo::fake::FakeRepo};

    fn build(repo: &FakeRepo, lines: &[&str]) -> (BranchSet, Forest) {
        let set = collect_branches(lines, "main", "origin", repo, &HashMap::new()).unwrap();
        let forest = Forest::build(&set);
        (set, forest)
    }

    fn printed(forest: &Forest) -> Vec<String> {
        forest
            .linearize()
            .into_iter()
            .map(|entry| format!("{}{}", entry.prefix, entry.name))
            .collect()
    }

    #[test]
    fn test_single_default_branch() {
        let (_, forest) = build(&FakeRepo::new(), &["* main 1111111 msg"]);
        assert_eq!(forest.roots(), ["main"]);
        assert!(forest.children("main").is_empty());
        assert_eq!(forest.lineage("main"), Some(Lineage::Root));
        assert_eq!(printed(&forest), vec!["main"]);
    }

    #[test]
    fn test_feature_tracking_default() {
        let repo = FakeRepo::new().local_upstream("feature", "main");
        let lines = [
            "* main 1111111 msg",
            "  feature 2222222 [main: ahead 2] msg",
        ];
        let (_, forest) = build(&repo, &lines);
        assert_eq!(forest.roots(), ["main"]);
        assert_eq!(forest.children("main"), ["feature"]);
        assert_eq!(forest.lineage("feature"), Some(Lineage::Tracked));
        assert_eq!(printed(&forest), vec!["main", " └──feature"]);
    }

    #[test]
    fn test_stacked_chain() {
        let repo = FakeRepo::new()
            .local_upstream("feature2", "feature1")
            .local_upstream("feature1", "main")
            .local_upstream("side", "main");
        let lines = [
            "  feature2 3333333 [feature1: ahead 1] msg",
            "  feature1 2222222 [main: ahead 1] msg",
            "* main     1111111 msg",
            "  side     4444444 [main: ahead 1] msg",
        ];
        let (_, forest) = build(&repo, &lines);
        assert_eq!(forest.parent("feature2"), Some("feature1"));
        assert_eq!(forest.parent("feature1"), Some("main"));
        assert_eq!(forest.parent("main"), None);
        assert_eq!(
            printed(&forest),
            vec!["main", " ├──feature1", " │  └──feature2", " └──side"]
        );
    }

    #[test]
    fn test_stacked_chain_as_last_child() {
        let repo = FakeRepo::new()
            .local_upstream("feature2", "feature1")
            .local_upstream("feature1", "main");
        let lines = [
            "* main     1111111 msg",
            "  feature1 2222222 [main: ahead 1] msg",
            "  feature2 3333333 [feature1: ahead 1] msg",
        ];
        let (_, forest) = build(&repo, &lines);
        assert_eq!(
            printed(&forest),
            vec!["main", " └──feature1", "    └──feature2"]
        );
    }

    #[test]
    fn test_no_upstream_is_inferred_child_of_default() {
        let repo = FakeRepo::new()
            .remote_upstream("pushed", "origin/pushed")
            .divergence("main", "loose", 0, 0)
            .divergence("main", "pushed", 0, 0);
        let lines = [
            "* main 1111111 msg",
            "  loose 2222222 msg",
            "  pushed 3333333 [origin/pushed] msg",
        ];
        let (_, forest) = build(&repo, &lines);
        assert_eq!(forest.children("main"), ["loose", "pushed"]);
        assert_eq!(forest.lineage("loose"), Some(Lineage::Inferred));
        assert_eq!(forest.lineage("pushed"), Some(Lineage::Inferred));
    }

    #[test]
    fn test_stale_upstream_falls_back_to_default() {
        let repo = FakeRepo::new()
            .gone_upstream("orphan", "deleted")
            .divergence("main", "orphan", 1, 0);
        let lines = ["* main 1111111 msg", "  orphan 2222222 [deleted: gone] msg"];
        let (_, forest) = build(&repo, &lines);
        assert_eq!(forest.parent("orphan"), Some("main"));
        assert_eq!(forest.lineage("orphan"), Some(Lineage::Inferred));
        assert!(forest.children("deleted").is_empty());
    }

    #[test]
    fn test_upstream_cycle_is_broken() {
        let repo = FakeRepo::new()
            .local_upstream("a", "b")
            .local_upstream("b", "a");
        let lines = [
            "* main 1111111 msg",
            "  a 2222222 [b] msg",
            "  b 3333333 [a] msg",
        ];
        let (set, forest) = build(&repo, &lines);
        assert_eq!(forest.parent("a"), Some("main"));
        assert_eq!(forest.lineage("a"), Some(Lineage::Inferred));
        assert_eq!(forest.parent("b"), Some("a"));
        assert_eq!(printed(&forest), vec!["main", " └──a", "    └──b"]);
        assert_eq!(forest.linearize().len(), set.len());
    }

    #[test]
    fn test_every_branch_has_exactly_one_parent() {
        let repo = FakeRepo::new()
            .local_upstream("b", "a")
            .local_upstream("c", "a")
            .local_upstream("d", "c")
            .divergence("main", "a", 0, 0);
        let lines = [
            "  a 1111111 msg",
            "  b 2222222 [a] msg",
            "  c 3333333 [a] msg",
            "  d 4444444 [c] msg",
            "* main 5555555 msg",
        ];
        let (set, forest) = build(&repo, &lines);
        for record in set.iter() {
            let claims = std::iter::once(forest.roots())
                .chain(set.iter().map(|parent| forest.children(&parent.name)))
                .filter(|children| children.contains(&record.name))
                .count();
            assert_eq!(claims, 1, "{} claimed {} times", record.name, claims);
        }
        assert_eq!(forest.roots(), ["main"]);
    }

    #[test]
    fn test_missing_default_branch_puts_branches_on_top() {
        let repo = FakeRepo::new()
            .local_upstream("child", "topic")
            .divergence("origin/main", "topic", 0, 0);
        let lines = ["* topic 1111111 msg", "  child 2222222 [topic] msg"];
        let (_, forest) = build(&repo, &lines);
        assert_eq!(forest.roots(), ["topic"]);
        assert_eq!(printed(&forest), vec!["topic", " └──child"]);
    }

    #[test]
    fn test_linearize_is_deterministic() {
        let repo = FakeRepo::new()
            .local_upstream("x", "main")
            .local_upstream("y", "main")
            .local_upstream("z", "y");
        let lines = [
            "* main 1 msg",
            "  x 2 [main] msg",
            "  y 3 [main] msg",
            "  z 4 [y] msg",
        ];
        let (_, forest) = build(&repo, &lines);
        let first = forest.linearize();
        for _ in 0..10 {
            assert_eq!(forest.linearize(), first);
        }
    }
}
