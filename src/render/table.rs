//! Column-aligned branch table.

use super::colors::{Emphasis, Painter, Segment, Style};
use crate::{
    branch::{BranchRecord, Checkout},
    collect::BranchSet,
    github::{PrState, PullRequest, ReviewDecision},
    tree::{Forest, Lineage, PrintEntry},
};

/// Powerline "branch" symbol, shown when a remote counterpart exists.
const REMOTE_GLYPH: &str = "\u{e0a0}";
const APPROVED_GLYPH: &str = "\u{f00c}";
const CHANGES_REQUESTED_GLYPH: &str = "\u{f00d}";
/// Nominal width of the deltas column, e.g. `+12:-3 `.
const DELTAS_WIDTH: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions<'a> {
    /// Leave out the Status and PR columns.
    pub concise: bool,
    pub highlight: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    #[cfg(test)]
    pub name: String,
    pub segments: Vec<Segment>,
    pub emphasis: Emphasis,
}

#[cfg(test)]
impl Row {
    /// The row without any styling.
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn segment(&self, text: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.text == text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub header: String,
    pub rule: String,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn build(
        entries: &[PrintEntry],
        set: &BranchSet,
        forest: &Forest,
        options: &TableOptions,
    ) -> Self {
        let width = branch_column_width(entries, set);
        let mut header = format!("{:<width$}  Deltas  Commit", "Branch");
        if !options.concise {
            header.push_str("   Status  PR ");
        }
        let rule = "=".repeat(header.chars().count() + 2);

        let rows = entries
            .iter()
            .filter_map(|entry| {
                let Some(record) = set.get(&entry.name) else {
                    tracing::debug!("No record for tree entry {}", entry.name);
                    return None;
                };
                let inferred = forest.lineage(&record.name) == Some(Lineage::Inferred);
                Some(build_row(entry, record, inferred, width, options))
            })
            .collect();

        Self { header, rule, rows }
    }

    pub fn render(&self, painter: &Painter) -> String {
        let mut out = String::new();
        let header = Segment::styled(&self.header, Style::Header);
        out.push_str(&painter.paint(&header, Emphasis::default()));
        out.push('\n');
        out.push_str(&self.rule);
        out.push('\n');
        for row in &self.rows {
            for segment in &row.segments {
                out.push_str(&painter.paint(segment, row.emphasis));
            }
            out.push('\n');
        }
        out
    }
}

/// Widest `prefix + name (+ " (worktree)")` plus two columns of padding.
pub fn branch_column_width(entries: &[PrintEntry], set: &BranchSet) -> usize {
    entries
        .iter()
        .map(|entry| {
            let worktree = set
                .get(&entry.name)
                .and_then(BranchRecord::worktree)
                .map_or(0, |dir| dir.chars().count() + 3);
            entry.prefix.chars().count() + entry.name.chars().count() + worktree
        })
        .max()
        .unwrap_or(0)
        + 2
}

fn build_row(
    entry: &PrintEntry,
    record: &BranchRecord,
    inferred: bool,
    width: usize,
    options: &TableOptions,
) -> Row {
    let mut segments = Vec::new();

    segments.push(match &record.remote {
        Some(remote) if !remote.in_sync => Segment::styled(REMOTE_GLYPH, Style::RemoteDrift),
        Some(_) => Segment::plain(REMOTE_GLYPH),
        None => Segment::plain(" "),
    });
    segments.push(Segment::plain(" "));

    if !entry.prefix.is_empty() {
        segments.push(if inferred {
            Segment::styled(entry.prefix.replace('─', "-"), Style::InferredTree)
        } else {
            Segment::plain(entry.prefix.clone())
        });
    }

    let mut name = record.name.clone();
    if let Some(worktree) = record.worktree() {
        name.push_str(&format!(" ({worktree})"));
    }
    let used = entry.prefix.chars().count() + name.chars().count();
    segments.push(Segment::plain(name));
    segments.push(Segment::plain(" ".repeat(width.saturating_sub(used))));

    match record.deltas {
        Some(deltas) => {
            let ahead = format!("+{}", deltas.ahead);
            let behind = format!("-{}", deltas.behind);
            let used = ahead.len() + behind.len() + 1;
            segments.push(if deltas.ahead > 0 {
                Segment::styled(ahead, Style::Ahead)
            } else {
                Segment::plain(ahead)
            });
            segments.push(Segment::plain(":"));
            segments.push(if deltas.behind > 0 {
                Segment::styled(behind, Style::Behind)
            } else {
                Segment::plain(behind)
            });
            let pad = DELTAS_WIDTH.saturating_sub(used).max(1);
            segments.push(Segment::plain(" ".repeat(pad)));
        }
        None => segments.push(Segment::plain(" ".repeat(DELTAS_WIDTH))),
    }

    segments.push(Segment::plain(record.commit.clone()));

    if !options.concise
        && let Some(pr) = &record.pull_request
    {
        segments.push(Segment::plain("  "));
        segments.extend(pr_status(pr));
        segments.push(Segment::plain("  "));
        let link = Style::Link {
            url: pr.url.clone(),
        };
        segments.push(Segment::styled(format!("#{}", pr.number), link));
    }

    Row {
        #[cfg(test)]
        name: record.name.clone(),
        segments,
        emphasis: Emphasis {
            bold: record.checkout == Checkout::Here,
            italic: matches!(record.checkout, Checkout::Elsewhere { .. }),
            inverse: options.highlight == Some(record.name.as_str()),
        },
    }
}

fn pr_status(pr: &PullRequest) -> Vec<Segment> {
    match pr.state {
        PrState::Open => {
            let decision = match pr.review_decision {
                Some(ReviewDecision::Approved) => {
                    Segment::styled(format!(" {APPROVED_GLYPH}"), Style::Approved)
                }
                Some(ReviewDecision::ChangesRequested) => Segment::styled(
                    format!(" {CHANGES_REQUESTED_GLYPH}"),
                    Style::ChangesRequested,
                ),
                // Keep the column as wide as the other states.
                _ => Segment::plain("  "),
            };
            let state = Segment::styled(pr.state.to_string(), Style::PrOpen);
            vec![state, decision]
        }
        PrState::Closed => vec![Segment::styled(pr.state.to_string(), Style::PrClosed)],
        PrState::Merged => vec![Segment::styled(pr.state.to_string(), Style::PrMerged)],
    }
}
