//! readme.rs
//!
//! Rewrites the contributor section of a README from fresh statistics.
//!
//! Five kinds of marker are recognised:
//!   • `img.shields.io/badge/Commits-<n>-...` commit badge
//!   • `img.shields.io/badge/PRs-<n>-...` pull-request badge
//!   • `<b><n>% of total contributions</b>` percentage text
//!   • `pie title ... <n> ...` mermaid chart title; the last number on the
//!     line is the grand total, so `pie title 2025 commits (total: 84)` keeps
//!     its year
//!   • `"<display name>" : <n>` mermaid chart slice
//!
//! Badges and percentage text don't name their contributor; a marker belongs
//! to the first registered login that follows it in the document. Logins are
//! matched as whole tokens, so `ann` never claims a marker in front of `anna`.
//!
//! Only the digits inside a marker are ever replaced. Every marker the rewrite
//! looked for shows up in the returned report, including the ones that were
//! not found.

use crate::config::Contributor;
use crate::stats::{ContributorStats, Stats};
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const COMMIT_BADGE: &str = r"img\.shields\.io/badge/Commits-(\d+)-";
const PR_BADGE: &str = r"img\.shields\.io/badge/PRs-(\d+)-";
const PERCENTAGE: &str = r"<b>(\d+(?:\.\d+)?)% of total contributions</b>";
const CHART_TITLE: &str = r"(?m)^[ \t]*pie[ \t]+(?:showData[ \t]+)?title\b[^\n]*?(\d+)[^\n\d]*$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    CommitBadge,
    PrBadge,
    Percentage,
    ChartTitle,
    ChartEntry,
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerKind::CommitBadge => "commit badge",
            MarkerKind::PrBadge => "PR badge",
            MarkerKind::Percentage => "percentage text",
            MarkerKind::ChartTitle => "chart title",
            MarkerKind::ChartEntry => "chart entry",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Updated { from: String, to: String },
    Unchanged,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerOutcome {
    pub kind: MarkerKind,
    /// `None` for the chart title.
    pub contributor: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewriteReport {
    pub outcomes: Vec<MarkerOutcome>,
}

impl RewriteReport {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Updated { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| *o == Outcome::Unchanged)
    }

    pub fn missing(&self) -> usize {
        self.count(|o| *o == Outcome::Missing)
    }

    fn push(&mut self, kind: MarkerKind, contributor: Option<&str>, outcome: Outcome) {
        self.outcomes.push(MarkerOutcome {
            kind,
            contributor: contributor.map(str::to_string),
            outcome,
        });
    }
}

pub struct Rewrite {
    pub text: String,
    pub report: RewriteReport,
}

/// Percentage as shown in the README: two decimals at most, no trailing zeros.
pub fn format_percentage(value: f64) -> String {
    let s = format!("{value:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

struct Markers {
    commit_badge: Regex,
    pr_badge: Regex,
    percentage: Regex,
    chart_title: Regex,
}

impl Markers {
    fn new() -> Result<Self> {
        let compile =
            |p: &str| Regex::new(p).with_context(|| format!("Failed to compile marker {p}"));
        Ok(Self {
            commit_badge: compile(COMMIT_BADGE)?,
            pr_badge: compile(PR_BADGE)?,
            percentage: compile(PERCENTAGE)?,
            chart_title: compile(CHART_TITLE)?,
        })
    }
}

fn chart_entry(display_name: &str) -> Result<Regex> {
    let pattern = format!(r#""{}"[ \t]*:[ \t]*(\d+)"#, regex::escape(display_name));
    Regex::new(&pattern).with_context(|| format!("Failed to build chart entry for {display_name}"))
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Start offsets of every whole-token occurrence of `token` in `text`.
fn token_positions(text: &str, token: &str) -> Vec<usize> {
    text.match_indices(token)
        .filter(|(i, _)| {
            let before = text[..*i].chars().next_back();
            let after = text[*i + token.len()..].chars().next();
            !before.is_some_and(is_token_char) && !after.is_some_and(is_token_char)
        })
        .map(|(i, _)| i)
        .collect()
}

/// Every login occurrence as `(offset, registry index)`, sorted by offset.
fn anchors(text: &str, contributors: &[Contributor]) -> Vec<(usize, usize)> {
    let mut out: Vec<(usize, usize)> = contributors
        .iter()
        .enumerate()
        .flat_map(|(idx, c)| {
            token_positions(text, &c.login)
                .into_iter()
                .map(move |pos| (pos, idx))
        })
        .collect();
    out.sort_unstable();
    out
}

/// Collects replacements against the original text and applies them at once.
struct Editor<'a> {
    text: &'a str,
    edits: Vec<(Range<usize>, String)>,
}

impl<'a> Editor<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            edits: Vec::new(),
        }
    }

    fn plan(&mut self, ranges: &[Range<usize>], value: &str) -> Outcome {
        let Some(first) = ranges.first() else {
            return Outcome::Missing;
        };
        let from = self.text[first.clone()].to_string();

        let mut changed = false;
        for r in ranges {
            if &self.text[r.clone()] != value {
                self.edits.push((r.clone(), value.to_string()));
                changed = true;
            }
        }

        if changed {
            Outcome::Updated {
                from,
                to: value.to_string(),
            }
        } else {
            Outcome::Unchanged
        }
    }

    fn finish(mut self) -> String {
        self.edits.sort_by_key(|(r, _)| r.start);

        let mut out = String::with_capacity(self.text.len());
        let mut cursor = 0;
        for (range, value) in self.edits {
            // Overlap can't happen with the marker patterns above; keep the first edit if it does.
            if range.start < cursor {
                continue;
            }
            out.push_str(&self.text[cursor..range.start]);
            out.push_str(&value);
            cursor = range.end;
        }
        out.push_str(&self.text[cursor..]);
        out
    }
}

/// Rewrite `text` in memory. Contributors without an entry in `stats` keep
/// their markers untouched and are left out of the report.
pub fn rewrite(text: &str, stats: &Stats, contributors: &[Contributor]) -> Result<Rewrite> {
    let markers = Markers::new()?;
    let anchors = anchors(text, contributors);
    let mut editor = Editor::new(text);
    let mut report = RewriteReport::default();

    let scoped: [(MarkerKind, &Regex, fn(&ContributorStats) -> String); 3] = [
        (MarkerKind::CommitBadge, &markers.commit_badge, |s| s.commits.to_string()),
        (MarkerKind::PrBadge, &markers.pr_badge, |s| s.pull_requests.to_string()),
        (MarkerKind::Percentage, &markers.percentage, |s| {
            format_percentage(s.percentage)
        }),
    ];

    for (kind, re, value) in scoped {
        let mut owned: Vec<Vec<Range<usize>>> = vec![Vec::new(); contributors.len()];
        for caps in re.captures_iter(text) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let next = anchors.partition_point(|(pos, _)| *pos < whole.end());
            match anchors.get(next) {
                Some((_, idx)) => owned[*idx].push(digits.range()),
                None => debug!("{kind} at offset {} has no contributor after it", whole.start()),
            }
        }

        for (c, ranges) in contributors.iter().zip(&owned) {
            let Some(s) = stats.get(&c.login) else {
                continue;
            };
            let outcome = editor.plan(ranges, &value(s));
            report.push(kind, Some(&c.login), outcome);
        }
    }

    let title: Vec<Range<usize>> = markers
        .chart_title
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.range())
        .into_iter()
        .collect();
    let outcome = editor.plan(&title, &stats.total_commits.to_string());
    report.push(MarkerKind::ChartTitle, None, outcome);

    for c in contributors {
        let Some(s) = stats.get(&c.login) else {
            continue;
        };
        let re = chart_entry(&c.display_name)?;
        let ranges: Vec<Range<usize>> = re
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.range()))
            .collect();
        let outcome = editor.plan(&ranges, &s.commits.to_string());
        report.push(MarkerKind::ChartEntry, Some(&c.login), outcome);
    }

    Ok(Rewrite {
        text: editor.finish(),
        report,
    })
}

/// Rewrite the file at `path` in place. With `dry_run` nothing is written.
pub fn sync_file(
    path: &Path,
    stats: &Stats,
    contributors: &[Contributor],
    dry_run: bool,
) -> Result<RewriteReport> {
    let original = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let Rewrite { text, report } = rewrite(&original, stats, contributors)?;

    for o in &report.outcomes {
        let who = o.contributor.as_deref().unwrap_or("total");
        match &o.outcome {
            Outcome::Updated { from, to } => info!("{} for {who}: {from} -> {to}", o.kind),
            Outcome::Unchanged => debug!("{} for {who} already up to date", o.kind),
            Outcome::Missing => warn!("no {} found for {who}; left as is", o.kind),
        }
    }

    if dry_run {
        info!("dry run; {} left untouched", path.display());
    } else if text == original {
        info!("{} already up to date", path.display());
    } else {
        write_replacing(path, &text)?;
        info!("wrote {}", path.display());
    }

    Ok(report)
}

/// Write through a temp file next to the real document so an interrupted run
/// never leaves a truncated file behind. Symlinks are followed and the
/// document keeps its permissions.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let target = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let dir = target.parent().unwrap_or(Path::new("."));
    let permissions = std::fs::metadata(&target)
        .with_context(|| format!("Failed to stat {}", target.display()))?
        .permissions();

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
    tmp.as_file()
        .set_permissions(permissions)
        .with_context(|| format!("Failed to copy permissions of {}", target.display()))?;

    // On failure the temp file is dropped with the error and removed.
    tmp.persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", target.display()))?;
    Ok(())
}
