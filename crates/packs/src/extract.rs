//! Line-oriented excerpt extraction.
//!
//! Nothing here parses source code. Pattern windows are regex hits with fixed context, and
//! named blocks are found by a column-0 definition heuristic that gets confused by deeply nested
//! or unusually formatted files. Column-0 decorators and attributes (`@route(..)`, `#[derive(..)]`)
//! stacked directly on a definition belong to that definition's block. Keep it that way: pack
//! snapshots depend on the output being a pure function of line positions.

use crate::error::{PackError, Result};
use crate::ranges::{merge_ranges, LineRange};
use intake_protocol::Excerpt;
use once_cell::sync::Lazy;
use regex::Regex;

/// Lines kept by the head-slice fallback.
pub const HEAD_FALLBACK_LINES: usize = 260;

/// Hard cap on the length of a named block.
pub const BLOCK_MAX_LINES: usize = 120;

pub const HEAD_FALLBACK_PURPOSE: &str = "head (generic fallback)";

static TOP_LEVEL_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:export\s+)?(?:default\s+)?(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?(?:def|class|fn|struct|enum|trait|impl(?:<[^>]*>)?|function|interface|type|const|mod)\s+([A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("TOP_LEVEL_DEF regex should compile")
});

/// Regex hits widened by a fixed number of lines before and after.
#[derive(Debug, Clone)]
pub struct PatternWindows {
    patterns: Vec<Regex>,
    before: usize,
    after: usize,
}

impl PatternWindows {
    pub fn new(patterns: &[String], before: usize, after: usize) -> Result<Self> {
        if patterns.is_empty() {
            return Err(PackError::invalid_config(
                "pattern extraction needs at least one pattern",
            ));
        }
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| PackError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            before,
            after,
        })
    }

    fn purpose(&self) -> String {
        let joined: Vec<&str> = self.patterns.iter().map(Regex::as_str).collect();
        format!("match: {}", joined.join(" | "))
    }

    fn is_match(&self, line: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(line))
    }
}

/// How excerpts are cut out of a large file.
#[derive(Debug, Clone)]
pub enum Strategy {
    Patterns(PatternWindows),
    Blocks(Vec<String>),
}

/// Runs `strategy` over `lines`, falling back to the head slice when there is no strategy or it
/// finds nothing.
pub fn extract(lines: &[&str], strategy: Option<&Strategy>) -> Vec<Excerpt> {
    let excerpts = match strategy {
        Some(Strategy::Patterns(windows)) => pattern_windows(lines, windows),
        Some(Strategy::Blocks(names)) => named_blocks(lines, names),
        None => Vec::new(),
    };
    if excerpts.is_empty() {
        return head_slice(lines);
    }
    excerpts
}

pub fn pattern_windows(lines: &[&str], windows: &PatternWindows) -> Vec<Excerpt> {
    let len = lines.len();
    let candidates = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| windows.is_match(line))
        .map(|(idx, _)| {
            let start = idx.saturating_sub(windows.before);
            let end = idx.saturating_add(windows.after).max(idx + 1).min(len);
            LineRange::new(start, end)
        });

    let purpose = windows.purpose();
    merge_ranges(candidates)
        .into_iter()
        .map(|range| excerpt_for(lines, range, purpose.clone()))
        .collect()
}

/// One excerpt per found name, in the order the names were requested.
pub fn named_blocks(lines: &[&str], names: &[String]) -> Vec<Excerpt> {
    names
        .iter()
        .filter_map(|name| {
            let def = find_definition(lines, name)?;
            let start = attached_prefix_start(lines, def);
            let range = LineRange::new(start, block_end(lines, start, def));
            Some(excerpt_for(lines, range, format!("block: {name}")))
        })
        .collect()
}

pub fn head_slice(lines: &[&str]) -> Vec<Excerpt> {
    let end = lines.len().min(HEAD_FALLBACK_LINES);
    if end == 0 {
        return Vec::new();
    }
    vec![excerpt_for(
        lines,
        LineRange::new(0, end),
        HEAD_FALLBACK_PURPOSE.to_string(),
    )]
}

fn find_definition(lines: &[&str], name: &str) -> Option<usize> {
    lines.iter().position(|line| {
        TOP_LEVEL_DEF
            .captures(line)
            .and_then(|caps| caps.get(1))
            .is_some_and(|ident| ident.as_str() == name)
    })
}

fn is_attachment(line: &str) -> bool {
    line.starts_with('@') || line.starts_with("#[")
}

/// First line of the decorator/attribute run directly above `def`.
fn attached_prefix_start(lines: &[&str], def: usize) -> usize {
    let mut start = def;
    while start > 0 && is_attachment(lines[start - 1]) {
        start -= 1;
    }
    start
}

fn block_end(lines: &[&str], start: usize, def: usize) -> usize {
    let cap = start.saturating_add(BLOCK_MAX_LINES).min(lines.len());
    let mut end = (def + 1..cap)
        .find(|&idx| TOP_LEVEL_DEF.is_match(lines[idx]))
        .map_or(cap, |next_def| attached_prefix_start(lines, next_def).max(def + 1));
    while end > def + 1 && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    end
}

fn excerpt_for(lines: &[&str], range: LineRange, purpose: String) -> Excerpt {
    Excerpt {
        start_line: range.start + 1,
        end_line: range.end,
        content: lines[range.start..range.end].join("\n"),
        purpose,
    }
}
