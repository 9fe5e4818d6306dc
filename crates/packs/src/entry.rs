use crate::extract::{extract, Strategy};
use intake_protocol::{Excerpt, FileEntry, FileKind};
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::path::Path;

pub const FULL_PURPOSE: &str = "full";
pub const FULL_TRUNCATED_PURPOSE: &str = "full (truncated by per-file budget)";
pub const TRUNCATED_SUFFIX: &str = " (truncated)";

/// Size limits applied to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryBudget {
    pub include_full_under_bytes: u64,
    pub per_file_max_chars: usize,
}

/// Builds the pack entry for one repository-relative file.
///
/// Returns `None` when the path is missing, not a regular file, unreadable, not UTF-8, or when
/// nothing fits the per-file budget.
pub fn build_file_entry(
    root: &Path,
    rel_path: &str,
    budget: EntryBudget,
    strategy: Option<&Strategy>,
) -> Option<FileEntry> {
    let full_path = root.join(rel_path);
    let meta = match std::fs::metadata(&full_path) {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => {
            log::debug!("Skipping non-regular entry {rel_path}");
            return None;
        }
        Err(_) => {
            log::debug!("Skipping missing entry {rel_path}");
            return None;
        }
    };

    let bytes = match std::fs::read(&full_path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("Failed to read {rel_path}: {err}");
            return None;
        }
    };
    let text = match std::str::from_utf8(&bytes) {
        Ok(text) => text,
        Err(_) => {
            log::warn!("Skipping non UTF-8 file {rel_path}");
            return None;
        }
    };

    let lines: Vec<&str> = text.lines().collect();
    let excerpts = if meta.len() <= budget.include_full_under_bytes {
        full_excerpt(&lines, budget.per_file_max_chars)
            .into_iter()
            .collect()
    } else {
        apply_budget(extract(&lines, strategy), budget.per_file_max_chars)
    };

    if excerpts.is_empty() {
        log::debug!("Dropping {rel_path}: no affordable content");
        return None;
    }

    Some(FileEntry {
        path: rel_path.to_string(),
        kind: classify_kind(rel_path),
        content_hash: format!("sha256:{}", sha256_hex(&bytes)),
        byte_size: meta.len(),
        line_count: lines.len(),
        excerpts,
    })
}

fn full_excerpt(lines: &[&str], max_chars: usize) -> Option<Excerpt> {
    if lines.is_empty() {
        return None;
    }
    let excerpt = Excerpt {
        start_line: 1,
        end_line: lines.len(),
        content: lines.join("\n"),
        purpose: FULL_PURPOSE.to_string(),
    };
    if excerpt.chars() <= max_chars {
        return Some(excerpt);
    }
    truncate_excerpt(excerpt, max_chars, FULL_TRUNCATED_PURPOSE.to_string())
}

/// Keeps excerpts in order until `max_chars` is spent.
///
/// The first excerpt that does not fit is cut to exactly the remaining budget and marked
/// truncated; everything after it is dropped.
pub fn apply_budget(excerpts: Vec<Excerpt>, max_chars: usize) -> Vec<Excerpt> {
    let mut kept = Vec::with_capacity(excerpts.len());
    let mut remaining = max_chars;

    for excerpt in excerpts {
        let chars = excerpt.chars();
        if chars <= remaining {
            remaining -= chars;
            kept.push(excerpt);
            continue;
        }

        let purpose = format!("{}{TRUNCATED_SUFFIX}", excerpt.purpose);
        if let Some(cut) = truncate_excerpt(excerpt, remaining, purpose) {
            kept.push(cut);
        }
        break;
    }
    kept
}

fn truncate_excerpt(excerpt: Excerpt, max_chars: usize, purpose: String) -> Option<Excerpt> {
    if max_chars == 0 {
        return None;
    }
    let content: String = excerpt.content.chars().take(max_chars).collect();
    // A cut right after a newline covers no part of the following line.
    let covered = content.trim_end_matches('\n').split('\n').count();
    Some(Excerpt {
        start_line: excerpt.start_line,
        end_line: (excerpt.start_line + covered - 1).min(excerpt.end_line),
        content,
        purpose,
    })
}

/// Coarse file classification used by pack consumers to order reading.
pub fn classify_kind(rel_path: &str) -> FileKind {
    let path = Path::new(rel_path);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let in_test_dir = path.parent().is_some_and(|parent| {
        parent.components().any(|component| {
            let name = component.as_os_str().to_string_lossy().to_lowercase();
            matches!(name.as_str(), "test" | "tests" | "__tests__" | "spec")
        })
    });
    if in_test_dir
        || stem.starts_with("test_")
        || stem.ends_with("_test")
        || stem.ends_with(".test")
        || stem.ends_with(".spec")
    {
        return FileKind::Test;
    }

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "md" | "mdx" | "rst" | "adoc" | "txt" => FileKind::Doc,
        "toml" | "yaml" | "yml" | "json" | "ini" | "cfg" | "conf" | "properties" | "env"
        | "lock" => FileKind::Config,
        "rs" | "py" | "pyi" | "js" | "mjs" | "cjs" | "jsx" | "ts" | "tsx" | "go" | "java"
        | "kt" | "kts" | "c" | "h" | "cc" | "cpp" | "hpp" | "cs" | "rb" | "swift" | "php"
        | "lua" | "sh" | "bash" | "zsh" | "ps1" | "sql" | "html" | "css" | "scss" | "vue"
        | "svelte" | "proto" => FileKind::Code,
        _ => FileKind::Other,
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode_lower(&hasher.finalize())
}

fn hex_encode_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
