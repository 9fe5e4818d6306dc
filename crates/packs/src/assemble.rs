use crate::config::PackPlan;
use crate::entry::{apply_budget, build_file_entry};
use crate::scanner::expand_entrypoints;
use intake_protocol::{FileEntry, Pack, PACK_SCHEMA_VERSION};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const PACK_NOTES: &[&str] = &[
    "Excerpt-only pack: files are partial unless an excerpt's purpose is \"full\".",
    "Open the real files before editing; line numbers refer to the repository at repo_ref.",
];

/// Builds packs from a static snapshot of a repository tree.
pub struct PackAssembler {
    root: PathBuf,
    repo_ref: String,
}

impl PackAssembler {
    pub fn new(root: impl AsRef<Path>, repo_ref: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            repo_ref: repo_ref.into(),
        }
    }

    pub fn assemble(&self, plan: &PackPlan) -> Pack {
        self.assemble_at(plan, unix_secs_now())
    }

    /// Same as [`assemble`](Self::assemble) with a fixed timestamp; the output is a pure function
    /// of the tree, the plan and `generated_at`.
    pub fn assemble_at(&self, plan: &PackPlan, generated_at: u64) -> Pack {
        let max_chars = plan.budgets.max_chars;
        let entry_budget = plan.budgets.entry_budget();
        let paths = expand_entrypoints(&self.root, &plan.entrypoints);

        let mut files: Vec<FileEntry> = Vec::new();
        let mut used = 0usize;
        for rel_path in &paths {
            if used >= max_chars {
                log::debug!(
                    "Pack {} reached max_chars={max_chars}; skipping remaining files",
                    plan.id
                );
                break;
            }

            let Some(mut entry) = build_file_entry(
                &self.root,
                rel_path,
                entry_budget,
                plan.strategy_for(rel_path),
            ) else {
                continue;
            };

            let remaining = max_chars - used;
            if entry.content_chars() > remaining {
                entry.excerpts = apply_budget(std::mem::take(&mut entry.excerpts), remaining);
                if entry.excerpts.is_empty() {
                    continue;
                }
            }

            used += entry.content_chars();
            files.push(entry);
        }

        log::info!(
            "Pack {}: {} files, {used}/{max_chars} chars",
            plan.id,
            files.len()
        );

        Pack {
            schema_version: PACK_SCHEMA_VERSION.to_string(),
            pack_id: plan.id.clone(),
            repo_ref: self.repo_ref.clone(),
            generated_at,
            max_chars,
            files,
            notes: PACK_NOTES.iter().map(|note| note.to_string()).collect(),
        }
    }
}

pub(crate) fn unix_secs_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
