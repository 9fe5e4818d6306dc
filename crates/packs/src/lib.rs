//! # Intake Packs
//!
//! Compresses a set of repository files into one character-budgeted JSON pack per topic tag.
//!
//! ## Pipeline
//!
//! ```text
//! packs.toml
//!     │
//!     ├──> PackConfig::plans (validate ids, compile extraction rules)
//!     │
//!     ├──> expand_entrypoints (files + shallow dir listings, dedup)
//!     │
//!     ├──> build_file_entry per file
//!     │      ├─> small file: whole content, per-file budget
//!     │      └─> large file: pattern windows | named blocks | head slice
//!     │
//!     ├──> PackAssembler (global max_chars, truncate-and-stop)
//!     │
//!     └──> write_packs (<id>.json + index.json with sha256)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use intake_packs::{write_packs, PackAssembler, PackConfig};
//! use std::path::Path;
//!
//! fn main() -> intake_packs::Result<()> {
//!     let config = PackConfig::load(Path::new("packs.toml"))?;
//!     let assembler = PackAssembler::new(".", config.repo_ref.clone());
//!     let packs: Vec<_> = config.plans()?.iter().map(|p| assembler.assemble(p)).collect();
//!     let index = write_packs(Path::new("store/packs"), &packs, &config.repo_ref)?;
//!     println!("wrote {} packs", index.packs.len());
//!     Ok(())
//! }
//! ```

mod assemble;
mod config;
mod entry;
mod error;
mod extract;
mod ranges;
mod scanner;
mod writer;

pub use assemble::{PackAssembler, PACK_NOTES};
pub use config::{
    ExtractRule, PackBudgets, PackConfig, PackPlan, PackSpec, DEFAULT_INCLUDE_FULL_UNDER_BYTES,
    DEFAULT_MAX_CHARS, DEFAULT_PER_FILE_MAX_CHARS,
};
pub use entry::{apply_budget, build_file_entry, classify_kind, sha256_hex, EntryBudget};
pub use error::{PackError, Result};
pub use extract::{
    extract, head_slice, named_blocks, pattern_windows, PatternWindows, Strategy,
    BLOCK_MAX_LINES, HEAD_FALLBACK_LINES, HEAD_FALLBACK_PURPOSE,
};
pub use ranges::{merge_ranges, LineRange};
pub use scanner::expand_entrypoints;
pub use writer::{
    pack_filename, read_index, render_json, verify_packs, write_packs, VerifyIssue,
    INDEX_FILENAME,
};
