use crate::assemble::unix_secs_now;
use crate::entry::sha256_hex;
use crate::error::Result;
use intake_protocol::{Pack, PackIndex, PackIndexEntry, PACK_INDEX_SCHEMA_VERSION};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const INDEX_FILENAME: &str = "index.json";

/// Canonical bytes of a pack or index document.
pub fn render_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn pack_filename(pack_id: &str) -> String {
    format!("{pack_id}.json")
}

/// Writes every pack plus `index.json` into `out_dir`.
///
/// Each file is written to a temp file in `out_dir` and renamed into place.
pub fn write_packs(out_dir: &Path, packs: &[Pack], repo_ref: &str) -> Result<PackIndex> {
    std::fs::create_dir_all(out_dir)?;

    let mut entries = Vec::with_capacity(packs.len());
    for pack in packs {
        let bytes = render_json(pack)?;
        let filename = pack_filename(&pack.pack_id);
        write_atomic(&out_dir.join(&filename), &bytes)?;
        entries.push(PackIndexEntry {
            id: pack.pack_id.clone(),
            filename,
            sha256: sha256_hex(&bytes),
            byte_size: bytes.len() as u64,
        });
    }

    let index = PackIndex {
        schema_version: PACK_INDEX_SCHEMA_VERSION.to_string(),
        generated_at: unix_secs_now(),
        repo_ref: repo_ref.to_string(),
        packs: entries,
    };
    write_atomic(&out_dir.join(INDEX_FILENAME), &render_json(&index)?)?;
    Ok(index)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn read_index(pack_dir: &Path) -> Result<PackIndex> {
    let raw = std::fs::read(pack_dir.join(INDEX_FILENAME))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// A disagreement between `index.json` and the pack files on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyIssue {
    Missing {
        filename: String,
    },
    Mismatch {
        filename: String,
        expected_sha256: String,
        actual_sha256: String,
        expected_bytes: u64,
        actual_bytes: u64,
    },
}

impl std::fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyIssue::Missing { filename } => write!(f, "missing: {filename}"),
            VerifyIssue::Mismatch {
                filename,
                expected_sha256,
                actual_sha256,
                expected_bytes,
                actual_bytes,
            } => write!(
                f,
                "mismatch: {filename} (expected {expected_sha256}/{expected_bytes}B, got {actual_sha256}/{actual_bytes}B)"
            ),
        }
    }
}

/// Recomputes hash and size of every indexed pack.
pub fn verify_packs(pack_dir: &Path) -> Result<Vec<VerifyIssue>> {
    let index = read_index(pack_dir)?;
    let mut issues = Vec::new();
    for entry in &index.packs {
        let path: PathBuf = pack_dir.join(&entry.filename);
        let Ok(bytes) = std::fs::read(&path) else {
            issues.push(VerifyIssue::Missing {
                filename: entry.filename.clone(),
            });
            continue;
        };
        let actual_sha256 = sha256_hex(&bytes);
        let actual_bytes = bytes.len() as u64;
        if actual_sha256 != entry.sha256 || actual_bytes != entry.byte_size {
            issues.push(VerifyIssue::Mismatch {
                filename: entry.filename.clone(),
                expected_sha256: entry.sha256.clone(),
                actual_sha256,
                expected_bytes: entry.byte_size,
                actual_bytes,
            });
        }
    }
    Ok(issues)
}
