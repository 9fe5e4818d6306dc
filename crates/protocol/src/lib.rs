//! Wire types shared by the pack builder, the intake resolver and the HTTP surface.
//!
//! Everything here is plain data. Request JSON is checked once by [`parse_intake_request`];
//! downstream code only ever sees the typed [`IntakeRequest`].

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub mod path_filters;
mod validation;

pub use validation::{parse_intake_request, parse_intake_request_bytes, ValidationError};

pub const INTAKE_SCHEMA_VERSION: &str = "aip-1";
pub const PACK_SCHEMA_VERSION: &str = "aip-pack-1";
pub const PACK_INDEX_SCHEMA_VERSION: &str = "aip-pack-index-1";

pub const INTAKE_ROUTE: &str = "/v1/intake";
pub const PACKS_ROUTE_PREFIX: &str = "/v1/packs";
pub const HEALTH_ROUTE: &str = "/health";

/// Request header that suppresses the telemetry log line when set to `"1"`.
pub const OPT_OUT_HEADER: &str = "x-telemetry-opt-out";

/// One contiguous line span of a file.
///
/// Lines are 1-based and inclusive on both ends.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Excerpt {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub purpose: String,
}

impl Excerpt {
    pub fn chars(&self) -> usize {
        self.content.chars().count()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Code,
    Test,
    Doc,
    Config,
    Other,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub kind: FileKind,
    pub content_hash: String,
    pub byte_size: u64,
    pub line_count: usize,
    pub excerpts: Vec<Excerpt>,
}

impl FileEntry {
    /// Characters of excerpt content carried by this entry.
    pub fn content_chars(&self) -> usize {
        self.excerpts.iter().map(Excerpt::chars).sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Pack {
    pub schema_version: String,
    pub pack_id: String,
    pub repo_ref: String,
    /// Unix seconds.
    pub generated_at: u64,
    pub max_chars: usize,
    pub files: Vec<FileEntry>,
    pub notes: Vec<String>,
}

impl Pack {
    pub fn content_chars(&self) -> usize {
        self.files.iter().map(FileEntry::content_chars).sum()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PackIndexEntry {
    pub id: String,
    pub filename: String,
    pub sha256: String,
    pub byte_size: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PackIndex {
    pub schema_version: String,
    pub generated_at: u64,
    pub repo_ref: String,
    #[serde(default)]
    pub packs: Vec<PackIndexEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TaskInfo {
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct TelemetryPrefs {
    #[serde(default)]
    pub opt_out: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RepoInfo {
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IntakeRequest {
    pub schema_version: String,
    pub agent: AgentInfo,
    #[serde(default)]
    pub task: TaskInfo,
    #[serde(default)]
    pub telemetry: TelemetryPrefs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<RepoInfo>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ResolvedEntrypoint {
    pub path: String,
    pub kind: String,
    pub why: String,
    pub priority: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PackRef {
    pub id: String,
    pub url: String,
    pub sha256: String,
    pub byte_size: u64,
    pub purpose: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IntakeResponse {
    pub schema_version: String,
    pub session: SessionInfo,
    pub entrypoints: Vec<ResolvedEntrypoint>,
    pub suggested_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packs: Vec<PackRef>,
    pub notes: Vec<String>,
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            error: reason.into(),
        }
    }
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
