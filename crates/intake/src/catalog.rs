use crate::error::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Entrypoints recommended for one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrypointInfo {
    /// Primary entrypoint, listed before `entrypoints`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub entrypoints: Vec<String>,
}

impl EntrypointInfo {
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.path
            .as_deref()
            .into_iter()
            .chain(self.entrypoints.iter().map(String::as_str))
            .map(str::trim)
            .filter(|path| !path.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub path: String,
    #[serde(default)]
    pub why: String,
    #[serde(default = "default_fallback_priority")]
    pub priority: i64,
    #[serde(default = "default_fallback_kind")]
    pub kind: String,
}

fn default_fallback_priority() -> i64 {
    5
}

fn default_fallback_kind() -> String {
    "file".to_string()
}

/// Tag → entrypoint catalog. Tag order is the order of the source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tags: IndexMap<String, EntrypointInfo>,

    #[serde(default)]
    pub fallback: Vec<FallbackEntry>,

    /// Explicit suggestion order; the tag keys are used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_tags: Option<Vec<String>>,
}

impl Catalog {
    pub fn from_json(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn tag(&self, tag: &str) -> Option<&EntrypointInfo> {
        self.tags.get(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.fallback.is_empty()
    }
}
