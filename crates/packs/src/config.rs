use crate::entry::EntryBudget;
use crate::error::{PackError, Result};
use crate::extract::{PatternWindows, Strategy};
use intake_protocol::path_filters::{is_safe_filename, normalize_rel_path};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const DEFAULT_MAX_CHARS: usize = 60_000;
pub const DEFAULT_PER_FILE_MAX_CHARS: usize = 12_000;
pub const DEFAULT_INCLUDE_FULL_UNDER_BYTES: u64 = 8_000;
pub const DEFAULT_BEFORE: usize = 3;
pub const DEFAULT_AFTER: usize = 12;

/// Pack build configuration, usually loaded from `packs.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackConfig {
    /// Repository reference stamped into every pack
    #[serde(default = "default_repo_ref")]
    pub repo_ref: String,

    /// Budgets used by packs that do not override them
    #[serde(default)]
    pub budgets: PackBudgets,

    /// Extraction rules shared by all packs
    #[serde(default)]
    pub extract: Vec<ExtractRule>,

    #[serde(default)]
    pub packs: Vec<PackSpec>,
}

fn default_repo_ref() -> String {
    "HEAD".to_string()
}

/// Character and size budgets for one pack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackBudgets {
    /// Global content budget across all files of a pack
    pub max_chars: usize,

    /// Content budget for a single file
    pub per_file_max_chars: usize,

    /// Files at or below this size are included whole
    pub include_full_under_bytes: u64,
}

impl Default for PackBudgets {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            per_file_max_chars: DEFAULT_PER_FILE_MAX_CHARS,
            include_full_under_bytes: DEFAULT_INCLUDE_FULL_UNDER_BYTES,
        }
    }
}

impl PackBudgets {
    pub fn entry_budget(&self) -> EntryBudget {
        EntryBudget {
            include_full_under_bytes: self.include_full_under_bytes,
            per_file_max_chars: self.per_file_max_chars,
        }
    }
}

/// One pack to build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSpec {
    pub id: String,

    /// Files and `dir/` listings, in priority order
    pub entrypoints: Vec<String>,

    #[serde(default)]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub per_file_max_chars: Option<usize>,
    #[serde(default)]
    pub include_full_under_bytes: Option<u64>,

    /// Extraction rules that win over the shared ones for the same path
    #[serde(default)]
    pub extract: Vec<ExtractRule>,
}

/// Per-path extraction heuristic; exactly one of `patterns` or `blocks` must be set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRule {
    pub path: String,
    #[serde(default)]
    pub patterns: Option<Vec<String>>,
    #[serde(default)]
    pub before: Option<usize>,
    #[serde(default)]
    pub after: Option<usize>,
    #[serde(default)]
    pub blocks: Option<Vec<String>>,
}

impl ExtractRule {
    fn compile(&self) -> Result<(String, Strategy)> {
        let path = normalize_rel_path(&self.path).ok_or_else(|| {
            PackError::invalid_config(format!(
                "extract rule path must be repository-relative: {:?}",
                self.path
            ))
        })?;

        let strategy = match (&self.patterns, &self.blocks) {
            (Some(patterns), None) => Strategy::Patterns(PatternWindows::new(
                patterns,
                self.before.unwrap_or(DEFAULT_BEFORE),
                self.after.unwrap_or(DEFAULT_AFTER),
            )?),
            (None, Some(blocks)) if !blocks.is_empty() => Strategy::Blocks(blocks.clone()),
            (None, Some(_)) => {
                return Err(PackError::invalid_config(format!(
                    "extract rule for {path} lists no blocks"
                )))
            }
            _ => {
                return Err(PackError::invalid_config(format!(
                    "extract rule for {path} must set exactly one of `patterns` or `blocks`"
                )))
            }
        };
        Ok((path, strategy))
    }
}

/// A validated pack ready for assembly
#[derive(Debug, Clone)]
pub struct PackPlan {
    pub id: String,
    pub entrypoints: Vec<String>,
    pub budgets: PackBudgets,
    pub strategies: HashMap<String, Strategy>,
}

impl PackPlan {
    pub fn strategy_for(&self, rel_path: &str) -> Option<&Strategy> {
        self.strategies.get(rel_path)
    }
}

impl PackConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Validates the config and compiles every rule into a [`PackPlan`].
    pub fn plans(&self) -> Result<Vec<PackPlan>> {
        let mut shared = HashMap::new();
        for rule in &self.extract {
            let (path, strategy) = rule.compile()?;
            shared.insert(path, strategy);
        }

        let mut seen_ids = HashSet::new();
        let mut plans = Vec::with_capacity(self.packs.len());
        for spec in &self.packs {
            let id = spec.id.trim();
            if !is_safe_filename(id) {
                return Err(PackError::invalid_config(format!(
                    "pack id {:?} must match [A-Za-z0-9._@-]+ and not start with '.'",
                    spec.id
                )));
            }
            if !seen_ids.insert(id.to_string()) {
                return Err(PackError::invalid_config(format!("duplicate pack id {id}")));
            }

            let mut strategies = shared.clone();
            for rule in &spec.extract {
                let (path, strategy) = rule.compile()?;
                strategies.insert(path, strategy);
            }

            let budgets = PackBudgets {
                max_chars: spec.max_chars.unwrap_or(self.budgets.max_chars),
                per_file_max_chars: spec
                    .per_file_max_chars
                    .unwrap_or(self.budgets.per_file_max_chars),
                include_full_under_bytes: spec
                    .include_full_under_bytes
                    .unwrap_or(self.budgets.include_full_under_bytes),
            };

            plans.push(PackPlan {
                id: id.to_string(),
                entrypoints: spec.entrypoints.clone(),
                budgets,
                strategies,
            });
        }
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
repo_ref = "main"

[budgets]
max_chars = 5000
per_file_max_chars = 1500

[[extract]]
path = "src/cli.py"
patterns = ["^def ", "argparse"]
before = 2
after = 4

[[packs]]
id = "engine-cli"
entrypoints = ["src/cli.py", "src/engine/"]

[[packs]]
id = "ui-shell"
entrypoints = ["web/"]
max_chars = 900

[[packs.extract]]
path = "./src/cli.py"
blocks = ["main"]
"#;

    #[test]
    fn parses_and_compiles_sample() {
        let config = PackConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.repo_ref, "main");
        assert_eq!(
            config.budgets.include_full_under_bytes,
            DEFAULT_INCLUDE_FULL_UNDER_BYTES
        );

        let plans = config.plans().unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].budgets.max_chars, 5000);
        assert!(matches!(
            plans[0].strategy_for("src/cli.py"),
            Some(Strategy::Patterns(_))
        ));

        assert_eq!(plans[1].budgets.max_chars, 900);
        assert_eq!(plans[1].budgets.per_file_max_chars, 1500);
        match plans[1].strategy_for("src/cli.py") {
            Some(Strategy::Blocks(names)) => assert_eq!(names, &vec!["main".to_string()]),
            other => panic!("expected pack-level block rule, got {other:?}"),
        }
    }

    #[test]
    fn defaults_apply_without_budgets_table() {
        let config = PackConfig::from_toml("[[packs]]\nid = \"a\"\nentrypoints = []\n").unwrap();
        assert_eq!(config.repo_ref, "HEAD");
        assert_eq!(config.budgets, PackBudgets::default());
    }

    #[test]
    fn rejects_rule_with_both_or_neither_strategy() {
        let both = r#"
[[extract]]
path = "a.py"
patterns = ["x"]
blocks = ["y"]
"#;
        let err = PackConfig::from_toml(both).unwrap().plans().unwrap_err();
        assert!(matches!(err, PackError::InvalidConfig(_)), "{err}");

        let neither = "[[extract]]\npath = \"a.py\"\n";
        assert!(PackConfig::from_toml(neither).unwrap().plans().is_err());
    }

    #[test]
    fn rejects_bad_regex_duplicate_and_unsafe_ids() {
        let bad_regex = "[[extract]]\npath = \"a.py\"\npatterns = [\"(\"]\n";
        assert!(matches!(
            PackConfig::from_toml(bad_regex).unwrap().plans(),
            Err(PackError::InvalidPattern { .. })
        ));

        let dup = "[[packs]]\nid = \"a\"\nentrypoints = []\n[[packs]]\nid = \"a\"\nentrypoints = []\n";
        assert!(PackConfig::from_toml(dup).unwrap().plans().is_err());

        let unsafe_id = "[[packs]]\nid = \"../x\"\nentrypoints = []\n";
        assert!(PackConfig::from_toml(unsafe_id).unwrap().plans().is_err());
    }
}
