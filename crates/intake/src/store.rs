use crate::catalog::Catalog;
use crate::error::{CatalogError, Result};
use intake_protocol::path_filters::is_safe_filename;
use intake_protocol::PackIndex;
use std::path::{Path, PathBuf};

pub const CATALOG_JSON: &str = "catalog.json";
pub const CATALOG_TOML: &str = "catalog.toml";
pub const PACKS_DIR: &str = "packs";
pub const PACK_INDEX_FILE: &str = "index.json";

/// Backing store for the catalog, the pack index and pack bytes.
pub trait CatalogStore: Send + Sync {
    fn load_catalog(&self) -> Result<Catalog>;

    fn load_pack_index(&self) -> Result<PackIndex>;

    /// Raw bytes of a stored pack; `filename` must already pass [`is_safe_filename`].
    fn read_pack(&self, filename: &str) -> Result<Vec<u8>>;
}

/// Directory-backed store:
///
/// ```text
/// <root>/catalog.json | catalog.toml
/// <root>/packs/index.json
/// <root>/packs/<id>.json
/// ```
#[derive(Debug, Clone)]
pub struct FsCatalogStore {
    root: PathBuf,
}

impl FsCatalogStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn packs_dir(&self) -> PathBuf {
        self.root.join(PACKS_DIR)
    }
}

impl CatalogStore for FsCatalogStore {
    fn load_catalog(&self) -> Result<Catalog> {
        let json = self.root.join(CATALOG_JSON);
        if json.is_file() {
            return Catalog::from_json(&std::fs::read(json)?);
        }
        let toml = self.root.join(CATALOG_TOML);
        if toml.is_file() {
            return Catalog::from_toml(&std::fs::read_to_string(toml)?);
        }
        Err(CatalogError::MissingCatalog(self.root.display().to_string()))
    }

    fn load_pack_index(&self) -> Result<PackIndex> {
        let raw = std::fs::read(self.packs_dir().join(PACK_INDEX_FILE))?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn read_pack(&self, filename: &str) -> Result<Vec<u8>> {
        if !is_safe_filename(filename) {
            return Err(CatalogError::InvalidFilename(filename.to_string()));
        }
        Ok(std::fs::read(self.packs_dir().join(filename))?)
    }
}
