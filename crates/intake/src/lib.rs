//! # Intake Core
//!
//! Answers "where should I look for task X?" from a tag catalog and a pack index.
//!
//! ```text
//! CatalogStore (catalog.json|toml, packs/index.json)
//!     │
//!     └──> CatalogCache::get_or_refresh (TTL snapshot, one fetch per expiry)
//!              │
//! IntakeRequest ──> resolve ──> IntakeResponse
//!                   (tag entries, fallbacks, commands, pack links, notes)
//! ```

mod cache;
mod catalog;
mod error;
mod resolver;
mod session;
mod store;

pub use cache::{CatalogCache, CatalogSnapshot, DEFAULT_CATALOG_TTL};
pub use catalog::{Catalog, EntrypointInfo, FallbackEntry};
pub use error::{CatalogError, Result};
pub use resolver::{
    command_for_tag, normalize_tags, resolve, resolve_with_session, ADVISORY_NOTES, MAX_COMMANDS,
    MAX_ENTRYPOINTS, MAX_PACKS, MAX_SUGGESTED_TAGS, MAX_TAGS, NO_TAGS_NOTE, TAG_PRIORITY,
};
pub use session::mint_session_id;
pub use store::{
    CatalogStore, FsCatalogStore, CATALOG_JSON, CATALOG_TOML, PACKS_DIR, PACK_INDEX_FILE,
};
