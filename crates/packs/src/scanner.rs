use ignore::WalkBuilder;
use intake_protocol::path_filters::{is_dir_specifier, normalize_rel_path};
use std::collections::HashSet;
use std::path::Path;

/// Expands pack entrypoint specifiers into concrete repository-relative file paths.
///
/// Directory specifiers list immediate children only. The result is deduplicated, keeping the
/// first occurrence of each path.
pub fn expand_entrypoints(root: &Path, specifiers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for raw in specifiers {
        let Some(rel) = normalize_rel_path(raw) else {
            log::warn!("Skipping entrypoint outside the repository: {raw:?}");
            continue;
        };

        let is_dir = is_dir_specifier(raw) || root.join(&rel).is_dir();
        let expanded = if is_dir {
            list_directory(root, &rel)
        } else {
            vec![rel]
        };

        for path in expanded {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }
    out
}

fn list_directory(root: &Path, rel_dir: &str) -> Vec<String> {
    let dir = root.join(rel_dir);
    if !dir.is_dir() {
        log::debug!("Directory entrypoint {rel_dir} does not exist");
        return Vec::new();
    }

    let mut builder = WalkBuilder::new(&dir);
    builder
        .standard_filters(false)
        .hidden(true) // skip dotfiles and dot-directories
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b));

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.depth() == 0 {
                    continue;
                }
                let Some(file_type) = entry.file_type() else {
                    continue;
                };
                if !file_type.is_file() {
                    continue;
                }
                let Some(name) = entry.file_name().to_str() else {
                    continue;
                };
                if is_noise_file(name) || !is_text_file(name) {
                    continue;
                }
                files.push(format!("{rel_dir}/{name}"));
            }
            Err(e) => log::warn!("Failed to read entry under {rel_dir}: {e}"),
        }
    }
    files
}

fn is_text_file(name: &str) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    let ext = ext.to_lowercase();
    TEXT_EXTENSIONS.iter().any(|candidate| candidate == &ext)
}

fn is_noise_file(name: &str) -> bool {
    NOISE_FILE_NAMES
        .iter()
        .any(|candidate| name.eq_ignore_ascii_case(candidate))
}

const NOISE_FILE_NAMES: &[&str] = &[
    "package-lock.json",
    "pnpm-lock.yaml",
    "yarn.lock",
    "poetry.lock",
    "Cargo.lock",
];

/// Textual source, doc and config extensions picked up from directory listings.
const TEXT_EXTENSIONS: &[&str] = &[
    // Code
    "rs", "py", "pyi", "js", "mjs", "cjs", "ts", "tsx", "jsx", "go", "java", "kt", "kts", "c", "h",
    "cc", "cpp", "hpp", "cs", "rb", "swift", "php", "lua", "vue", "svelte", "sql", "proto",
    "html", "css", "scss", // Scripts
    "sh", "bash", "zsh", "ps1", // Docs
    "md", "mdx", "rst", "adoc", "txt", // Config
    "toml", "yaml", "yml", "json", "ini", "cfg", "conf",
];
