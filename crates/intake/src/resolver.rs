//! Request → response merge of catalog entrypoints, fallbacks, commands and pack links.
//!
//! Tag entries are appended before fallback entries and the merged list is deduplicated by path
//! with the first occurrence kept, so a tag-specific entry always wins over a fallback for the
//! same path. Every list in the response is capped.

use crate::cache::CatalogSnapshot;
use crate::catalog::Catalog;
use crate::session::mint_session_id;
use intake_protocol::{
    IntakeRequest, IntakeResponse, PackRef, ResolvedEntrypoint, SessionInfo,
    INTAKE_SCHEMA_VERSION, PACKS_ROUTE_PREFIX,
};
use std::collections::HashSet;

pub const MAX_TAGS: usize = 16;
pub const MAX_ENTRYPOINTS: usize = 64;
pub const MAX_COMMANDS: usize = 32;
pub const MAX_SUGGESTED_TAGS: usize = 32;
pub const MAX_PACKS: usize = 16;

/// Priority given to every catalog (tag) entrypoint.
pub const TAG_PRIORITY: i64 = 1;

pub const NO_TAGS_NOTE: &str =
    "No tags provided; returning fallback entrypoints only. Pass task.tags for targeted results.";

pub const ADVISORY_NOTES: [&str; 2] = [
    "If this service becomes unavailable, continue from the entrypoints listed here.",
    "Do not send raw prompts or task descriptions; tags are enough.",
];

const PYTEST_COMMAND: &str = "python -m pytest -q";

const TAG_COMMANDS: &[(&str, &str)] = &[
    ("ui-", "npm run dev"),
    ("engine-", PYTEST_COMMAND),
    ("test-", PYTEST_COMMAND),
];

/// Trims, drops empties, dedups (first occurrence wins) and caps at [`MAX_TAGS`].
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(*tag))
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

/// Shell command triggered by a reserved tag prefix, if any.
pub fn command_for_tag(tag: &str) -> Option<&'static str> {
    TAG_COMMANDS
        .iter()
        .find(|(prefix, _)| tag.starts_with(prefix))
        .map(|(_, command)| *command)
}

pub fn resolve(
    request: &IntakeRequest,
    snapshot: &CatalogSnapshot,
    public_base_url: Option<&str>,
) -> IntakeResponse {
    resolve_with_session(request, snapshot, public_base_url, mint_session_id())
}

/// Same as [`resolve`] with a caller-chosen session id.
pub fn resolve_with_session(
    request: &IntakeRequest,
    snapshot: &CatalogSnapshot,
    public_base_url: Option<&str>,
    session_id: String,
) -> IntakeResponse {
    let tags = normalize_tags(&request.task.tags);
    let catalog = &snapshot.catalog;

    let mut entrypoints = Vec::new();
    let mut commands = Vec::new();
    for tag in &tags {
        let Some(info) = catalog.tag(tag) else {
            continue;
        };
        let why = if info.description.trim().is_empty() {
            tag.clone()
        } else {
            format!("{tag}: {}", info.description.trim())
        };
        for path in info.paths() {
            entrypoints.push(ResolvedEntrypoint {
                path: path.to_string(),
                kind: entrypoint_kind(path).to_string(),
                why: why.clone(),
                priority: TAG_PRIORITY,
            });
        }
        if let Some(command) = command_for_tag(tag) {
            commands.push(command.to_string());
        }
    }

    entrypoints.extend(catalog.fallback.iter().map(|entry| ResolvedEntrypoint {
        path: entry.path.clone(),
        kind: entry.kind.clone(),
        why: entry.why.clone(),
        priority: entry.priority,
    }));

    let entrypoints = dedup_by(entrypoints, |entry| entry.path.clone(), MAX_ENTRYPOINTS);
    let commands = dedup_by(commands, Clone::clone, MAX_COMMANDS);

    let packs = match public_base_url.map(|base| base.trim_end_matches('/')) {
        Some(base) if !base.is_empty() => pack_refs(&tags, snapshot, base),
        _ => Vec::new(),
    };

    let mut notes = Vec::with_capacity(ADVISORY_NOTES.len() + 1);
    if tags.is_empty() {
        notes.push(NO_TAGS_NOTE.to_string());
    }
    notes.extend(ADVISORY_NOTES.iter().map(|note| note.to_string()));

    IntakeResponse {
        schema_version: INTAKE_SCHEMA_VERSION.to_string(),
        session: SessionInfo { id: session_id },
        entrypoints,
        suggested_tags: suggested_tags(catalog),
        commands,
        packs,
        notes,
    }
}

fn entrypoint_kind(path: &str) -> &'static str {
    if path.ends_with('/') {
        "dir"
    } else {
        "file"
    }
}

fn suggested_tags(catalog: &Catalog) -> Vec<String> {
    let candidates: Vec<String> = match &catalog.suggested_tags {
        Some(explicit) => explicit.clone(),
        None => catalog.tags.keys().cloned().collect(),
    };
    dedup_by(candidates, Clone::clone, MAX_SUGGESTED_TAGS)
}

fn pack_refs(tags: &[String], snapshot: &CatalogSnapshot, base: &str) -> Vec<PackRef> {
    tags.iter()
        .filter_map(|tag| {
            let entry = snapshot.pack(tag)?;
            Some(PackRef {
                id: tag.clone(),
                url: format!("{base}{PACKS_ROUTE_PREFIX}/{}", entry.filename),
                sha256: entry.sha256.clone(),
                byte_size: entry.byte_size,
                purpose: format!("excerpt pack for {tag}"),
            })
        })
        .take(MAX_PACKS)
        .collect()
}

fn dedup_by<T>(items: Vec<T>, key: impl Fn(&T) -> String, cap: usize) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntrypointInfo, FallbackEntry};
    use intake_protocol::{AgentInfo, PackIndexEntry, TaskInfo, TelemetryPrefs};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::Instant;

    fn request(tags: &[&str]) -> IntakeRequest {
        IntakeRequest {
            schema_version: INTAKE_SCHEMA_VERSION.to_string(),
            agent: AgentInfo {
                tool: "codex".to_string(),
                tool_version: None,
            },
            task: TaskInfo {
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
            },
            telemetry: TelemetryPrefs::default(),
            repo: None,
        }
    }

    fn fallback(path: &str, why: &str, priority: i64) -> FallbackEntry {
        FallbackEntry {
            path: path.to_string(),
            why: why.to_string(),
            priority,
            kind: "file".to_string(),
        }
    }

    fn snapshot() -> CatalogSnapshot {
        let mut catalog = Catalog::default();
        catalog.tags.insert(
            "engine-cli".to_string(),
            EntrypointInfo {
                path: None,
                description: "CLI layer".to_string(),
                entrypoints: vec!["a.py".to_string(), "b.py".to_string()],
            },
        );
        catalog.tags.insert(
            "ui-shell".to_string(),
            EntrypointInfo {
                path: Some("web/".to_string()),
                description: String::new(),
                entrypoints: vec!["README.md".to_string()],
            },
        );
        catalog.fallback = vec![
            fallback("README.md", "overview", 3),
            fallback("a.py", "main module", 5),
            fallback("docs/ARCH.md", "architecture", 4),
        ];
        let packs = vec![PackIndexEntry {
            id: "engine-cli".to_string(),
            filename: "engine-cli.json".to_string(),
            sha256: "f00d".to_string(),
            byte_size: 42,
        }];
        CatalogSnapshot::new(catalog, packs, Instant::now())
    }

    fn paths(response: &IntakeResponse) -> Vec<&str> {
        response
            .entrypoints
            .iter()
            .map(|entry| entry.path.as_str())
            .collect()
    }

    #[test]
    fn empty_tags_return_fallbacks_with_no_tags_note() {
        let snapshot = snapshot();
        let response = resolve(&request(&[]), &snapshot, None);
        assert_eq!(paths(&response), vec!["README.md", "a.py", "docs/ARCH.md"]);
        assert_eq!(response.notes[0], NO_TAGS_NOTE);
        assert_eq!(response.notes.len(), 3);
        assert!(response.commands.is_empty());
        assert!(response.packs.is_empty());
        assert_eq!(response.session.id.len(), 32);
    }

    #[test]
    fn whitespace_only_tags_count_as_none() {
        let response = resolve(&request(&["  ", ""]), &snapshot(), None);
        assert_eq!(response.notes[0], NO_TAGS_NOTE);
    }

    #[test]
    fn tag_entries_lead_and_win_over_fallbacks() {
        let response = resolve(&request(&["engine-cli"]), &snapshot(), None);
        assert_eq!(paths(&response), vec!["a.py", "b.py", "README.md", "docs/ARCH.md"]);
        for entry in &response.entrypoints[..2] {
            assert_eq!(entry.priority, 1);
            assert_eq!(entry.why, "engine-cli: CLI layer");
            assert_eq!(entry.kind, "file");
        }
        assert_eq!(response.entrypoints[2].priority, 3);
        assert_eq!(response.commands, vec![PYTEST_COMMAND.to_string()]);
        assert_eq!(response.notes, ADVISORY_NOTES.map(str::to_string).to_vec());
    }

    #[test]
    fn primary_path_precedes_candidates_and_dirs_are_marked() {
        let response = resolve(&request(&["ui-shell"]), &snapshot(), None);
        assert_eq!(response.entrypoints[0].path, "web/");
        assert_eq!(response.entrypoints[0].kind, "dir");
        assert_eq!(response.entrypoints[0].why, "ui-shell");
        assert_eq!(response.entrypoints[1].path, "README.md");
        assert_eq!(response.entrypoints[1].priority, 1);
        assert_eq!(response.commands, vec!["npm run dev".to_string()]);
    }

    #[test]
    fn unknown_tags_contribute_nothing() {
        let response = resolve(&request(&["engine-missing"]), &snapshot(), None);
        assert_eq!(paths(&response), vec!["README.md", "a.py", "docs/ARCH.md"]);
        assert!(response.commands.is_empty());
        assert_eq!(response.notes.len(), 2);
    }

    #[test]
    fn pack_refs_need_a_base_url() {
        let snapshot = snapshot();
        let without = resolve(&request(&["engine-cli"]), &snapshot, None);
        assert!(without.packs.is_empty());

        let with = resolve(
            &request(&["engine-cli", "ui-shell"]),
            &snapshot,
            Some("http://127.0.0.1:7710/"),
        );
        assert_eq!(
            with.packs,
            vec![PackRef {
                id: "engine-cli".to_string(),
                url: "http://127.0.0.1:7710/v1/packs/engine-cli.json".to_string(),
                sha256: "f00d".to_string(),
                byte_size: 42,
                purpose: "excerpt pack for engine-cli".to_string(),
            }]
        );
    }

    #[test]
    fn suggested_tags_prefer_explicit_list() {
        let mut snapshot = snapshot();
        let response = resolve_with_session(&request(&[]), &snapshot, None, "s".to_string());
        assert_eq!(response.suggested_tags, vec!["engine-cli", "ui-shell"]);
        assert_eq!(response.session.id, "s");

        snapshot.catalog.suggested_tags = Some(vec![
            "ui-shell".to_string(),
            "ui-shell".to_string(),
            "docs".to_string(),
        ]);
        let response = resolve(&request(&[]), &snapshot, None);
        assert_eq!(response.suggested_tags, vec!["ui-shell", "docs"]);
    }

    #[test]
    fn suggested_tags_from_catalog_keys_are_capped_in_file_order() {
        let mut catalog = Catalog::default();
        for i in (0..45).rev() {
            catalog
                .tags
                .insert(format!("tag-{i:02}"), EntrypointInfo::default());
        }
        let snapshot = CatalogSnapshot::new(catalog, Vec::new(), Instant::now());
        let response = resolve(&request(&[]), &snapshot, None);

        let expected: Vec<String> = (0..45)
            .rev()
            .take(MAX_SUGGESTED_TAGS)
            .map(|i| format!("tag-{i:02}"))
            .collect();
        assert_eq!(response.suggested_tags.len(), MAX_SUGGESTED_TAGS);
        assert_eq!(response.suggested_tags, expected);
    }

    #[test]
    fn explicit_suggestions_are_deduplicated_before_the_cap() {
        let mut snapshot = snapshot();
        let explicit: Vec<String> = (0..80).map(|i| format!("s{}", i / 2)).collect();
        snapshot.catalog.suggested_tags = Some(explicit);
        let response = resolve(&request(&[]), &snapshot, None);

        let expected: Vec<String> = (0..MAX_SUGGESTED_TAGS).map(|i| format!("s{i}")).collect();
        assert_eq!(response.suggested_tags, expected);
    }

    #[test]
    fn many_prefixed_tags_yield_capped_unique_commands() {
        let mut catalog = Catalog::default();
        let mut tags = Vec::new();
        for i in 0..MAX_TAGS {
            let tag = match i % 3 {
                0 => format!("ui-{i}"),
                1 => format!("engine-{i}"),
                _ => format!("test-{i}"),
            };
            catalog.tags.insert(tag.clone(), EntrypointInfo::default());
            tags.push(tag);
        }
        let snapshot = CatalogSnapshot::new(catalog, Vec::new(), Instant::now());
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let response = resolve(&request(&tag_refs), &snapshot, None);

        assert!(response.commands.len() <= MAX_COMMANDS);
        assert_eq!(
            response.commands,
            vec!["npm run dev".to_string(), PYTEST_COMMAND.to_string()]
        );
    }

    #[test]
    fn commands_are_deduplicated() {
        let mut snapshot = snapshot();
        snapshot.catalog.tags.insert(
            "test-unit".to_string(),
            EntrypointInfo {
                path: None,
                description: "unit tests".to_string(),
                entrypoints: vec!["tests/".to_string()],
            },
        );
        let response = resolve(&request(&["engine-cli", "test-unit"]), &snapshot, None);
        assert_eq!(response.commands, vec![PYTEST_COMMAND.to_string()]);
    }

    #[test]
    fn entrypoints_are_capped() {
        let mut catalog = Catalog::default();
        catalog.fallback = (0..100)
            .map(|i| fallback(&format!("f{i}.py"), "pad", 5))
            .collect();
        let snapshot = CatalogSnapshot::new(catalog, Vec::new(), Instant::now());
        let response = resolve(&request(&[]), &snapshot, None);
        assert_eq!(response.entrypoints.len(), MAX_ENTRYPOINTS);
        assert_eq!(response.entrypoints[63].path, "f63.py");
    }

    #[test]
    fn duplicate_laden_tags_are_capped() {
        let raw: Vec<String> = (0..30).map(|i| format!(" t{} ", i % 20)).collect();
        let tags = normalize_tags(&raw);
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags[0], "t0");
        assert_eq!(tags[15], "t15");
    }

    proptest! {
        #[test]
        fn normalized_tags_are_unique_trimmed_and_capped(
            raw in proptest::collection::vec("[ a-c]{0,3}", 0..40)
        ) {
            let tags = normalize_tags(&raw);
            prop_assert!(tags.len() <= MAX_TAGS);
            let unique: HashSet<&String> = tags.iter().collect();
            prop_assert_eq!(unique.len(), tags.len());
            for tag in &tags {
                prop_assert!(!tag.is_empty());
                prop_assert_eq!(tag.trim(), tag.as_str());
            }
        }

        #[test]
        fn resolved_paths_are_unique(
            tag_paths in proptest::collection::vec("[ab]{1,2}\\.py", 0..20),
            fallback_paths in proptest::collection::vec("[ab]{1,2}\\.py", 0..20),
        ) {
            let mut catalog = Catalog::default();
            catalog.tags.insert(
                "engine-x".to_string(),
                EntrypointInfo {
                    path: None,
                    description: String::new(),
                    entrypoints: tag_paths.clone(),
                },
            );
            catalog.fallback = fallback_paths.iter().map(|p| fallback(p, "fb", 9)).collect();
            let snapshot = CatalogSnapshot::new(catalog, Vec::new(), Instant::now());
            let response = resolve(&request(&["engine-x"]), &snapshot, None);

            let unique: HashSet<&str> = paths(&response).into_iter().collect();
            prop_assert_eq!(unique.len(), response.entrypoints.len());
            for entry in &response.entrypoints {
                if tag_paths.contains(&entry.path) {
                    prop_assert_eq!(entry.priority, TAG_PRIORITY);
                }
            }
        }
    }
}
