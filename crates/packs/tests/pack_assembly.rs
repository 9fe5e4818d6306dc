use intake_packs::{write_packs, PackAssembler, PackConfig};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CONFIG: &str = r#"
repo_ref = "v1.2.0"

[budgets]
max_chars = 2500
per_file_max_chars = 900
include_full_under_bytes = 400

[[extract]]
path = "src/engine/cli.py"
patterns = ["^def "]
before = 1
after = 3

[[extract]]
path = "src/engine/core.py"
blocks = ["Engine", "run"]

[[packs]]
id = "engine-cli"
entrypoints = ["src/engine/cli.py", "src/engine/", "README.md", "docs/missing.md"]

[[packs]]
id = "docs"
entrypoints = ["docs/"]
max_chars = 50
"#;

fn seed_repo(root: &Path) {
    let engine = root.join("src").join("engine");
    fs::create_dir_all(&engine).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();

    let mut cli = String::new();
    for i in 0..200 {
        if i % 50 == 0 {
            cli.push_str(&format!("def command_{i}(args):\n"));
        } else {
            cli.push_str(&format!("    value_{i} = compute({i})\n"));
        }
    }
    fs::write(engine.join("cli.py"), cli).unwrap();

    let mut core = String::from("import os\n\n");
    core.push_str("class Engine:\n");
    for i in 0..30 {
        core.push_str(&format!("    attr_{i} = {i}\n"));
    }
    core.push_str("\ndef run(engine):\n    return engine\n");
    fs::write(engine.join("core.py"), core).unwrap();

    fs::write(engine.join("__init__.py"), "").unwrap();
    fs::write(engine.join("small.py"), "X = 1\n").unwrap();
    fs::write(root.join("README.md"), "# Demo\n\nEngine docs.\n").unwrap();
    fs::write(root.join("docs").join("guide.md"), "g".repeat(120)).unwrap();
}

#[test]
fn assembly_is_deterministic_and_within_budgets() {
    let temp = tempdir().unwrap();
    seed_repo(temp.path());

    let config = PackConfig::from_toml(CONFIG).unwrap();
    let plans = config.plans().unwrap();
    let assembler = PackAssembler::new(temp.path(), config.repo_ref.clone());

    let first = assembler.assemble_at(&plans[0], 1);
    let second = assembler.assemble_at(&plans[0], 2);
    assert_eq!(
        serde_json::to_string(&first.files).unwrap(),
        serde_json::to_string(&second.files).unwrap()
    );

    let paths: Vec<&str> = first.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "src/engine/cli.py",
            "src/engine/core.py",
            "src/engine/small.py",
            "README.md",
        ]
    );

    for file in &first.files {
        assert!(file.content_chars() <= 900, "{} over per-file budget", file.path);
        assert!(!file.excerpts.is_empty());
        for excerpt in &file.excerpts {
            assert!(excerpt.start_line >= 1);
            assert!(excerpt.end_line >= excerpt.start_line);
            assert!(excerpt.end_line <= file.line_count);
        }
    }
    assert!(first.content_chars() <= 2500);
    assert_eq!(first.repo_ref, "v1.2.0");

    let core = &first.files[1];
    let purposes: Vec<&str> = core.excerpts.iter().map(|e| e.purpose.as_str()).collect();
    assert_eq!(purposes, vec!["block: Engine", "block: run"]);

    let docs = assembler.assemble_at(&plans[1], 1);
    assert_eq!(docs.files.len(), 1);
    assert_eq!(docs.content_chars(), 50);
}

#[test]
fn written_index_matches_pack_files() {
    let temp = tempdir().unwrap();
    seed_repo(temp.path());
    let out = temp.path().join("store").join("packs");

    let config = PackConfig::from_toml(CONFIG).unwrap();
    let assembler = PackAssembler::new(temp.path(), config.repo_ref.clone());
    let packs: Vec<_> = config
        .plans()
        .unwrap()
        .iter()
        .map(|plan| assembler.assemble(plan))
        .collect();
    let index = write_packs(&out, &packs, &config.repo_ref).unwrap();

    let ids: Vec<&str> = index.packs.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["engine-cli", "docs"]);
    assert!(intake_packs::verify_packs(&out).unwrap().is_empty());

    let raw = fs::read(out.join("engine-cli.json")).unwrap();
    let pack: intake_protocol::Pack = serde_json::from_slice(&raw).unwrap();
    assert_eq!(pack.pack_id, "engine-cli");
}
