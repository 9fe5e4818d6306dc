use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use intake_core::{resolve, CatalogCache, FsCatalogStore, PACKS_DIR};
use intake_packs::{verify_packs, write_packs, PackAssembler, PackConfig};
use intake_protocol::{parse_intake_request_bytes, ErrorBody, Pack};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod http_api;
mod server_security;
mod telemetry;

#[derive(Parser)]
#[command(name = "repo-intake")]
#[command(about = "Budgeted excerpt packs and tag-based entrypoint intake for agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build excerpt packs and index.json from a pack config
    #[command(name = "build-packs")]
    BuildPacks(BuildPacksArgs),

    /// Serve the intake API over HTTP (POST /v1/intake, GET /v1/packs/{file})
    #[command(name = "serve-http")]
    ServeHttp(ServeArgs),

    /// Resolve one intake request offline and print the response
    Resolve(ResolveArgs),

    /// Check stored packs against index.json
    #[command(name = "verify-packs")]
    VerifyPacks(VerifyArgs),
}

#[derive(Args)]
struct BuildPacksArgs {
    /// Repository root that entrypoints are relative to
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Pack config (TOML)
    #[arg(long)]
    config: PathBuf,

    /// Output directory for <id>.json files and index.json
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args)]
struct ServeArgs {
    /// Store directory with catalog.json|catalog.toml and packs/
    #[arg(long, env = "INTAKE_STORE_DIR")]
    store: PathBuf,

    /// Bind address, e.g. 127.0.0.1:7710
    #[arg(long, default_value = "127.0.0.1:7710")]
    bind: String,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,

    /// Base URL used in pack links (derived from request headers when unset)
    #[arg(long, env = "INTAKE_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Catalog cache TTL in seconds
    #[arg(long, default_value_t = 60)]
    catalog_ttl_seconds: u64,
}

#[derive(Args)]
struct ResolveArgs {
    /// Store directory with catalog.json|catalog.toml and packs/
    #[arg(long, env = "INTAKE_STORE_DIR")]
    store: PathBuf,

    /// Inline JSON request (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing the JSON request
    #[arg(long)]
    file: Option<PathBuf>,

    /// Pretty-print JSON response
    #[arg(long)]
    pretty: bool,

    /// Base URL used in pack links; none are attached when unset
    #[arg(long, env = "INTAKE_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Store directory with packs/index.json
    #[arg(long, env = "INTAKE_STORE_DIR")]
    store: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // stdout carries the JSON response
    if matches!(cli.command, Commands::Resolve(_)) {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::BuildPacks(args) => run_build_packs(args)?,
        Commands::ServeHttp(args) => serve_http(args).await?,
        Commands::Resolve(args) => run_resolve(args)?,
        Commands::VerifyPacks(args) => run_verify_packs(args)?,
    }

    Ok(())
}

fn run_build_packs(args: BuildPacksArgs) -> Result<()> {
    let config = PackConfig::load(&args.config)
        .with_context(|| format!("Failed to load pack config {}", args.config.display()))?;
    // Validate every pack before anything is written.
    let plans = config
        .plans()
        .with_context(|| format!("Invalid pack config {}", args.config.display()))?;

    let assembler = PackAssembler::new(&args.root, config.repo_ref.clone());
    let packs: Vec<Pack> = plans.iter().map(|plan| assembler.assemble(plan)).collect();
    let index = write_packs(&args.out, &packs, &config.repo_ref)
        .with_context(|| format!("Failed to write packs to {}", args.out.display()))?;

    for (pack, entry) in packs.iter().zip(&index.packs) {
        println!(
            "{}: {} files, {} chars, {} bytes",
            entry.filename,
            pack.files.len(),
            pack.content_chars(),
            entry.byte_size
        );
    }
    println!(
        "Wrote {} packs to {}",
        index.packs.len(),
        args.out.display()
    );
    Ok(())
}

async fn serve_http(args: ServeArgs) -> Result<()> {
    ensure_store_dir(&args.store)?;
    let addr = server_security::guarded_bind_addr(&args.bind, args.public).await?;

    let store = Arc::new(FsCatalogStore::new(&args.store));
    let state = Arc::new(http_api::HttpState {
        cache: CatalogCache::new(store, Duration::from_secs(args.catalog_ttl_seconds)),
        public_base_url: args.public_base_url,
    });
    let app = http_api::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    log::info!("Store: {}", args.store.display());
    println!("Serving intake API on http://{addr}/v1/intake");
    axum::serve(listener, app).await?;
    Ok(())
}

fn run_resolve(args: ResolveArgs) -> Result<()> {
    ensure_store_dir(&args.store)?;
    let raw = read_payload(args.json.as_deref(), args.file.as_deref())?;

    let request = match parse_intake_request_bytes(raw.as_bytes()) {
        Ok(request) => request,
        Err(err) => {
            log::debug!("Rejected intake request: {err}");
            print_json(&ErrorBody::new(err.reason()), args.pretty)?;
            std::process::exit(1);
        }
    };

    let cache = CatalogCache::new(
        Arc::new(FsCatalogStore::new(&args.store)),
        intake_core::DEFAULT_CATALOG_TTL,
    );
    let snapshot = cache.get_or_refresh(Instant::now());
    let base_url = args
        .public_base_url
        .as_deref()
        .map(str::trim)
        .filter(|base| !base.is_empty());
    let response = resolve(&request, &snapshot, base_url);
    print_json(&response, args.pretty)
}

fn run_verify_packs(args: VerifyArgs) -> Result<()> {
    let pack_dir = args.store.join(PACKS_DIR);
    let issues = verify_packs(&pack_dir)
        .with_context(|| format!("Failed to read pack index in {}", pack_dir.display()))?;

    if issues.is_empty() {
        println!("All packs in {} match index.json", pack_dir.display());
        return Ok(());
    }
    for issue in &issues {
        eprintln!("{issue}");
    }
    anyhow::bail!("{} pack(s) failed verification", issues.len())
}

fn ensure_store_dir(store: &Path) -> Result<()> {
    if !store.is_dir() {
        anyhow::bail!(
            "Store directory not found: {} (set --store or INTAKE_STORE_DIR)",
            store.display()
        )
    }
    Ok(())
}

fn read_payload(json: Option<&str>, file: Option<&Path>) -> Result<String> {
    if let Some(raw) = json {
        return Ok(raw.to_string());
    }
    if let Some(path) = file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;
    Ok(buffer)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
