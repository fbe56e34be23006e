use anyhow::Context;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod services;

use cli::{Cli, Command, SearchArgs};
use docvec_core::config::Settings;
use docvec_core::traits::VectorCollectionService;
use docvec_core::Error;
use docvec_index::CleanupStatus;
use services::App;

fn init_tracing(verbose: u8) {
    let filter = if let Ok(env) = std::env::var("DOCVEC_LOG") {
        EnvFilter::new(env)
    } else {
        match verbose {
            0 => EnvFilter::new("info,lance=warn,lancedb=warn"),
            1 => EnvFilter::new("debug,lance=info,lancedb=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(hint) = hint(&e) {
                eprintln!("hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
    let settings = Settings::load_from(&cli.config, &env_name)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let base = cli.config.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let app = App::new(settings, base);

    match cli.command {
        Command::Index => index(&app).await,
        Command::Refresh => refresh(&app).await,
        Command::Search(args) => search(&app, args).await,
        Command::Status => status(&app).await,
    }
}

async fn index(app: &App) -> anyhow::Result<()> {
    let report = app.pipeline().await?.index().await?;
    match report.populated {
        Some(p) => println!("Indexed {} items into {} ({} batches)", p.points, p.collection, p.batches),
        None => println!("{} is already populated", report.collection),
    }
    Ok(())
}

async fn refresh(app: &App) -> anyhow::Result<()> {
    let report = app.pipeline().await?.refresh().await?;
    let points = report.populated.as_ref().map_or(0, |p| p.points);
    println!("Switched {} -> {} ({} items)", report.previous, report.current, points);
    match report.cleanup {
        CleanupStatus::Deleted => println!("Removed {}", report.previous),
        CleanupStatus::Absent => {}
        CleanupStatus::Failed(reason) => {
            eprintln!("warning: {} was left behind: {reason}", report.previous);
        }
    }
    Ok(())
}

async fn search(app: &App, args: SearchArgs) -> anyhow::Result<()> {
    let mut config = app.settings().search_config()?;
    if let Some(limit) = args.limit {
        config.result_limit = limit.max(1);
    }
    if args.no_boost {
        config.keyword_boost = false;
    }
    let results = app.searcher().await?.search_with(&args.query, config).await?;
    if results.is_empty() {
        println!("No results for \"{}\"", args.query);
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        println!("{}. score={:.4}  {}", i + 1, r.score, r.payload.source_location);
        println!("   {}", snippet(&r.payload.content, 160));
    }
    Ok(())
}

async fn status(app: &App) -> anyhow::Result<()> {
    let current = app.state().await?.current_collection();
    let store = app.store().await?;
    if store.exists(&current).await? {
        let info = store.info(&current).await?;
        println!("Active collection: {current} ({} points)", info.points_count);
    } else {
        println!("Active collection: {current} (not created yet)");
    }
    Ok(())
}

fn snippet(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}

fn hint(err: &anyhow::Error) -> Option<&'static str> {
    let e = err.chain().find_map(|c| c.downcast_ref::<Error>())?;
    Some(match e {
        e if e.is_connectivity() => "is the vector store reachable? check `db_path` and permissions",
        e if e.is_not_found() => "the active collection does not exist yet; run `docvec index` first",
        Error::InvalidConfig(_) => "check config.toml, config.<env>.toml and APP_* environment variables",
        Error::Embedding(_) => "check `model_dir` (or APP_MODEL_DIR), or set APP_USE_FAKE_EMBEDDINGS=1",
        _ => return None,
    })
}
