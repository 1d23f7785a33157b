//! LinkShelf command-line entry point.
//!
//! Small driver over the library: ingest bookmarks, queue them, run
//! enrichment batches, and print derived statistics.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use linkshelf::app::App;
use linkshelf::managers::queue_manager::QueueManagerTrait;
use linkshelf::types::batch::{ProgressCallback, ProgressEvent, ProgressStatus};
use linkshelf::types::config::EnrichmentConfig;

const DEFAULT_DB_PATH: &str = "linkshelf.db";
const DEFAULT_CONFIG_PATH: &str = "linkshelf.json";

fn usage() {
    eprintln!("Usage: linkshelf [--db <path>] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  add <url> <title>          ingest a bookmark");
    eprintln!("  remove <id>                delete a bookmark");
    eprintln!("  enqueue <id> [priority]    queue a bookmark for enrichment");
    eprintln!("  enrich [--force]           run one enrichment batch");
    eprintln!("  enrich-one <id> [--force]  enrich a single bookmark");
    eprintln!("  stats                      print derived statistics");
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let db_path = match args.iter().position(|a| a == "--db") {
        Some(i) if i + 1 < args.len() => {
            let path = args.remove(i + 1);
            args.remove(i);
            path
        }
        Some(_) => {
            usage();
            return ExitCode::FAILURE;
        }
        None => DEFAULT_DB_PATH.to_string(),
    };

    let config = match EnrichmentConfig::from_file(DEFAULT_CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = match App::new(&db_path, config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&app, &args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(app: &App, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    match args.first().map(String::as_str) {
        Some("add") => {
            let url = args.get(1).ok_or("add requires a url")?;
            let title = args.get(2).map(String::as_str).unwrap_or(url);
            let id = app.add_bookmark(url, title)?;
            println!("{}", id);
        }
        Some("remove") => {
            let id = args.get(1).ok_or("remove requires an id")?;
            app.remove_bookmark(id)?;
        }
        Some("enqueue") => {
            let id = args.get(1).ok_or("enqueue requires an id")?;
            let priority: i64 = match args.get(2) {
                Some(p) => p.parse()?,
                None => 0,
            };
            let added = app.enqueue(id, priority)?;
            if added {
                println!("queued ({} pending)", app.queue.size()?);
            } else {
                println!("already queued");
            }
        }
        Some("enrich") => {
            let force = args.iter().any(|a| a == "--force");
            let progress: ProgressCallback = Arc::new(print_progress);
            let summary = app.pool.run_batch(None, Some(progress), None, force).await?;
            println!(
                "processed {} (success {}, failed {}, skipped {})",
                summary.processed, summary.success, summary.failed, summary.skipped
            );
        }
        Some("enrich-one") => {
            let id = args.get(1).ok_or("enrich-one requires an id")?;
            let force = args.iter().any(|a| a == "--force");
            let result = app.pool.enrich_one(id, force).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Some("stats") => {
            println!("quick:     {}", app.stats.quick_stats()?);
            println!("summary:   {}", app.stats.summary_stats()?);
            println!("category:  {}", app.stats.category_stats()?);
            println!("domains:   {}", app.stats.domain_stats()?);
            println!("platforms: {}", app.stats.platform_stats()?);
            println!("creators:  {}", app.stats.expertise_stats()?);
        }
        _ => {
            usage();
            return Err("unknown command".into());
        }
    }
    Ok(())
}

fn print_progress(event: ProgressEvent) {
    let marker = match event.status {
        ProgressStatus::Processing => return,
        ProgressStatus::Completed => "ok",
        ProgressStatus::Failed => "dead",
        ProgressStatus::Error => "error",
    };
    println!(
        "[{}/{}] {} {} ({})",
        event.completed, event.total, marker, event.url, event.title
    );
}
