use clap::{Parser, Subcommand};
use dossier_catalog::{
    config::CatalogConfig,
    indexing::{IndexingEngine, IndexingEngineConfig},
    object_store,
    retrieval::{Origin, Resolution},
    service::ReadService,
    storage::sqlite_store::SqliteCatalog,
};
use futures::StreamExt;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

/// Index a document tree into a searchable catalog and query it.
#[derive(Parser, Debug)]
#[command(name = "dossier", author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to scan and browse (overrides config and ROOT_DIR)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Catalog database file (overrides config and DOSSIER_DB)
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the root directory and catalogue new documents
    Index {
        /// Files extracted concurrently
        #[arg(short, long)]
        workers: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Full-text search over indexed documents
    Search {
        /// Search text, matched as a literal substring
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Print the indexed text of a catalogued file
    Content {
        /// Original path as catalogued
        path: String,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// List a directory, defaulting to the root
    Tree {
        path: Option<PathBuf>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show where a file is served from, optionally downloading it
    Resolve {
        /// Original path as catalogued
        path: String,
        /// Write the file's bytes to this path
        #[arg(short, long)]
        download: Option<PathBuf>,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show catalog statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = CatalogConfig::load(args.config.as_deref())?;
    if let Some(root) = args.root {
        config = config.with_root_dir(root);
    }
    if let Some(db) = args.db {
        config = config.with_database_path(db);
    }

    match args.command {
        Commands::Index { workers, format } => {
            if let Some(workers) = workers {
                config = config.with_max_workers(workers);
            }

            let catalog = Arc::new(SqliteCatalog::open(&config.database_path).await?);
            let engine_config = IndexingEngineConfig::new(config.root_dir.clone())
                .with_max_workers(config.max_workers)
                .with_extract_config(config.extract.clone());

            let mut engine = IndexingEngine::new(engine_config, catalog);
            if let Some(store) = object_store::connect(&config.object_store) {
                engine = engine.with_object_store(store);
            }

            let report = engine.run().await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                OutputFormat::Summary => {
                    println!(
                        "Processed: {}, Already Indexed: {}",
                        report.processed, report.skipped
                    );
                    println!("  Searchable: {}", report.searchable);
                    println!("  Uploaded: {}", report.uploaded);
                    println!("  Extraction failures: {}", report.extraction_failures);
                    println!("  Not catalogued: {}", report.failed);
                    println!("  Elapsed: {:.1?}", report.elapsed);
                }
            }
            Ok(())
        }
        Commands::Search {
            query,
            limit,
            format,
        } => {
            if let Some(limit) = limit {
                config.search_limit = limit;
            }
            let service = ReadService::open(&config).await;
            let hits = service.search(&query).await;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&hits)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} documents:", hits.len());
                    for hit in hits {
                        println!("  {} | {}", hit.filename, hit.path);
                        println!("    {}", hit.snippet);
                    }
                }
            }
            Ok(())
        }
        Commands::Content { path, format } => {
            let service = ReadService::open(&config).await;
            let content = service.content(&path).await;

            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({ "path": path, "content": content });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => println!("{content}"),
            }
            Ok(())
        }
        Commands::Tree { path, format } => {
            let service = ReadService::open(&config).await;
            let entries = service.tree(path.as_deref()).await;

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                }
                OutputFormat::Summary => {
                    for entry in entries {
                        if entry.is_directory {
                            println!("  {}/", entry.name);
                        } else {
                            println!("  {}", entry.name);
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Resolve {
            path,
            download,
            format,
        } => {
            let service = ReadService::open(&config).await;

            let Some(dest) = download else {
                let resolution = service.resolve(&path).await?;
                match (format, resolution) {
                    (OutputFormat::Json, resolution) => {
                        println!("{}", serde_json::to_string_pretty(&resolution)?);
                    }
                    (OutputFormat::Summary, Resolution::Remote { key, url }) => {
                        println!("Object store: {key}");
                        println!("{url}");
                    }
                    (OutputFormat::Summary, Resolution::Local { path }) => {
                        println!("Local file: {}", path.display());
                    }
                }
                return Ok(());
            };

            let mut stream = service.file(&path).await?;
            let mut file = tokio::fs::File::create(&dest).await?;
            let mut written = 0u64;
            while let Some(chunk) = stream.body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;

            match format {
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "origin": stream.origin,
                        "destination": dest,
                        "bytes": written,
                    });
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => match &stream.origin {
                    Origin::Remote { key } => {
                        println!(
                            "Wrote {written} bytes to {} from object store key {key}",
                            dest.display()
                        );
                    }
                    Origin::Local { path } => {
                        println!(
                            "Wrote {written} bytes to {} from {}",
                            dest.display(),
                            path.display()
                        );
                    }
                },
            }
            Ok(())
        }
        Commands::Stats { format } => {
            let service = ReadService::open(&config).await;
            let Some(stats) = service.stats().await? else {
                return Err(anyhow::anyhow!(
                    "Catalog at {} is unavailable",
                    config.database_path.display()
                ));
            };

            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary => {
                    println!("Catalog Statistics:");
                    if let Some(path) = &stats.database_path {
                        println!("  Database: {path}");
                    }
                    println!("  Total files: {}", stats.total_files);
                    println!("  Searchable files: {}", stats.searchable_files);
                    println!("  In object store: {}", stats.remote_files);
                    println!("  Local only: {}", stats.local_only_files);
                    if let Some(size) = stats.database_size_bytes {
                        println!("  Database size: {size} bytes");
                    }
                    if !stats.file_types.is_empty() {
                        println!("  File types:");
                        for entry in stats.file_types.iter().take(10) {
                            println!("    {}: {}", entry.file_type, entry.count);
                        }
                        if stats.file_types.len() > 10 {
                            println!("    ... and {} more", stats.file_types.len() - 10);
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
