mod error;

use crate::error::{ErrorKind, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use exn::ResultExt;
use flibook_catalog::{Database, Repository};
use flibook_config::{BatchFailurePolicy, Config};
use flibook_library::import::error::ErrorKind as ImportErrorKind;
use flibook_library::{ImportOptions, ImportSummary, import_dump, search_bytes};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "flibook", about = "Index INPX book catalog dumps into SQLite and search them", version)]
struct Cli {
    /// Config file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Catalog database, overriding the configured one
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Log more (repeat for more detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import an INPX dump into the catalog
    Build(BuildArgs),
    /// Search the catalog by title and author names
    Search(SearchArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Path to the `.inpx` file
    inpx: PathBuf,

    /// Directory holding the dump's book, cover and image archives
    #[arg(long, value_name = "DIR")]
    dump_root: Option<PathBuf>,

    /// Records per transaction
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Skip batches that fail instead of stopping
    #[arg(long)]
    continue_on_failure: bool,

    /// Run the import without committing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Words that must all appear in the title or author names
    query: Vec<OsString>,

    /// Print each match as a JSON object
    #[arg(long)]
    json: bool,
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(log_level(cli.verbose)).with_writer(std::io::stderr).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Command::Build(args) = &cli.command {
        if let Some(dump_root) = &args.dump_root {
            config.dump_root = Some(dump_root.clone());
        }
        if let Some(batch_size) = args.batch_size {
            config.import.batch_size = batch_size;
        }
        if args.continue_on_failure {
            config.import.on_batch_failure = BatchFailurePolicy::Continue;
        }
    }
    config.validate().or_raise(|| ErrorKind::Config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .or_raise(|| ErrorKind::Runtime)?;
    runtime.block_on(async move {
        let db = open(&config.database).await?;
        let result = match cli.command {
            Command::Build(args) => build(&db, &config, &args).await,
            Command::Search(args) => search(&db, &args).await,
        };
        db.close().await;
        result
    })
}

async fn open(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
    }
    Database::connect(path).await.or_raise(|| ErrorKind::Database)
}

async fn build(db: &Database, config: &Config, args: &BuildArgs) -> Result<()> {
    let repo = Repository::new(db.pool().clone(), args.dry_run);
    let options = ImportOptions::from(&config.import);
    match import_dump(&repo, &args.inpx, config.dump_root.as_deref(), options).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        },
        Err(err) => {
            if let ImportErrorKind::ImportBatchFailed { summary, .. } = &*err {
                print_summary(summary);
            }
            Err(err.raise(ErrorKind::Import))
        },
    }
}

fn print_summary(summary: &ImportSummary) {
    if summary.dry_run {
        println!("Dry run, nothing was committed.");
    }
    println!("Imported:  {}", summary.imported);
    println!("Updated:   {}", summary.updated);
    println!("Unchanged: {}", summary.unchanged);
    println!("Malformed: {}", summary.malformed);
    println!("Batches:   {}", summary.batches_committed);
    for failed in &summary.failed_batches {
        println!("Failed batch starting at LIBID {} ({} records)", failed.first_id, failed.records);
    }
}

async fn search(db: &Database, args: &SearchArgs) -> Result<()> {
    let repo = Repository::from(db);
    let mut query = OsString::new();
    for (i, word) in args.query.iter().enumerate() {
        if i > 0 {
            query.push(" ");
        }
        query.push(word);
    }
    let views = search_bytes(&repo, query.as_encoded_bytes()).await.or_raise(|| ErrorKind::Search)?;
    for view in &views {
        if args.json {
            println!("{}", serde_json::to_string(view).or_raise(|| ErrorKind::Search)?);
        } else {
            println!("{view}");
        }
    }
    tracing::info!(matches = views.len(), "search complete");
    Ok(())
}
