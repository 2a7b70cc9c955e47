use anyhow::Result;
use archflow::app::config::EngineConfig;
use archflow::app::engine::KnowledgeEngine;
use archflow::cli;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "archflow")]
#[command(version)]
#[command(about = "Class relationships, request flows and change impact for object-oriented codebases", long_about = None)]
struct Cli {
    /// Parser output (projects plus per-file class descriptors) as JSON
    #[arg(short, long, global = true, default_value = "snapshot.json")]
    snapshot: PathBuf,

    /// Codebase root holding archflow.toml and the knowledge-base directory
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Knowledge-base directory (overrides archflow.toml)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Worker threads for classification and hashing (overrides archflow.toml)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full scan: build everything and record fresh state
    Scan,

    /// Incremental update against the recorded state
    Update,

    /// Delete recorded state and scan again
    Refresh,

    /// Predict what a change to the given files affects
    Impact {
        /// Changed source files
        #[arg(required = true)]
        files: Vec<String>,

        /// Maximum upstream hops (overrides archflow.toml)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Export the dependency graph as JSON
    Graph,

    /// List reconstructed request flows
    Flows,

    /// Show a class and its dependencies
    Inspect {
        /// Short or fully-qualified class name
        name: String,

        /// Prefer candidates from this namespace
        #[arg(long)]
        namespace: Option<String>,
    },
}

fn main() {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    if let Err(e) = run(args) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Cli) -> Result<()> {
    let mut config = EngineConfig::load(&args.root)?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let engine = KnowledgeEngine::open(&args.snapshot, &args.root, config)?;
    let json = args.json;

    match args.command {
        Commands::Scan => cli::scan(&engine, json),
        Commands::Update => cli::update(&engine, json),
        Commands::Refresh => cli::refresh(&engine, json),
        Commands::Impact { files, depth } => cli::impact(&engine, &files, depth, json),
        Commands::Graph => cli::graph(&engine),
        Commands::Flows => cli::flows(&engine, json),
        Commands::Inspect { name, namespace } => {
            cli::inspect(&engine, &name, namespace.as_deref(), json)
        }
    }
}
