mod commands;
mod spinner;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "archgraph")]
#[command(about = "Dependency graphs of Java, TypeScript and Go projects", long_about = None)]
struct Cli {
    /// Debug logging for archgraph crates
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dependency graph of a project
    Analyze(AnalyzeArgs),
    /// Print the analysis order of a saved graph
    Order {
        /// Graph document written by `analyze`
        graph: PathBuf,
    },
    /// Print the neighbours of a node in a saved graph
    Resolve {
        /// Graph document written by `analyze`
        graph: PathBuf,
        /// Node identifier or its simple name
        id: String,
    },
    /// List stored projects
    Projects {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write a default archgraph.toml into the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Project root
    pub root: PathBuf,

    /// Skip ecosystem detection
    #[arg(short, long, value_parser = ["java", "typescript", "ts", "javascript", "go"])]
    pub language: Option<String>,

    /// TypeScript analysis strategy
    #[arg(short, long, value_parser = ["heuristic", "syntax-tree", "regex", "ast"])]
    pub strategy: Option<String>,

    /// Write the graph document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Store the graph in the project store
    #[arg(long)]
    pub save: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("archgraph=debug,archgraph_core=debug")
    } else {
        EnvFilter::try_from_env("ARCHGRAPH_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("archgraph_core=warn,archgraph=info"))
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => commands::analyze(args),
        Commands::Order { graph } => commands::order(&graph),
        Commands::Resolve { graph, id } => commands::resolve(&graph, &id),
        Commands::Projects { json } => commands::projects(json),
        Commands::Init { force } => commands::init(force),
    }
}
