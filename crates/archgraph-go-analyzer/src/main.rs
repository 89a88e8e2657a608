use std::fs;
use std::path::PathBuf;

use archgraph_go_analyzer::analyze_module;
use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "archgraph-go-analyzer")]
#[command(about = "Extract packages, routes and roles of a Go module as JSON", long_about = None)]
struct Cli {
    /// Write the document to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory holding go.mod
    root: PathBuf,
}

/// Diagnostics go to stderr; stdout carries only the document.
fn init_logging() {
    let filter = EnvFilter::try_from_env("ARCHGRAPH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("archgraph_go_analyzer=warn"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    init_logging();
    let cli = Cli::parse();

    let analysis = analyze_module(&cli.root)
        .wrap_err_with(|| format!("Failed to analyze {}", cli.root.display()))?;
    let json = serde_json::to_string(&analysis)?;

    match cli.output {
        Some(path) => fs::write(&path, json)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
