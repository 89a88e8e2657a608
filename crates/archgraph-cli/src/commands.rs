//! Subcommand implementations.

use std::fs;
use std::path::{Path, PathBuf};

use archgraph_core::config::PROJECT_CONFIG_FILE;
use archgraph_core::{
    analyze_project, Config, DependencyGraph, FileGraphStore, GraphCache, GraphStore, Language,
    ProjectRecord,
};
use color_eyre::eyre::{bail, eyre, WrapErr};
use color_eyre::Result;
use tracing::info;

use crate::spinner::Spinner;
use crate::AnalyzeArgs;

pub fn analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = Config::load_for(&args.root).wrap_err("Failed to load configuration")?;
    if let Some(strategy) = args.strategy {
        config.typescript.strategy = strategy;
    }
    let language = args
        .language
        .as_deref()
        .map(|l| Language::parse(l).ok_or_else(|| eyre!("Unknown language '{}'", l)))
        .transpose()?;

    let spinner = Spinner::new(format!("Analyzing {}", args.root.display()));
    let (language, graph) = match analyze_project(&args.root, language, &config) {
        Ok(result) => result,
        Err(e) => {
            spinner.fail();
            return Err(e).wrap_err_with(|| format!("Failed to analyze {}", args.root.display()));
        }
    };
    spinner.finish(format!("Analyzed {} project {}", language, args.root.display()));
    eprintln!("{}", graph.stats());

    let json = graph.to_json_pretty()?;
    match &args.output {
        Some(path) => {
            fs::write(path, &json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Graph written to {}", path.display());
        }
        None => println!("{}", json),
    }

    if args.save {
        let store = FileGraphStore::with_config(&config.storage);
        let repository = repository_location(&args.root);
        let record = ProjectRecord::new(&repository, language)?.with_graph(&graph)?;
        store.save_project(&record)?;
        info!(project = %record.id, dir = %store.dir().display(), "Project saved");
        eprintln!("Saved as project {} ({})", record.id, record.name);
    }
    Ok(())
}

fn repository_location(root: &Path) -> String {
    root.canonicalize()
        .unwrap_or_else(|_| root.to_path_buf())
        .display()
        .to_string()
}

fn load_graph(path: &Path) -> Result<DependencyGraph> {
    let json =
        fs::read_to_string(path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    DependencyGraph::from_json(&json)
        .wrap_err_with(|| format!("{} is not a graph document", path.display()))
}

pub fn order(path: &Path) -> Result<()> {
    let graph = load_graph(path)?;
    print!("{}", render_order(&graph));
    Ok(())
}

fn render_order(graph: &DependencyGraph) -> String {
    graph
        .analysis_order()
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let marker = if graph.is_entry_point(id) { " (entry)" } else { "" };
            format!("{:>4}. {}{}\n", i + 1, id, marker)
        })
        .collect()
}

pub fn resolve(path: &Path, id: &str) -> Result<()> {
    let graph = load_graph(path)?;
    let id = lookup(&graph, id)?;
    for neighbour in graph.resolve(&id) {
        let direction = if graph.dependencies_of(&id).contains(&neighbour.as_str()) {
            "->"
        } else {
            "<-"
        };
        println!("{} {}", direction, neighbour);
    }
    Ok(())
}

/// Exact identifier, or the single node whose simple name matches.
fn lookup(graph: &DependencyGraph, id: &str) -> Result<String> {
    if graph.contains(id) {
        return Ok(id.to_string());
    }
    match graph.find_by_simple_name(id).as_slice() {
        [] => bail!("Unknown node '{}'", id),
        [only] => Ok(only.to_string()),
        many => bail!("'{}' is ambiguous: {}", id, many.join(", ")),
    }
}

pub fn projects(json: bool) -> Result<()> {
    let config = Config::load().wrap_err("Failed to load configuration")?;
    let store = FileGraphStore::with_config(&config.storage);
    let records = store.list_projects_with_graph()?;

    let cache = GraphCache::new();
    let summary = cache.warm_from_store(&store)?;

    if json {
        let listing: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "name": r.name,
                    "repository": r.repository,
                    "language": r.language,
                    "analyzedAt": r.analyzed_at,
                    "nodes": cache.get(&r.id).map(|g| g.node_count()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No stored projects. Use 'archgraph analyze <root> --save' to add one.");
        return Ok(());
    }
    for record in &records {
        let nodes = match cache.get(&record.id) {
            Some(graph) => format!("{} nodes", graph.node_count()),
            None => "corrupted".to_string(),
        };
        println!(
            "{}  {:<24} {:<10} {}  {}",
            record.id,
            record.name,
            record.language.as_str(),
            record.analyzed_at.format("%Y-%m-%d %H:%M"),
            nodes
        );
    }
    if !summary.skipped.is_empty() {
        eprintln!("{} stored graph(s) failed verification", summary.skipped.len());
    }
    Ok(())
}

pub fn init(force: bool) -> Result<()> {
    let path = PathBuf::from(PROJECT_CONFIG_FILE);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    fs::write(&path, Config::default_config_string())
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
