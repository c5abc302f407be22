//! locol-graph command line
//!
//! Reads a collector configuration document against a component catalog and
//! checks, reformats, summarises or saves it.

use anyhow::Context;
use clap::{Parser, Subcommand};
use locol_graph::{
    autosave::{
        AutosaveScheduler, AutosavedGraph, ConfigSnapshot, ConfigStore, DirectoryStore, MemoryStore,
    },
    document, ComponentCatalog, ConfigGraph, EngineConfig, SaveStatus, Stage,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "locol-graph")]
#[command(about = "Collector configuration graph tool", long_about = None)]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Component catalog JSON (overrides the settings file)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report constraint violations and missing required fields
    Check { config: PathBuf },

    /// Print the canonical form of a document
    Fmt {
        config: PathBuf,

        /// Rewrite the file in place
        #[arg(short, long)]
        write: bool,
    },

    /// Print pipelines and their stages
    Graph { config: PathBuf },

    /// Import a document and store it as a new version
    Save {
        config: PathBuf,

        /// Collector id (overrides the settings file)
        #[arg(long)]
        collector: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,locol_graph=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load_or_default(),
    };
    let catalog = load_catalog(cli.catalog.as_deref().or(settings.catalog.path.as_deref()))?;

    match cli.cmd {
        Commands::Check { config } => {
            let graph = import(&config, &catalog, &settings)?;
            let reports = graph.validate();
            for report in &reports {
                for violation in &report.violations {
                    println!("{} {}: {}", report.kind, report.name, violation);
                }
            }
            if !reports.is_empty() {
                anyhow::bail!("{} instance(s) with violations", reports.len());
            }
            println!("ok");
        }
        Commands::Fmt { config, write } => {
            let graph = import(&config, &catalog, &settings)?;
            let text = document::to_yaml(&graph)?;
            if write {
                std::fs::write(&config, text).with_context(|| format!("writing {:?}", config))?;
            } else {
                print!("{}", text);
            }
        }
        Commands::Graph { config } => {
            let graph = import(&config, &catalog, &settings)?;
            print_summary(&graph);
        }
        Commands::Save { config, collector } => {
            let collector_id = collector.unwrap_or_else(|| settings.autosave.collector_id.clone());
            let store: Arc<dyn ConfigStore> = match settings.store_directory() {
                Some(dir) => Arc::new(DirectoryStore::new(dir)),
                None => {
                    tracing::warn!("No store directory available, saving in memory only");
                    Arc::new(MemoryStore::new())
                }
            };

            if !settings.autosave.enabled {
                let graph = import(&config, &catalog, &settings)?;
                let snapshot = ConfigSnapshot::capture(&graph)?;
                let version = store.save_version(&collector_id, &snapshot, false).await?;
                store.set_current(&collector_id, version).await?;
                println!("saved {}", version);
                return Ok(());
            }

            let text = std::fs::read_to_string(&config).with_context(|| format!("reading {:?}", config))?;
            let handle = AutosaveScheduler::spawn(store, collector_id, settings.autosave.debounce());
            let mut graph = AutosavedGraph::new(ConfigGraph::default(), handle);
            graph.edit(|g| g.import_yaml(&text, &catalog, &settings.import))?;

            let status = graph.subscribe();
            let graph = graph.close().await;
            match status.as_ref().map(|rx| rx.borrow().clone()) {
                Some(SaveStatus::Saved { version }) => println!(
                    "saved {} ({} instances, {} pipelines)",
                    version,
                    graph.instances().count(),
                    graph.pipelines().len()
                ),
                Some(SaveStatus::Failed { message }) => anyhow::bail!("save failed: {}", message),
                _ => println!("nothing to save"),
            }
        }
    }

    Ok(())
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<ComponentCatalog> {
    match path {
        Some(path) => Ok(ComponentCatalog::load(path)?),
        None => {
            tracing::warn!("No component catalog configured, every component is treated as custom");
            Ok(ComponentCatalog::default())
        }
    }
}

fn import(path: &Path, catalog: &ComponentCatalog, settings: &EngineConfig) -> anyhow::Result<ConfigGraph> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let mut graph = ConfigGraph::default();
    graph
        .import_yaml(&text, catalog, &settings.import)
        .with_context(|| format!("parsing {:?}", path))?;
    Ok(graph)
}

fn print_summary(graph: &ConfigGraph) {
    if !graph.version().is_empty() {
        println!("collector {}", graph.version());
    }
    let mut pipelines: Vec<_> = graph.pipelines().iter().collect();
    pipelines.sort_by(|a, b| a.name.cmp(&b.name));

    for pipeline in pipelines {
        println!("{}", pipeline.name);
        for stage in Stage::ALL {
            let names = graph.stage_names(pipeline, stage);
            if !names.is_empty() {
                println!("  {:<10} {}", stage.key(), names.join(" -> "));
            }
        }
    }

    let unattached: Vec<&str> = graph
        .instances()
        .filter(|i| i.kind().stage().is_some() && !graph.is_referenced(i.id))
        .map(|i| i.name.as_str())
        .collect();
    if !unattached.is_empty() {
        println!("unattached: {}", unattached.join(", "));
    }
}
