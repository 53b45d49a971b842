//! Admin CLI over the stammdaten record store.
//!
//! Everything user-facing in the daycare portal goes through the store's
//! repository surface; this binary is the thin maintenance entry point
//! for the same surface (health checks, listing, spot edits).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use stammdaten_core::{
    AppConfig, ReadCache, Record, RecordStore, SheetsBackend, StorageMode, Tab, WorkbookBackend,
};

#[derive(Parser)]
#[command(name = "stammdaten")]
#[command(about = "Inspect and maintain the daycare record store")]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable and list its tabs
    Health,
    /// List all records of a tab as JSON
    List {
        /// Tab name (children, parents, pickup_authorizations,
        /// medications, photo_meta, consents)
        tab: String,
    },
    /// Fetch one record by its id
    Get {
        tab: String,
        id: String,
    },
    /// Add a child record
    AddChild {
        /// Child name
        name: String,
        /// Parent email used for the portal login
        #[arg(long)]
        parent_email: String,
        /// Group the child joins
        #[arg(long)]
        group: Option<String>,
    },
    /// Delete a child record
    DeleteChild {
        child_id: String,
    },
    /// Create the local workbook file with all tabs and headers
    InitLocal,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => AppConfig::config_path()?,
    };
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    match cli.command {
        Commands::Health => cmd_health(&config).await,
        Commands::List { tab } => cmd_list(&config, &tab).await,
        Commands::Get { tab, id } => cmd_get(&config, &tab, &id).await,
        Commands::AddChild {
            name,
            parent_email,
            group,
        } => cmd_add_child(&config, name, parent_email, group).await,
        Commands::DeleteChild { child_id } => cmd_delete_child(&config, &child_id).await,
        Commands::InitLocal => cmd_init_local(&config),
    }
}

fn build_store(config: &AppConfig) -> Result<RecordStore> {
    let backend: Arc<dyn stammdaten_core::BackendPort> = match config.storage_mode {
        StorageMode::Google => Arc::new(SheetsBackend::new(config.google()?)),
        StorageMode::Local => {
            let backend = WorkbookBackend::new(&config.local()?.workbook_file);
            backend.ensure_workbook()?;
            Arc::new(backend)
        }
    };

    Ok(RecordStore::with_parts(
        backend,
        ReadCache::new(config.cache_ttl()),
        config.retry.clone(),
    ))
}

fn parse_tab(name: &str) -> Result<Tab> {
    match Tab::from_name(name) {
        Some(tab) => Ok(tab),
        None => bail!(
            "Unknown tab '{}'. Expected one of: {}",
            name,
            Tab::all().map(|t| t.as_str()).join(", ")
        ),
    }
}

async fn cmd_health(config: &AppConfig) -> Result<()> {
    let store = build_store(config)?;
    let tabs = store.health_check().await.context("Backend health check failed")?;

    println!("Backend is reachable. Tabs:");
    for tab in tabs {
        println!("  {tab}");
    }
    Ok(())
}

async fn cmd_list(config: &AppConfig, tab: &str) -> Result<()> {
    let tab = parse_tab(tab)?;
    let store = build_store(config)?;
    let records = store.repository_for(tab).list().await?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cmd_get(config: &AppConfig, tab: &str, id: &str) -> Result<()> {
    let tab = parse_tab(tab)?;
    let store = build_store(config)?;
    let record = store.repository_for(tab).get_by_id(id).await?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

async fn cmd_add_child(
    config: &AppConfig,
    name: String,
    parent_email: String,
    group: Option<String>,
) -> Result<()> {
    let store = build_store(config)?;

    let mut fields = Record::new();
    fields.set("name", &name);
    fields.set("parent_email", &parent_email);
    if let Some(group) = group {
        fields.set("group", &group);
    }

    let child_id = store.children().add(fields).await?;
    println!("Added child '{name}' with id {child_id}");
    Ok(())
}

async fn cmd_delete_child(config: &AppConfig, child_id: &str) -> Result<()> {
    let store = build_store(config)?;
    store.children().delete(child_id).await?;
    println!("Deleted child {child_id}");
    Ok(())
}

fn cmd_init_local(config: &AppConfig) -> Result<()> {
    let local = config.local()?;
    let backend = WorkbookBackend::new(&local.workbook_file);
    backend.ensure_workbook()?;

    println!("Workbook ready at {}", local.workbook_file.display());
    Ok(())
}
