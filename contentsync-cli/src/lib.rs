//! Command line control surface for contentsync.
//!
//! Wires a SQLite binding store, a JSON content snapshot and the HTTP search
//! client into a [`SyncEngine`] and exposes its commands. Every command except
//! `credentials` bootstraps the engine first, the way a CMS plugin does on
//! startup.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contentsync_engine::{
    CollectingErrorSink, HandlerFailure, LifecycleDispatcher, LifecycleEvent,
    MemoryContentRepository, RuntimeContext, SyncConfig, SyncEngine,
};
use contentsync_remote::{HttpSearchClient, SearchClientConfig};
use contentsync_store::{BindingStore, SqliteKeyValueStore};
use contentsync_types::{ContentTypeId, Credentials};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "contentsync")]
#[command(about = "Keep search indexes in sync with CMS content", version)]
pub struct Cli {
    /// Path to the SQLite binding store
    #[arg(long, env = "CONTENTSYNC_DB", default_value = "contentsync.db", global = true)]
    pub db: PathBuf,

    /// Path to the JSON content snapshot
    #[arg(long, env = "CONTENTSYNC_CONTENT", default_value = "content.json", global = true)]
    pub content: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show or change the search service credentials
    #[command(subcommand)]
    Credentials(CredentialsCommand),

    /// Index a content type and subscribe it to lifecycle events
    Enable {
        content_type: String,
        /// Searchable field (repeatable); all fields when omitted
        #[arg(long = "field")]
        fields: Vec<String>,
        /// Target index (repeatable); stored or collection name when omitted
        #[arg(long = "index")]
        indexes: Vec<String>,
    },

    /// Remove a content type from its indexes
    Disable { content_type: String },

    /// Rebuild a content type's indexes with its stored settings
    Reconfigure { content_type: String },

    /// Print the status of every content type and index
    Report,

    /// Reconcile bindings and print the subscribed content types
    Bootstrap,

    /// Dispatch lifecycle events from a JSON file and wait for their handlers
    Replay { events: PathBuf },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CredentialsCommand {
    /// Print the stored credentials with the API key redacted
    Show,
    /// Store new credentials
    Set {
        #[arg(long, env = "CONTENTSYNC_HOST")]
        host: String,
        #[arg(long = "api-key", env = "CONTENTSYNC_API_KEY", hide_env_values = true)]
        api_key: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsView {
    host: String,
    api_key: String,
}

impl From<&Credentials> for CredentialsView {
    fn from(credentials: &Credentials) -> Self {
        Self {
            host: credentials.host.clone(),
            api_key: if credentials.api_key.is_empty() {
                String::new()
            } else {
                "<redacted>".to_string()
            },
        }
    }
}

/// Result of a `replay` run.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaySummary {
    pub dispatched: usize,
    /// Events for content types without a subscription.
    pub ignored: usize,
    pub failures: Vec<HandlerFailure>,
}

/// Engine and dispatcher assembled from the command line options.
pub struct Runtime {
    pub engine: Arc<SyncEngine>,
    pub dispatcher: LifecycleDispatcher,
    pub failures: Arc<CollectingErrorSink>,
}

impl Runtime {
    /// Opens the store and loads the content snapshot. A missing snapshot
    /// yields an empty repository.
    pub async fn open(db: &Path, content: &Path) -> Result<Self> {
        let kv = SqliteKeyValueStore::open(db)
            .with_context(|| format!("Failed to open binding store {}", db.display()))?;
        let store = Arc::new(BindingStore::new(Arc::new(kv)));

        let repository = if content.exists() {
            MemoryContentRepository::load(content)
                .await
                .with_context(|| format!("Failed to load content snapshot {}", content.display()))?
        } else {
            warn!("Content snapshot {} not found, no content types known", content.display());
            MemoryContentRepository::new()
        };

        let remote = HttpSearchClient::new(SearchClientConfig::default())
            .context("Failed to build search client")?;

        let failures = Arc::new(CollectingErrorSink::new());
        let ctx = RuntimeContext::new(SyncConfig::default(), failures.clone());
        let engine = Arc::new(SyncEngine::new(
            ctx,
            store,
            Arc::new(repository),
            Arc::new(remote),
        ));

        Ok(Self {
            dispatcher: LifecycleDispatcher::new(engine.clone()),
            engine,
            failures,
        })
    }
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

/// Executes a parsed command line, writing results as JSON to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let runtime = Runtime::open(&cli.db, &cli.content).await?;
    let engine = &runtime.engine;

    if let Command::Credentials(command) = &cli.command {
        return match command {
            CredentialsCommand::Show => {
                let credentials = engine.credentials().await?;
                print_json(out, &CredentialsView::from(&credentials))
            }
            CredentialsCommand::Set { host, api_key } => {
                let credentials = Credentials::new(host.trim(), api_key.trim());
                engine.set_credentials(credentials.clone()).await?;
                print_json(out, &CredentialsView::from(&credentials))
            }
        };
    }

    let subscribed = engine.bootstrap().await?;

    match cli.command {
        Command::Credentials(_) => Ok(()),
        Command::Enable {
            content_type,
            fields,
            indexes,
        } => {
            let content_type = ContentTypeId::new(content_type);
            let tasks = engine
                .enable(&content_type, non_empty(fields), non_empty(indexes))
                .await?;
            info!("Enabled {} with {} remote tasks", content_type, tasks.len());
            print_json(out, &tasks)
        }
        Command::Disable { content_type } => {
            let tasks = engine.disable(&ContentTypeId::new(content_type)).await?;
            print_json(out, &tasks)
        }
        Command::Reconfigure { content_type } => {
            let tasks = engine
                .reconfigure(&ContentTypeId::new(content_type))
                .await?;
            print_json(out, &tasks)
        }
        Command::Report => print_json(out, &engine.report().await?),
        Command::Bootstrap => print_json(out, &subscribed),
        Command::Replay { events } => {
            let summary = replay(&runtime, &events).await?;
            print_json(out, &summary)
        }
    }
}

/// Dispatches every event in a JSON array file and waits for the handlers.
pub async fn replay(runtime: &Runtime, path: &Path) -> Result<ReplaySummary> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read events from {}", path.display()))?;
    let events: Vec<LifecycleEvent> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid events in {}", path.display()))?;

    let mut summary = ReplaySummary::default();
    let mut handles = Vec::new();
    for event in events {
        match runtime.dispatcher.dispatch(event).await {
            Some(handle) => {
                summary.dispatched += 1;
                handles.push(handle);
            }
            None => summary.ignored += 1,
        }
    }
    for handle in handles {
        handle.await.context("Lifecycle handler task failed")?;
    }

    summary.failures = runtime.failures.failures();
    Ok(summary)
}
