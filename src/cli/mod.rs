//! CLI commands for Courier using clap.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::{load_settings, Settings};
use crate::core::{encode_checked, ConversationQuery, ConversationService, Ingestor};
use crate::queue::{inbox_key, FileQueue, MessageQueue};
use crate::store::{MessageStore, SqliteStore};
use crate::web::{self, AppState, WebServerConfig};

/// Courier - queue-fed message ingestion with per-recipient inboxes.
#[derive(Parser)]
#[command(name = "courier")]
#[command(version)]
#[command(about = "Courier - point-to-point message ingestion and history API", long_about = None)]
pub struct Commands {
    /// SQLite message database (overrides store.path)
    #[arg(long, global = true, env = "COURIER_DB")]
    pub db: Option<PathBuf>,

    /// Queue root directory (overrides queue.dir)
    #[arg(long, global = true, env = "COURIER_QUEUE_DIR")]
    pub queue_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the ingestion loop and serve the history API
    Serve(ServeArgs),

    /// Push a message onto the intake queue
    Send {
        /// Sender id
        #[arg(long)]
        from: String,

        /// Recipient id
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        content: Vec<String>,
    },

    /// Print conversation history
    History {
        /// User whose messages to list
        user: String,

        /// Only messages exchanged with this peer
        #[arg(long)]
        peer: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Queue operations
    Queue {
        #[command(subcommand)]
        action: QueueCommand,
    },
}

#[derive(Args)]
pub struct ServeArgs {
    /// Bind address (overrides server.host)
    #[arg(long, env = "COURIER_HOST")]
    pub host: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(long, env = "COURIER_PORT")]
    pub port: Option<u16>,
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// Show pending intake items
    Stats,

    /// Show a user's inbox without consuming it
    Inbox {
        /// Inbox owner
        user: String,
    },
}

impl Commands {
    /// Settings file values with the global flag overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = load_settings()?;
        if let Some(db) = &self.db {
            settings.store.path = Some(db.clone());
        }
        if let Some(dir) = &self.queue_dir {
            settings.queue.dir = Some(dir.clone());
        }
        Ok(settings)
    }

    pub async fn run(&self, settings: Settings) -> Result<()> {
        match &self.command {
            Command::Serve(args) => cmd_serve(settings, args).await,
            Command::Send { from, to, content } => cmd_send(&settings, from, to, &content.join(" ")).await,
            Command::History { user, peer, json } => cmd_history(&settings, user, peer.clone(), *json).await,
            Command::Queue { action } => cmd_queue(&settings, action).await,
        }
    }
}

fn open_store(settings: &Settings) -> Result<Arc<dyn MessageStore>> {
    let path = settings.store_path()?;
    let store = SqliteStore::open_with_busy_timeout(&path, settings.busy_timeout())
        .with_context(|| format!("opening message store {}", path.display()))?;
    Ok(Arc::new(store))
}

fn open_queue(settings: &Settings) -> Result<Arc<dyn MessageQueue>> {
    let dir = settings.queue_dir()?;
    let queue = FileQueue::open(&dir)
        .with_context(|| format!("opening queue {}", dir.display()))?;
    Ok(Arc::new(queue))
}

// Command implementations

async fn cmd_serve(mut settings: Settings, args: &ServeArgs) -> Result<()> {
    if let Some(host) = &args.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }

    // Any failure up to here is fatal: no retry, no degraded mode.
    let store = open_store(&settings)?;
    let queue = open_queue(&settings)?;
    let listener = web::server::bind(&WebServerConfig::from(settings.server.clone())).await?;

    let cancel = CancellationToken::new();
    let ingest = Ingestor::new(queue, store.clone(), settings.ingest_config()).spawn(cancel.clone());

    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            on_signal.cancel();
        }
    });

    let served = web::server::serve(listener, AppState::new(store), cancel.clone()).await;

    cancel.cancel();
    if let Err(e) = ingest.await {
        tracing::error!("Ingestion task failed: {}", e);
    }

    served.map_err(Into::into)
}

async fn cmd_send(settings: &Settings, from: &str, to: &str, content: &str) -> Result<()> {
    let raw = encode_checked(from, to, content)
        .with_context(|| format!("refusing to send {} -> {}", from, to))?;

    let queue = open_queue(settings)?;
    queue.push(&settings.queue.intake, &raw).await?;

    println!("Queued message {} -> {}", from, to);
    Ok(())
}

async fn cmd_history(settings: &Settings, user: &str, peer: Option<String>, json: bool) -> Result<()> {
    let service = ConversationService::new(open_store(settings)?);
    let messages = service.history(&ConversationQuery::new(user, peer)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    if messages.is_empty() {
        println!("No messages.");
    }
    for msg in &messages {
        println!(
            "[{}] {} -> {}: {}",
            msg.timestamp.format("%Y-%m-%d %H:%M:%S"),
            msg.sender,
            msg.recipient,
            msg.content
        );
    }
    Ok(())
}

async fn cmd_queue(settings: &Settings, action: &QueueCommand) -> Result<()> {
    let queue = open_queue(settings)?;

    match action {
        QueueCommand::Stats => {
            let pending = queue.len(&settings.queue.intake).await?;
            println!("Queue Stats:");
            println!("  Intake:  {}", settings.queue.intake);
            println!("  Pending: {}", pending);
        }
        QueueCommand::Inbox { user } => {
            let items = queue.peek_all(&inbox_key(user)).await?;
            if items.is_empty() {
                println!("Inbox for {} is empty.", user);
            }
            for item in items {
                println!("{}", item);
            }
        }
    }
    Ok(())
}
