//! Courier library root.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod queue;
pub mod store;
pub mod web;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use core::{ConversationQuery, ConversationService, IngestConfig, Ingestor, Message, StepOutcome};
pub use error::{Error, Result};
pub use queue::{FileQueue, MemoryQueue, MessageQueue};
pub use store::{MessageStore, SqliteStore};
