//! Core module - message codec, ingestion loop, and conversation history.
//!
//! - `message`:      the message model and its `sender|recipient|content` wire form
//! - `ingest`:       the single consumer that moves intake items into the store and inboxes
//! - `conversation`: read-side lookups over the store

pub mod conversation;
pub mod ingest;
pub mod message;

pub use conversation::{ConversationQuery, ConversationService, QueryError};
pub use ingest::{IngestConfig, Ingestor, StepOutcome};
pub use message::{decode, encode, encode_checked, DecodeError, Envelope, Message};
