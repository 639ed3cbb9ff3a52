//! Web server module (Axum + API).

pub mod api;
pub mod router;
pub mod server;

use std::sync::Arc;

use crate::core::ConversationService;
use crate::store::MessageStore;

pub use router::create_app_router;
pub use server::{run_server, WebServerConfig};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub conversations: ConversationService,
}

impl AppState {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self {
            conversations: ConversationService::new(store),
        }
    }
}
