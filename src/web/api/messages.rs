//! API endpoint for conversation history.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::core::{ConversationQuery, Message, QueryError};
use crate::web::AppState;

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub user: Option<String>,
    pub peer: Option<String>,
}

impl From<MessagesQuery> for ConversationQuery {
    fn from(query: MessagesQuery) -> Self {
        ConversationQuery::new(query.user.unwrap_or_default(), query.peer)
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::InvalidRequest => StatusCode::BAD_REQUEST,
            QueryError::StorageUnavailable(e) => {
                tracing::error!("Store error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

/// List messages for a user, optionally restricted to one peer.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, QueryError> {
    tracing::info!(
        "/messages requested: user={} peer={}",
        query.user.as_deref().unwrap_or(""),
        query.peer.as_deref().unwrap_or("")
    );

    let messages = state.conversations.history(&query.into()).await?;

    tracing::info!("Returning {} messages", messages.len());
    Ok(Json(messages))
}
