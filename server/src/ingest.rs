//! POST /message — accept a message into the void.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{error, info};

use crate::error::VoidError;
use crate::session::SessionIdentity;
use crate::state::AppState;
use crate::types::{Colour, NewMessage, Position};

/// Form field carrying the message text.
const MESSAGE_FIELD: &str = "message";

/// Axum handler for POST /message.
///
/// A freshly issued identity gets its cookie on every response, including
/// rejections, so the browser keeps its colour on the next attempt.
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, VoidError> {
    let identity = state.sessions.identity_for(&headers).inspect_err(|e| {
        error!("error getting session ID: {e}");
    })?;

    let mut response = match ingest(&state, identity, multipart).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => e.into_response(),
    };
    if identity.fresh {
        let cookie = state.sessions.set_cookie(identity)?;
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Parse, validate, stamp and store one submission.
async fn ingest(
    state: &AppState,
    identity: SessionIdentity,
    multipart: Multipart,
) -> Result<(), VoidError> {
    let text = read_message_field(multipart).await.inspect_err(|e| {
        error!(session_id = identity.id, "error parsing form: {e}");
    })?;
    let text = validate(text, state.config.max_message_len).inspect_err(|e| {
        error!(session_id = identity.id, "rejected message: {e}");
    })?;

    let message = compose(text, identity, Utc::now(), &mut rand::thread_rng());
    let (colour, position) = (message.colour.clone(), message.position);
    let id = state.store.insert(message);

    info!(
        session_id = identity.id,
        message_id = %id,
        colour = %colour,
        x = position.x,
        y = position.y,
        "message saved"
    );
    Ok(())
}

/// First `message` field of the form, if any.
async fn read_message_field(mut multipart: Multipart) -> Result<Option<String>, VoidError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(MESSAGE_FIELD) {
            return Ok(Some(field.text().await?));
        }
    }
    Ok(None)
}

/// Reject missing, empty and over-long messages.
pub fn validate(text: Option<String>, max_len: usize) -> Result<String, VoidError> {
    let text = text.filter(|t| !t.is_empty()).ok_or(VoidError::EmptyMessage)?;
    if text.chars().count() > max_len {
        return Err(VoidError::MessageTooLong { max: max_len });
    }
    Ok(text)
}

/// Stamp a validated message with its colour, position and creation time.
pub fn compose<R: Rng + ?Sized>(
    text: String,
    identity: SessionIdentity,
    now: DateTime<Utc>,
    rng: &mut R,
) -> NewMessage {
    NewMessage {
        text,
        created_at: now,
        colour: Colour::from_identity(identity.id),
        position: Position::random(rng),
    }
}
