//! Streaming search and cancellation.
//!
//! `POST /api/search/stream` answers `text/event-stream`: a whitespace
//! comment frame first, then one `data:` frame per [`SearchEvent`], ending
//! with exactly one `done`, `cancelled` or `error`. Keep-alive comments fill
//! quiet stretches while a slow listing loads.

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{self, HeaderName, HeaderValue};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self as event_stream, BoxStream};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stream::{padding_comment, spawn_search, SearchEvent, SearchRequest, Validated};

static X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

type SseStream = BoxStream<'static, Result<Event, axum::Error>>;

fn to_frame(event: SearchEvent) -> Result<Event, axum::Error> {
    Event::default().json_data(&event)
}

/// Run a search and stream its events.
///
/// Malformed bodies and invalid fields are rejected with 400 before any
/// browsing session is opened. Dropping the connection cancels the run.
pub async fn search_stream(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(request) =
        payload.map_err(|rejection| ServerError::BadRequest(rejection.body_text()))?;
    let validated = request.validate(state.coordinator.settings())?;

    let events: SseStream = match validated {
        Validated::Search(search) => {
            tracing::info!(
                search_id = search.search_id.as_deref().unwrap_or(""),
                mode = search.mode(),
                max_items = search.max_items,
                max_links = search.max_links,
                "search accepted"
            );
            spawn_search(Arc::clone(&state.coordinator), search)
                .map(to_frame)
                .boxed()
        }
        Validated::Unsupported {
            category,
            search_id,
        } => {
            tracing::info!(category = %category, "unsupported category, nothing to crawl");
            event_stream::iter([SearchEvent::done(search_id.as_deref())])
                .map(to_frame)
                .boxed()
        }
    };

    let padding = event_stream::iter([Ok::<_, axum::Error>(
        Event::default().comment(padding_comment()),
    )]);
    let sse = Sse::new(padding.chain(events))
        .keep_alive(KeepAlive::new().interval(state.config.keep_alive()));

    Ok((
        [
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-transform"),
            ),
            (X_ACCEL_BUFFERING.clone(), HeaderValue::from_static("no")),
        ],
        sse,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    #[serde(default)]
    pub search_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Flag a search as cancelled.
///
/// Always answers 200; a missing or blank id is reported in the body. A
/// cancel for an id that has not started yet is remembered for a while and
/// applied when that search registers.
pub async fn cancel_search(
    State(state): State<Arc<ServerState>>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Json<CancelResponse> {
    let search_id = payload
        .ok()
        .and_then(|Json(request)| request.search_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());

    let Some(search_id) = search_id else {
        return Json(CancelResponse {
            ok: false,
            search_id: None,
            error: Some("missing searchId".to_string()),
        });
    };

    let running = state.registry().cancel(&search_id);
    tracing::info!(search_id = %search_id, running, "cancel requested");

    Json(CancelResponse {
        ok: true,
        search_id: Some(search_id),
        error: None,
    })
}
