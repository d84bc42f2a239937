//! Hands a blocking search run to the async side.
//!
//! The coordinator runs on tokio's blocking pool and pushes events into a
//! bounded channel; the returned [`SearchStream`] yields them in order.
//! Dropping the stream before its terminal event counts as a client
//! disconnect and cancels the run through the registry.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::coordinator::{ChannelSink, SearchCoordinator};
use crate::events::SearchEvent;
use crate::registry::CancellationRegistry;
use crate::request::ValidatedSearch;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "search worker panicked".to_string()
    }
}

/// Start `search` on a blocking worker and stream its events.
///
/// Must be called from within a tokio runtime.
pub fn spawn_search(coordinator: Arc<SearchCoordinator>, search: ValidatedSearch) -> SearchStream {
    let capacity = coordinator.settings().channel_capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let registry = Arc::clone(coordinator.registry());
    let search_id = search.search_id.clone();
    let worker_id = search_id.clone();

    let worker = tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(tx.clone());
        let result = panic::catch_unwind(AssertUnwindSafe(|| coordinator.run(search, &mut sink)));
        if let Err(payload) = result {
            let message = panic_message(&*payload);
            tracing::error!(search_id = worker_id.as_deref().unwrap_or(""), error = %message, "search worker panicked");
            let _ = tx.blocking_send(SearchEvent::error(message, worker_id.as_deref()));
        }
    });

    SearchStream {
        rx,
        registry,
        search_id,
        finished: false,
        worker: Some(worker),
    }
}

/// Ordered events of one search run.
pub struct SearchStream {
    rx: mpsc::Receiver<SearchEvent>,
    registry: Arc<CancellationRegistry>,
    search_id: Option<String>,
    finished: bool,
    worker: Option<JoinHandle<()>>,
}

impl SearchStream {
    pub fn search_id(&self) -> Option<&str> {
        self.search_id.as_deref()
    }

    /// Whether the terminal event has been yielded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the worker thread to exit. Used by tests and shutdown paths.
    pub async fn join(mut self) {
        while !self.finished {
            if futures::StreamExt::next(&mut self).await.is_none() {
                break;
            }
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Stream for SearchStream {
    type Item = SearchEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.finished = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SearchStream {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(id) = self.search_id.as_deref() {
            if self.registry.cancel_running(id) {
                tracing::info!(search_id = id, "client disconnected, search cancelled");
            }
        }
    }
}
