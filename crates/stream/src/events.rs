//! Typed search events.
//!
//! On the wire each event is one JSON object with a `type` discriminator and a
//! nullable `searchId` echo:
//!
//! ```json
//! {"type":"progress","processed":3,"total":12,"matches":1,"searchId":"abc"}
//! ```

use chrono::{SecondsFormat, Utc};
use matcher::MatchResult;
use serde::{Deserialize, Serialize};

/// Width of the comment frame sent before the first event.
pub const PADDING_WIDTH: usize = 2048;

/// Whitespace-only comment body that pushes proxies past their buffering
/// threshold. Consumers ignore it.
pub fn padding_comment() -> String {
    " ".repeat(PADDING_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Landing,
    Browsing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    Hello {
        ts: String,
    },
    Progress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        phase: Option<Phase>,
        processed: usize,
        total: Option<usize>,
        matches: usize,
    },
    Meta {
        links: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seller: Option<String>,
    },
    Match {
        item: MatchResult,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seller: Option<String>,
    },
    Cancelled,
    Error {
        message: String,
    },
    Done,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Hello { .. } => "hello",
            EventKind::Progress { .. } => "progress",
            EventKind::Meta { .. } => "meta",
            EventKind::Match { .. } => "match",
            EventKind::Cancelled => "cancelled",
            EventKind::Error { .. } => "error",
            EventKind::Done => "done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub search_id: Option<String>,
}

impl SearchEvent {
    pub fn new(kind: EventKind, search_id: Option<&str>) -> Self {
        Self {
            kind,
            search_id: search_id.map(str::to_string),
        }
    }

    pub fn hello(search_id: Option<&str>) -> Self {
        let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::new(EventKind::Hello { ts }, search_id)
    }

    pub fn done(search_id: Option<&str>) -> Self {
        Self::new(EventKind::Done, search_id)
    }

    pub fn cancelled(search_id: Option<&str>) -> Self {
        Self::new(EventKind::Cancelled, search_id)
    }

    pub fn error(message: impl Into<String>, search_id: Option<&str>) -> Self {
        Self::new(
            EventKind::Error {
                message: message.into(),
            },
            search_id,
        )
    }

    /// `done`, `cancelled` and `error` end a stream; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Done | EventKind::Cancelled | EventKind::Error { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
