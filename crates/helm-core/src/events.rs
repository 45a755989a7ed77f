//! Orchestrator event bus (spec §6) and the Driver's internal events
//! (spec §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A page target identifier, carried on most events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageId {
    #[serde(rename = "pageId")]
    pub page_id: String,
}

/// The kind of a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum LogKind {
    Request,
    Response,
    Error,
    PageError,
    Navigation,
    Console,
    RequestFailed,
    BrowserError,
    Recording,
}

/// A structured log event surfaced on the Orchestrator's event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Metadata describing a page recording started by a plugin or caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingEvent {
    pub page_id: String,
    pub path: String,
    pub started_at: DateTime<Utc>,
}

/// A state-change notification for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangeEvent {
    pub from: String,
    pub to: String,
}

/// Everything the Orchestrator can emit on its public event bus (spec §6),
/// plus the Driver's internal events (spec §4.2), which the Orchestrator
/// forwards or translates into the former.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A structured log line.
    Log(LogEvent),
    /// A page recording started.
    Recording(RecordingEvent),
    /// The session (or a page within it) has closed.
    Close(PageId),
    /// Session state machine transitioned.
    StateChange(StateChangeEvent),
    /// The Driver lost its CDP connection to the browser.
    Disconnected,
    /// The Driver observed a new page target.
    TargetCreated(PageId),
    /// The Driver observed a target navigate or otherwise change.
    TargetChanged(PageId),
    /// The Driver (or a component it forwards for) hit an unrecoverable error.
    Error(String),
    /// A page attempted a `file://` navigation; the runtime must shut down
    /// (spec §4.5 step 2 hard invariant).
    FileProtocolAbort,
}

pub type EventSender = tokio::sync::broadcast::Sender<RuntimeEvent>;
pub type EventReceiver = tokio::sync::broadcast::Receiver<RuntimeEvent>;

/// Default capacity for the Orchestrator's broadcast event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
