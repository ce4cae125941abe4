// ─── Progress Events ───
// One stream of events out of the core. Observers render them; nothing
// flows back in.

use serde::Serialize;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Status,
    Check,
    DownloadStart,
    DownloadSuccess,
    Error,
    Summary,
    Done,
}

/// Which project an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectLabel {
    pub title: String,
    pub slug: String,
    pub color: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub project: Option<ProjectLabel>,
    pub version: Option<String>,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            project: None,
            version: None,
            message: message.into(),
        }
    }

    pub fn for_project(mut self, project: &ProjectLabel) -> Self {
        self.project = Some(project.clone());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Cloneable sending half. Emitting never blocks and never fails: with no
/// observer attached, or once it has gone away, events are dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn status(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::new(EventKind::Status, message));
    }
}
