// ─── Progress Dashboard ───
// Interactive view of a running sync: a status spinner plus one spinner
// per in-flight download. Ctrl-C only stops the view.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing::info;

use super::colorize;
use crate::core::events::{EventKind, EventReceiver, ProgressEvent};

const TICK: Duration = Duration::from_millis(100);

/// Folded view of the event stream.
#[derive(Debug, Default)]
pub struct DashboardState {
    pub status: String,
    pub checked: u64,
    pub completed: u64,
    pub errors: u64,
    /// Slug to label of downloads in flight.
    pub downloading: HashMap<String, String>,
    pub summary: Option<String>,
    pub done: bool,
}

/// What the terminal should show after an event was folded in.
#[derive(Debug, PartialEq, Eq)]
pub enum Render {
    Nothing,
    Header,
    StartDownload { key: String, label: String },
    FinishDownload { key: String, line: String },
    Line(String),
}

impl DashboardState {
    pub fn apply(&mut self, event: &ProgressEvent) -> Render {
        let title = event
            .project
            .as_ref()
            .map(|p| colorize(&p.title, p.color))
            .unwrap_or_default();
        let key = event
            .project
            .as_ref()
            .map(|p| p.slug.clone())
            .unwrap_or_default();
        let version = event.version.clone().unwrap_or_default();

        match event.kind {
            EventKind::Status if event.project.is_none() => {
                self.status = event.message.clone();
                Render::Header
            }
            EventKind::Status => Render::Nothing,
            EventKind::Check => {
                self.checked += 1;
                self.status = format!("Checking {}...", title);
                Render::Header
            }
            EventKind::DownloadStart => {
                let label = format!("{} ({})", title, version);
                self.downloading.insert(key.clone(), label.clone());
                Render::StartDownload { key, label }
            }
            EventKind::DownloadSuccess => {
                self.downloading.remove(&key);
                self.completed += 1;
                Render::FinishDownload {
                    key,
                    line: format!("✓ {} {}", title, version),
                }
            }
            EventKind::Error => {
                self.errors += 1;
                let line = if title.is_empty() {
                    format!("✗ {}", event.message)
                } else {
                    format!("✗ {}: {}", title, event.message)
                };
                if self.downloading.remove(&key).is_some() {
                    Render::FinishDownload { key, line }
                } else {
                    Render::Line(line)
                }
            }
            EventKind::Summary => {
                self.summary = Some(event.message.clone());
                Render::Nothing
            }
            EventKind::Done => {
                self.done = true;
                self.status = "Finished".into();
                Render::Header
            }
        }
    }

    pub fn header(&self) -> String {
        format!(
            "{}  [{} checked, {} downloaded, {} errors]",
            self.status, self.checked, self.completed, self.errors
        )
    }
}

struct View {
    multi: MultiProgress,
    header: ProgressBar,
    bars: HashMap<String, ProgressBar>,
    state: DashboardState,
}

impl View {
    fn new() -> Self {
        let multi = MultiProgress::new();
        let header = multi.add(ProgressBar::new_spinner());
        header.set_style(spinner_style("{spinner:.green} {msg}"));
        header.enable_steady_tick(TICK);
        header.set_message("Initializing...");
        Self {
            multi,
            header,
            bars: HashMap::new(),
            state: DashboardState::default(),
        }
    }

    fn apply(&mut self, event: &ProgressEvent) {
        match self.state.apply(event) {
            Render::Nothing => {}
            Render::Header => self.header.set_message(self.state.header()),
            Render::StartDownload { key, label } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(spinner_style("  {spinner:.cyan} {msg}"));
                bar.enable_steady_tick(TICK);
                bar.set_message(format!("Downloading {}", label));
                if let Some(old) = self.bars.insert(key, bar) {
                    old.finish_and_clear();
                }
                self.header.set_message(self.state.header());
            }
            Render::FinishDownload { key, line } => {
                if let Some(bar) = self.bars.remove(&key) {
                    bar.finish_and_clear();
                    self.multi.remove(&bar);
                }
                let _ = self.multi.println(line);
                self.header.set_message(self.state.header());
            }
            Render::Line(line) => {
                let _ = self.multi.println(line);
                self.header.set_message(self.state.header());
            }
        }
    }

    fn finish(self) {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
        self.header.finish_with_message(self.state.header());
        if let Some(summary) = &self.state.summary {
            let _ = self.multi.println(summary);
        }
    }

    fn abandon(self) {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
        self.header
            .abandon_with_message("Display stopped; waiting for running downloads to finish...");
    }
}

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Render events until `done` or the sink goes away. After Ctrl-C the
/// remaining events are consumed silently so the sync can finish.
pub async fn run(mut rx: EventReceiver) {
    let mut view = View::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    view.apply(&event);
                    if view.state.done {
                        break;
                    }
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping the dashboard");
                view.abandon();
                while rx.recv().await.is_some() {}
                return;
            }
        }
    }
    view.finish();
}
