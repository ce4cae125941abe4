// Line-per-event observer for `--plain` and non-terminal output.

use crate::core::events::{EventKind, EventReceiver, ProgressEvent};

use super::colorize;

/// Print events until the sink side is dropped.
pub async fn run(mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        if let Some(line) = render_line(&event) {
            println!("{}", line);
        }
    }
}

/// Checks and plain status chatter are left to the log.
pub fn render_line(event: &ProgressEvent) -> Option<String> {
    let title = event
        .project
        .as_ref()
        .map(|p| colorize(&p.title, p.color));
    let version = event.version.as_deref().unwrap_or("?");

    match event.kind {
        EventKind::DownloadSuccess => Some(format!(
            "✓ {} {}",
            title.unwrap_or_default(),
            version
        )),
        EventKind::Error => Some(match title {
            Some(title) => format!("✗ {}: {}", title, event.message),
            None => format!("✗ {}", event.message),
        }),
        EventKind::Summary => Some(event.message.clone()),
        EventKind::Status | EventKind::Check | EventKind::DownloadStart | EventKind::Done => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::ProjectLabel;

    fn label() -> ProjectLabel {
        ProjectLabel {
            title: "Lithium".into(),
            slug: "lithium".into(),
            color: None,
        }
    }

    #[test]
    fn successes_errors_and_summary_are_printed() {
        let done = ProgressEvent::new(EventKind::DownloadSuccess, "Installed lithium.jar")
            .for_project(&label())
            .with_version("0.11.2");
        assert_eq!(render_line(&done).unwrap(), "✓ Lithium 0.11.2");

        let failed = ProgressEvent::new(EventKind::Error, "HTTP 500").for_project(&label());
        assert_eq!(render_line(&failed).unwrap(), "✗ Lithium: HTTP 500");

        let summary = ProgressEvent::new(EventKind::Summary, "Finished.");
        assert_eq!(render_line(&summary).unwrap(), "Finished.");
    }

    #[test]
    fn checks_are_quiet() {
        let check = ProgressEvent::new(EventKind::Check, "Checking Lithium").for_project(&label());
        assert!(render_line(&check).is_none());
    }
}
