use tokio::sync::broadcast;

/// One-shot notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherEvent {
    /// A search query matched exactly one app and it was started.
    AutoLaunched { package: String, private: bool },
    /// A launch the user asked for did not happen.
    LaunchFailed { target: String, notice: String },
    DirectoryInvalidated,
}

pub type EventSender = broadcast::Sender<LauncherEvent>;

pub fn event_channel() -> EventSender {
    let (events, _) = broadcast::channel(64);
    events
}

pub(crate) fn notify_launch_failed(events: &EventSender, target: &str, label: &str) {
    let _ = events.send(LauncherEvent::LaunchFailed {
        target: target.to_string(),
        notice: format!("Couldn't open {label}"),
    });
}
