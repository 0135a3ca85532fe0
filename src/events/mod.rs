use serde::Serialize;
use strum::{AsRefStr, Display};
use tokio::sync::broadcast;
use tracing::trace;

use crate::navigation::Redirect;

/// Capacity of the UI event channel; slow renderers see `Lagged` beyond this.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Severity of a transient on-screen notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Everything a renderer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Transient toast
    Notice { level: NoticeLevel, message: String },
    /// Leave the current page
    Navigate(Redirect),
    /// Session was established, refreshed or torn down
    SessionChanged,
    /// Cart snapshot was replaced; carries the new revision
    CartChanged { revision: u64 },
}

impl UiEvent {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Fan-out of UI events to every subscribed renderer.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: broadcast::Sender<UiEvent>,
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSender {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publishes an event. Having no subscriber is not an error.
    pub fn send(&self, event: UiEvent) {
        if self.sender.send(event).is_err() {
            trace!("ui event dropped: no subscribers");
        }
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.send(UiEvent::Notice {
            level,
            message: message.into(),
        });
    }

    pub fn navigate(&self, redirect: Redirect) {
        self.send(UiEvent::Navigate(redirect));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.sender.subscribe()
    }
}
