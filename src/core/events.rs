use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

/// User-facing message emitted by the core; rendering is left to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub payload: String,
}

/// Fan-out of [`Notice`]s to any number of subscribers.
///
/// Emitting with nobody listening is not an error; slow subscribers lose the oldest notices.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notice>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, kind: NoticeKind, payload: impl Into<String>) {
        let notice = Notice {
            kind,
            payload: payload.into(),
        };
        tracing::trace!("notice {:?}: {}", notice.kind, notice.payload);
        let _ = self.tx.send(notice);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notices() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.emit(NoticeKind::Info, "hello");

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.kind, NoticeKind::Info);
        assert_eq!(notice.payload, "hello");
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(0);
        bus.emit(NoticeKind::Error, "nobody listens");
    }
}
