//! Live-query subscription table and the events delivered to subscribers
//! (§4.5 Push frames, §6 Messages to live-query receivers).

use dashmap::DashMap;
use orientdb_core::Document;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOp {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveQueryEvent {
    Changed { op: RecordOp, record: Document },
    Unsubscribed,
}

/// Token → receiver channel table, owned by the session actor. Dropping a
/// subscriber's `Receiver` does not unsubscribe server-side; the caller
/// must call `live_query_unsubscribe` explicitly (§4.8).
#[derive(Debug, Clone, Default)]
pub struct LiveQueryTable {
    senders: std::sync::Arc<DashMap<i32, mpsc::Sender<LiveQueryEvent>>>,
}

impl LiveQueryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: i32) -> mpsc::Receiver<LiveQueryEvent> {
        let (tx, rx) = mpsc::channel(64);
        self.senders.insert(token, tx);
        rx
    }

    /// Forwards a push-frame event to its subscriber. A push for a token
    /// with no registered receiver (already unsubscribed, or racing a
    /// subscribe that hasn't completed) is silently dropped (§8 scenario 5).
    pub fn dispatch(&self, token: i32, event: LiveQueryEvent) {
        if let Some(sender) = self.senders.get(&token) {
            let _ = sender.try_send(event);
        }
    }

    /// Removes the token's entry and sends a final `Unsubscribed` event if
    /// a receiver is still listening.
    pub fn unsubscribe(&self, token: i32) {
        if let Some((_, sender)) = self.senders.remove(&token) {
            let _ = sender.try_send(LiveQueryEvent::Unsubscribed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_after_unsubscribe_is_dropped_silently() {
        let table = LiveQueryTable::new();
        let mut rx = table.register(7);
        table.unsubscribe(7);
        assert_eq!(rx.recv().await, Some(LiveQueryEvent::Unsubscribed));
        table.dispatch(7, LiveQueryEvent::Unsubscribed); // no receiver left; must not panic
        assert_eq!(rx.recv().await, None);
    }
}
