//! Auth change notifications.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::models::AuthEvent;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_BUFFER: usize = 16;

/// Fan-out of [`AuthEvent`]s to every live subscription.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Open a new subscription. Only events emitted after this call are seen.
    #[must_use]
    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Deliver `event` to all subscribers. Having none is fine.
    pub fn emit(&self, event: AuthEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::trace!(receivers, "Auth event emitted");
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to auth changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
}

impl AuthSubscription {
    /// Wait for the next event. Returns `None` once the provider is gone.
    ///
    /// A subscriber that falls behind skips the dropped events and continues
    /// with the oldest one still buffered.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth subscription lagged, events dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth subscription lagged, events dropped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Stop listening for auth changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = AuthEvents::new();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        events.emit(AuthEvent::SignedOut);

        assert_eq!(first.recv().await, Some(AuthEvent::SignedOut));
        assert_eq!(second.recv().await, Some(AuthEvent::SignedOut));
    }

    #[tokio::test]
    async fn test_recv_ends_when_provider_dropped() {
        let events = AuthEvents::new();
        let mut sub = events.subscribe();
        drop(events);
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_try_recv_drains_buffer() {
        let events = AuthEvents::new();
        let mut sub = events.subscribe();
        assert_eq!(sub.try_recv(), None);

        events.emit(AuthEvent::SignedOut);
        events.emit(AuthEvent::SignedOut);

        assert_eq!(sub.try_recv(), Some(AuthEvent::SignedOut));
        assert_eq!(sub.try_recv(), Some(AuthEvent::SignedOut));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let events = AuthEvents::new();
        events.emit(AuthEvent::SignedOut);
        let sub = events.subscribe();
        sub.unsubscribe();
    }
}
