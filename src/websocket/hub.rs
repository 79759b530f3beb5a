use dashmap::DashMap;
use serde::Serialize;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl SessionEvent {
    /// Whether a session exists after this event.
    pub fn has_session(self) -> bool {
        !matches!(self, SessionEvent::SignedOut)
    }
}

type Subscribers = Arc<DashMap<Uuid, Vec<(u64, mpsc::UnboundedSender<SessionEvent>)>>>;

/// Fan-out of session changes to the views a user has open.
#[derive(Clone, Default)]
pub struct SessionHub {
    subscribers: Subscribers,
    next_id: Arc<AtomicU64>,
}

/// A live subscription. Dropping it unsubscribes.
pub struct SessionSubscription {
    subscribers: Subscribers,
    user_id: Uuid,
    id: u64,
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, user_id: Uuid) -> SessionSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.entry(user_id).or_default().push((id, tx));
        SessionSubscription {
            subscribers: Arc::clone(&self.subscribers),
            user_id,
            id,
            rx,
        }
    }

    pub fn publish(&self, user_id: Uuid, event: SessionEvent) {
        tracing::debug!(%user_id, ?event, "Publishing session event");
        if let Some(mut senders) = self.subscribers.get_mut(&user_id) {
            senders.retain(|(_, sender)| sender.send(event).is_ok());
            if senders.is_empty() {
                drop(senders);
                self.subscribers.remove_if(&user_id, |_, s| s.is_empty());
            }
        }
    }

    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        self.subscribers
            .get(&user_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

impl SessionSubscription {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(mut senders) = self.subscribers.get_mut(&self.user_id) {
            senders.retain(|(id, _)| *id != self.id);
            if senders.is_empty() {
                drop(senders);
                self.subscribers.remove_if(&self.user_id, |_, s| s.is_empty());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_open_view_receives_the_event() {
        let hub = SessionHub::new();
        let user = Uuid::new_v4();
        let mut first = hub.subscribe(user);
        let mut second = hub.subscribe(user);

        hub.publish(user, SessionEvent::SignedOut);

        assert_eq!(first.recv().await, Some(SessionEvent::SignedOut));
        assert_eq!(second.recv().await, Some(SessionEvent::SignedOut));
    }

    #[tokio::test]
    async fn events_are_scoped_to_the_user() {
        let hub = SessionHub::new();
        let ana = Uuid::new_v4();
        let bia = Uuid::new_v4();
        let mut ana_view = hub.subscribe(ana);
        let _bia_view = hub.subscribe(bia);

        hub.publish(bia, SessionEvent::SignedIn);
        hub.publish(ana, SessionEvent::TokenRefreshed);

        assert_eq!(ana_view.recv().await, Some(SessionEvent::TokenRefreshed));
    }

    #[test]
    fn dropping_the_subscription_unsubscribes() {
        let hub = SessionHub::new();
        let user = Uuid::new_v4();
        let first = hub.subscribe(user);
        let second = hub.subscribe(user);
        assert_eq!(hub.subscriber_count(user), 2);

        drop(first);
        assert_eq!(hub.subscriber_count(user), 1);
        drop(second);
        assert_eq!(hub.subscriber_count(user), 0);

        // Publishing with nobody listening is a no-op.
        hub.publish(user, SessionEvent::SignedIn);
    }

    #[test]
    fn only_sign_out_ends_the_session() {
        assert!(SessionEvent::SignedIn.has_session());
        assert!(SessionEvent::TokenRefreshed.has_session());
        assert!(!SessionEvent::SignedOut.has_session());
    }
}
