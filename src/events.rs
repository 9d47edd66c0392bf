//! One-shot event delivery from controllers to their consumer.
//!
//! An [`EventChannel`] is a bounded queue with at most one attached
//! [`EventSubscription`] at a time. Events sent while nobody is attached are
//! buffered; when a subscription is dropped its receiver goes back to the
//! channel so undelivered events wait for the next subscriber. Every event is
//! delivered at most once and in send order.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::warn;

/// Default number of undelivered events a channel buffers before `send` waits.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

type Slot<E> = Arc<Mutex<Option<mpsc::Receiver<E>>>>;

/// Single-subscriber, buffer-until-attached event queue.
pub struct EventChannel<E> {
    tx: mpsc::Sender<E>,
    slot: Slot<E>,
}

impl<E> EventChannel<E> {
    /// Create a channel buffering up to `capacity` events (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            slot: Arc::new(Mutex::new(Some(rx))),
        }
    }

    /// Queue an event. Waits while the buffer is full.
    pub async fn send(&self, event: E) {
        if self.tx.send(event).await.is_err() {
            // Only reachable if a subscription was leaked with mem::forget
            warn!("event receiver gone, event discarded");
        }
    }

    /// Attach the single consumer. Returns `None` while another
    /// subscription is active.
    pub fn attach(&self) -> Option<EventSubscription<E>> {
        let rx = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        Some(EventSubscription {
            rx: Some(rx),
            slot: Arc::clone(&self.slot),
        })
    }

    /// Whether a consumer is currently attached.
    pub fn is_attached(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<E> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// The active consumer of an [`EventChannel`].
pub struct EventSubscription<E> {
    rx: Option<mpsc::Receiver<E>>,
    slot: Slot<E>,
}

impl<E> EventSubscription<E> {
    /// Wait for the next event. `None` once the channel has been dropped and
    /// the buffer is drained.
    pub async fn recv(&mut self) -> Option<E> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<E> {
        self.rx.as_mut().and_then(|rx| rx.try_recv().ok())
    }

    /// Drain everything buffered right now.
    pub fn drain(&mut self) -> Vec<E> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl<E> Drop for EventSubscription<E> {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffers_until_attached() {
        let channel = EventChannel::new(8);
        channel.send(1).await;
        channel.send(2).await;

        let mut sub = channel.attach().unwrap();
        assert_eq!(sub.recv().await, Some(1));
        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn only_one_subscriber_at_a_time() {
        let channel: EventChannel<u8> = EventChannel::new(8);
        let sub = channel.attach().unwrap();
        assert!(channel.is_attached());
        assert!(channel.attach().is_none());

        drop(sub);
        assert!(!channel.is_attached());
        assert!(channel.attach().is_some());
    }

    #[tokio::test]
    async fn undelivered_events_survive_detach() {
        let channel = EventChannel::new(8);
        channel.send("a").await;
        channel.send("b").await;

        {
            let mut sub = channel.attach().unwrap();
            assert_eq!(sub.recv().await, Some("a"));
        }

        // "a" is never replayed, "b" is still waiting
        channel.send("c").await;
        let mut sub = channel.attach().unwrap();
        assert_eq!(sub.drain(), vec!["b", "c"]);
    }

    #[tokio::test]
    async fn send_waits_when_full() {
        let channel = Arc::new(EventChannel::new(1));
        channel.send(1).await;

        let sender = Arc::clone(&channel);
        let pending = tokio::spawn(async move { sender.send(2).await });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        let mut sub = channel.attach().unwrap();
        assert_eq!(sub.recv().await, Some(1));
        pending.await.unwrap();
        assert_eq!(sub.recv().await, Some(2));
    }

    #[tokio::test]
    async fn recv_ends_after_channel_dropped() {
        let channel = EventChannel::new(4);
        channel.send(7).await;
        let mut sub = channel.attach().unwrap();
        drop(channel);
        assert_eq!(sub.recv().await, Some(7));
        assert_eq!(sub.recv().await, None);
    }
}
