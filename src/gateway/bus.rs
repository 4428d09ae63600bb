use crate::gateway::events::Outbound;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

pub const DEFAULT_BUS_CAPACITY: usize = 1024;

type Listener = Box<dyn Fn(&Outbound) + Send + Sync>;

/// Fan-out of simulation events to every connected viewer.
///
/// Listeners registered with [`EventBus::on`] run synchronously inside
/// `publish`, in registration order, before the event reaches channel
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Outbound>,
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn publish(&self, outbound: Outbound) {
        if let Ok(listeners) = self.listeners.read() {
            for listener in listeners.iter() {
                listener(&outbound);
            }
        }

        tracing::debug!(
            event = outbound.event.name(),
            audience = ?outbound.audience,
            "publishing event"
        );
        // 沒有訂閱者時 send 會回錯，屬正常情況
        let _ = self.tx.send(outbound);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.tx.subscribe()
    }

    pub fn on<F>(&self, listener: F)
    where
        F: Fn(&Outbound) + Send + Sync + 'static,
    {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(Box::new(listener));
        }
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::events::{CallRef, ServerEvent};
    use std::sync::Mutex;

    fn ended(id: &str) -> Outbound {
        Outbound::broadcast(ServerEvent::CallEnded(CallRef {
            call_id: id.to_string(),
        }))
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        bus.on(move |_| first.lock().unwrap().push("first"));
        let second = seen.clone();
        bus.on(move |_| second.lock().unwrap().push("second"));

        bus.publish(ended("a"));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_every_event() {
        let bus = EventBus::default();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.viewer_count(), 2);

        bus.publish(ended("a"));
        bus.publish(ended("b"));

        for rx in [&mut a, &mut b] {
            assert_eq!(rx.recv().await.unwrap(), ended("a"));
            assert_eq!(rx.recv().await.unwrap(), ended("b"));
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::default();
        bus.publish(ended("a"));
    }
}
