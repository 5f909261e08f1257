//! Progress notifications for whoever renders the run (console, tests).

use batch_types::FetchEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FetchEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FetchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; dropped silently when nobody listens.
    pub fn emit(&self, event: FetchEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let bus = EventBus::default();
        bus.emit(FetchEvent::Tagged {
            path: "a.mp3".to_string(),
        });
    }

    #[test]
    fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        bus.emit(FetchEvent::GroupStarted {
            group: "Era A".to_string(),
            rows: 2,
        });
        bus.emit(FetchEvent::Tagged {
            path: "a.mp3".to_string(),
        });
        assert!(matches!(rx.try_recv(), Ok(FetchEvent::GroupStarted { rows: 2, .. })));
        assert_eq!(rx.try_recv().unwrap().to_string(), "Embedded metadata into a.mp3");
    }
}
