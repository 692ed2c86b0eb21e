//! Typed change notifications.
//!
//! Mutations publish a `DataEvent`; subscribers treat it as an invalidation
//! signal and re-read from the pipeline. Single mutator thread, so plain
//! mpsc fan-out is enough.

use std::sync::mpsc::{channel, Receiver, Sender};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEvent {
    LeadsUpdated,
    StagesUpdated,
    TasksUpdated,
}

#[derive(Debug, Default)]
pub struct EventBus {
    senders: Vec<Sender<DataEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<DataEvent> {
        let (tx, rx) = channel();
        self.senders.push(tx);
        rx
    }

    /// Delivers to every live subscriber; disconnected ones are pruned.
    pub fn publish(&mut self, event: DataEvent) {
        debug!(?event, "publish");
        self.senders.retain(|tx| tx.send(event).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_published_events() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        bus.publish(DataEvent::LeadsUpdated);
        assert_eq!(a.try_recv().unwrap(), DataEvent::LeadsUpdated);
        assert_eq!(b.try_recv().unwrap(), DataEvent::LeadsUpdated);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        bus.publish(DataEvent::StagesUpdated);
        let live = bus.subscribe();
        bus.publish(DataEvent::TasksUpdated);
        assert_eq!(live.try_recv().unwrap(), DataEvent::TasksUpdated);
    }
}
