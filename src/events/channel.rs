//! Event channel over crossbeam-channel.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sends events from the core library.
///
/// Cloneable and `Send`, so the duplicate detector can report from rayon
/// workers. A sender built by [`null_sender`] has no channel at all.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<Sender<Event>>,
}

impl EventSender {
    /// Send an event. Events to a dropped receiver (or a null sender) are
    /// discarded, so progress reporting stays optional.
    pub fn send(&self, event: Event) {
        if let Some(sender) = &self.inner {
            let _ = sender.send(event);
        }
    }

    /// Whether anything could receive an event. Lets hot loops skip
    /// building events nobody will read.
    pub fn is_listening(&self) -> bool {
        self.inner.is_some()
    }
}

/// Receives events from the core library.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Everything queued right now, without blocking
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }

    /// Iterate until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for connected sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        Self::wrap(unbounded())
    }

    /// Create a bounded channel for callers that need backpressure.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        Self::wrap(bounded(capacity))
    }

    fn wrap((sender, receiver): (Sender<Event>, Receiver<Event>)) -> (EventSender, EventReceiver) {
        (
            EventSender {
                inner: Some(sender),
            },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender that drops every event
pub fn null_sender() -> EventSender {
    EventSender::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ExecuteEvent;
    use std::thread;

    #[test]
    fn events_can_be_sent_across_threads() {
        let (sender, receiver) = EventChannel::new();

        let handle = thread::spawn(move || {
            sender.send(Event::Execute(ExecuteEvent::Progress {
                index: 3,
                total: 10,
                current: "report.pdf".to_string(),
            }));
        });
        handle.join().unwrap();

        match receiver.recv().unwrap() {
            Event::Execute(ExecuteEvent::Progress { index, total, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(total, 10);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn null_sender_drops_events_quietly() {
        let sender = null_sender();
        assert!(!sender.is_listening());
        sender.send(Event::Execute(ExecuteEvent::Cancelled { completed: 0 }));
    }

    #[test]
    fn drain_collects_queued_events() {
        let (sender, receiver) = EventChannel::new();
        assert!(sender.is_listening());
        for completed in 0..3 {
            sender.send(Event::Execute(ExecuteEvent::Cancelled { completed }));
        }
        drop(sender);

        assert_eq!(receiver.drain().len(), 3);
        assert!(receiver.drain().is_empty());
    }

    #[test]
    fn bounded_channel_respects_capacity() {
        let (sender, receiver) = EventChannel::bounded(2);

        sender.send(Event::Execute(ExecuteEvent::Cancelled { completed: 0 }));
        sender.send(Event::Execute(ExecuteEvent::Cancelled { completed: 1 }));

        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_none());
    }
}
