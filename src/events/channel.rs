use std::cell::RefCell;
use std::rc::Rc;

use log::trace;

type Callback<T> = Rc<dyn Fn(&T)>;
pub type SubscriptionId = u64;

struct Listeners<T> {
    entries: Vec<(SubscriptionId, Callback<T>)>,
    next_id: SubscriptionId,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }
}

/// Single-threaded pub/sub channel connecting the orchestrator to
/// whatever front end is listening. Split into an emitter half and an
/// observer half so components only get the capability they need.
pub struct Channel<T: std::fmt::Debug> {
    listeners: Rc<RefCell<Listeners<T>>>,
}

impl<T: std::fmt::Debug> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Rc::clone(&self.listeners),
        }
    }
}

pub struct EventEmitter<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

pub struct EventObserver<T: std::fmt::Debug> {
    channel: Channel<T>,
}

impl<T: std::fmt::Debug> Clone for EventObserver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

/// Handle returned by `subscribe`; dropping it does nothing, calling
/// `unsubscribe` removes the listener.
pub struct Unsubscriber<T: std::fmt::Debug> {
    channel: Channel<T>,
    id: SubscriptionId,
}

impl<T: std::fmt::Debug> Unsubscriber<T> {
    pub fn unsubscribe(self) -> bool {
        self.channel.remove(self.id)
    }
}

impl<T: std::fmt::Debug> Channel<T> {
    pub fn new() -> (EventEmitter<T>, EventObserver<T>) {
        let channel = Channel {
            listeners: Rc::new(RefCell::new(Listeners::default())),
        };
        (
            EventEmitter {
                channel: channel.clone(),
            },
            EventObserver { channel },
        )
    }

    fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Rc::new(callback)));
        Unsubscriber {
            channel: self.clone(),
            id,
        }
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.entries.len();
        listeners.entries.retain(|(entry_id, _)| *entry_id != id);
        listeners.entries.len() != before
    }

    fn emit(&self, data: &T) {
        // Snapshot the callbacks so a listener may subscribe/unsubscribe
        // while handling an event.
        let callbacks: Vec<Callback<T>> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        trace!(target: "events", "Emitting to {} listeners: {:?}", callbacks.len(), data);
        for callback in callbacks {
            callback(data);
        }
    }
}

impl<T: std::fmt::Debug> EventEmitter<T> {
    pub fn emit(&self, data: &T) {
        self.channel.emit(data);
    }
}

impl<T: std::fmt::Debug> EventObserver<T> {
    pub fn subscribe<F>(&self, callback: F) -> Unsubscriber<T>
    where
        F: Fn(&T) + 'static,
    {
        self.channel.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_subscribe_and_emit() {
        let (emitter, observer) = Channel::<u32>::new();
        let seen = Rc::new(Cell::new(0u32));
        let seen_clone = seen.clone();

        let _sub = observer.subscribe(move |value| {
            seen_clone.set(seen_clone.get() + value);
        });

        emitter.emit(&3);
        emitter.emit(&4);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let (emitter, observer) = Channel::<u32>::new();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = count.clone();

        let sub = observer.subscribe(move |_| {
            count_clone.set(count_clone.get() + 1);
        });

        emitter.emit(&1);
        assert!(sub.unsubscribe());
        emitter.emit(&1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_listener_may_subscribe_during_emit() {
        let (emitter, observer) = Channel::<u32>::new();
        let observer_inner = observer.clone();
        let count = Rc::new(Cell::new(0u32));
        let count_clone = count.clone();

        let _sub = observer.subscribe(move |_| {
            let count_inner = count_clone.clone();
            // Leak the inner subscription for the duration of the test.
            std::mem::forget(observer_inner.subscribe(move |_| {
                count_inner.set(count_inner.get() + 1);
            }));
        });

        emitter.emit(&1);
        emitter.emit(&1);
        assert_eq!(count.get(), 1);
    }
}
