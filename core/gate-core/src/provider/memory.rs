//! In-process event emitter. Stands in for a browser wallet in tests and in
//! the simulator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use session_protocol::ProviderEvent;

use super::{EventEmitter, ListenerId, ProviderCallback};

struct Listener {
    event: ProviderEvent,
    id: ListenerId,
    callback: ProviderCallback,
}

#[derive(Default)]
pub struct MemoryEmitter {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Listener>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every listener registered for `event` and returns how many ran.
    /// Callbacks run outside the lock so they may register or remove listeners.
    pub fn emit(&self, event: ProviderEvent, accounts: &[String]) -> usize {
        let callbacks: Vec<ProviderCallback> = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|listener| listener.event == event)
            .map(|listener| listener.callback.clone())
            .collect();

        for callback in &callbacks {
            callback(accounts);
        }
        callbacks.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn listener_count_for(&self, event: ProviderEvent) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|listener| listener.event == event)
            .count()
    }
}

impl EventEmitter for MemoryEmitter {
    fn on(&self, event: ProviderEvent, callback: ProviderCallback) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Listener {
                event,
                id,
                callback,
            });
        id
    }

    fn remove_listener(&self, event: ProviderEvent, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .retain(|listener| !(listener.event == event && listener.id == id));
    }
}
