use std::sync::Arc;

use parking_lot::Mutex;

/// Shared, append-only record of emitted items.
///
/// Clones share the same buffer, so one handle can be given to a producer on
/// another thread while the owner inspects or drains it.
#[derive(Debug)]
pub struct EventBus<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn emit(&self, event: E) {
        self.events.lock().push(event);
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn drain(&self) -> Vec<E> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl<E: Clone> EventBus<E> {
    pub fn events(&self) -> Vec<E> {
        self.events.lock().clone()
    }
}
