//! Thread-safe hand-off onto a single sequential execution context.
//!
//! Producers on any thread hold a [`MailboxSender`]; the owning context drains
//! the [`Mailbox`] in FIFO order. Messages posted while draining are picked up
//! by the same drain loop.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// Callback invoked after every successful post.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// Returned when posting to a mailbox whose owner has closed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxClosed<T>(pub T);

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    closed: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

pub struct Mailbox<T> {
    shared: Arc<Shared<T>>,
}

pub struct MailboxSender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                closed: AtomicBool::new(false),
                waker: Mutex::new(None),
            }),
        }
    }

    pub fn sender(&self) -> MailboxSender<T> {
        MailboxSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Installs a hook that runs after each post, e.g. to wake an event loop.
    pub fn set_waker(&self, waker: Waker) {
        *self.shared.waker.lock() = Some(waker);
    }

    pub fn pop(&self) -> Option<T> {
        self.shared.queue.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rejects further posts. Messages already queued stay drainable.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl<T> MailboxSender<T> {
    pub fn post(&self, msg: T) -> Result<(), MailboxClosed<T>> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(MailboxClosed(msg));
        }
        self.shared.queue.lock().push_back(msg);
        // Clone out so the waker never runs under the lock.
        let waker = self.shared.waker.lock().clone();
        if let Some(wake) = waker {
            wake();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Mailbox;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn drains_in_post_order() {
        let mb = Mailbox::new();
        let tx = mb.sender();
        tx.post(1).unwrap();
        tx.post(2).unwrap();
        tx.clone().post(3).unwrap();
        let got: Vec<i32> = std::iter::from_fn(|| mb.pop()).collect();
        assert_eq!(got, vec![1, 2, 3]);
        assert!(mb.is_empty());
    }

    #[test]
    fn posts_from_other_threads_arrive() {
        let mb = Mailbox::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tx = mb.sender();
                std::thread::spawn(move || tx.post(i).unwrap())
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let mut got: Vec<i32> = std::iter::from_fn(|| mb.pop()).collect();
        got.sort();
        assert_eq!(got, vec![0, 1, 2, 3]);
    }

    #[test]
    fn closed_mailbox_returns_message() {
        let mb = Mailbox::new();
        let tx = mb.sender();
        tx.post("kept").unwrap();
        mb.close();
        let err = tx.post("rejected").unwrap_err();
        assert_eq!(err.0, "rejected");
        assert_eq!(mb.pop(), Some("kept"));
    }

    #[test]
    fn waker_runs_per_post() {
        let mb = Mailbox::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        mb.set_waker(Arc::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        mb.sender().post(()).unwrap();
        mb.sender().post(()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
