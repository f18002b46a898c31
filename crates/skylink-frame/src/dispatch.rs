//! Frame listener fan-out.
//!
//! Listeners are called synchronously, in registration order, on the
//! thread that decoded the frame. Dispatch iterates an immutable snapshot,
//! so listeners may subscribe or unsubscribe (themselves included) while a
//! dispatch is in progress.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, PoisonError, RwLock};

use crate::codec::Frame;

/// Receives decoded frames.
///
/// Runs on the reader thread: anything slower than a queue push stalls
/// ingestion for the whole connection. Use [`channel_listener`] to hand off
/// to a worker.
pub trait FrameListener: Send + Sync {
    fn on_frame(&self, frame: &Frame);
}

impl<F> FrameListener for F
where
    F: Fn(&Frame) + Send + Sync,
{
    fn on_frame(&self, frame: &Frame) {
        self(frame)
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Entries = Arc<Vec<(ListenerId, Arc<dyn FrameListener>)>>;

/// Shared, cloneable set of frame listeners.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    entries: RwLock<Entries>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it sees every frame dispatched after this call.
    pub fn subscribe(&self, listener: impl FrameListener + 'static) -> ListenerId {
        self.subscribe_arc(Arc::new(listener))
    }

    /// Register an already shared listener.
    pub fn subscribe_arc(&self, listener: Arc<dyn FrameListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut entries).push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(index) = entries.iter().position(|(entry_id, _)| *entry_id == id) else {
            return false;
        };
        Arc::make_mut(&mut entries).remove(index);
        true
    }

    /// Call every listener registered at the time of the call. Returns the
    /// number of listeners invoked.
    pub fn dispatch(&self, frame: &Frame) -> usize {
        let snapshot = self.snapshot();
        for (_, listener) in snapshot.iter() {
            listener.on_frame(frame);
        }
        snapshot.len()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Entries {
        Arc::clone(
            &self
                .inner
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Listener that forwards frame copies into an mpsc queue.
pub struct QueueListener {
    tx: mpsc::Sender<Frame>,
}

impl FrameListener for QueueListener {
    fn on_frame(&self, frame: &Frame) {
        if self.tx.send(frame.clone()).is_err() {
            tracing::trace!(address = frame.address, "queue listener receiver dropped");
        }
    }
}

/// A listener plus the receiving end of its queue, for consumers that do
/// non-trivial work (persistence, network I/O) off the reader thread.
pub fn channel_listener() -> (QueueListener, mpsc::Receiver<Frame>) {
    let (tx, rx) = mpsc::channel();
    (QueueListener { tx }, rx)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn dispatch_in_registration_order() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            registry.subscribe(move |frame: &Frame| {
                seen.lock().unwrap().push((tag, frame.address));
            });
        }

        assert_eq!(registry.dispatch(&Frame::new(3, false, vec![1])), 3);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![("a", 3), ("b", 3), ("c", 3)]
        );
    }

    #[test]
    fn unsubscribe_removes_listener() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = {
            let count = Arc::clone(&count);
            registry.subscribe(move |_: &Frame| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        registry.dispatch(&Frame::new(1, false, vec![]));
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.dispatch(&Frame::new(1, false, vec![]));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn listener_can_detach_itself_during_dispatch() {
        let registry = ListenerRegistry::new();
        let own_id = Arc::new(Mutex::new(None::<ListenerId>));
        let calls = Arc::new(AtomicUsize::new(0));

        let id = {
            let registry = registry.clone();
            let own_id = Arc::clone(&own_id);
            let calls = Arc::clone(&calls);
            registry.clone().subscribe(move |_: &Frame| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *own_id.lock().unwrap() {
                    registry.unsubscribe(id);
                }
            })
        };
        *own_id.lock().unwrap() = Some(id);

        let later = Arc::new(AtomicUsize::new(0));
        {
            let later = Arc::clone(&later);
            registry.subscribe(move |_: &Frame| {
                later.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(registry.dispatch(&Frame::new(1, false, vec![])), 2);
        assert_eq!(registry.dispatch(&Frame::new(1, false, vec![])), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(later.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_subscribe_during_dispatch() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let dispatcher = {
            let registry = registry.clone();
            std::thread::spawn(move || {
                for i in 0..500u16 {
                    registry.dispatch(&Frame::new(i % 2048, false, vec![]));
                }
            })
        };

        let ids: Vec<_> = (0..50)
            .map(|_| {
                let counter = Arc::clone(&counter);
                registry.subscribe(move |_: &Frame| {
                    counter.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();
        for id in ids {
            registry.unsubscribe(id);
        }

        dispatcher.join().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn channel_listener_queues_frames() {
        let registry = ListenerRegistry::new();
        let (listener, rx) = channel_listener();
        registry.subscribe(listener);

        registry.dispatch(&Frame::new(42, true, vec![7, 8]));

        let frame = rx.recv().unwrap();
        assert_eq!(frame.address, 42);
        assert!(frame.rtr);
        assert_eq!(frame.payload.as_ref(), &[7, 8]);
    }

    #[test]
    fn channel_listener_survives_dropped_receiver() {
        let registry = ListenerRegistry::new();
        let (listener, rx) = channel_listener();
        registry.subscribe(listener);
        drop(rx);

        assert_eq!(registry.dispatch(&Frame::new(1, false, vec![])), 1);
    }
}
