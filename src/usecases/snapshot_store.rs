use std::sync::{mpsc, Arc, Mutex, MutexGuard};

/// Shared state cell that broadcasts a fresh snapshot after each mutation.
#[derive(Debug)]
pub struct SnapshotStore<S> {
    inner: Arc<Mutex<StoreState<S>>>,
}

impl<S> Clone for SnapshotStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[derive(Debug)]
struct StoreState<S> {
    snapshot: S,
    subscribers: Vec<mpsc::Sender<S>>,
}

impl<S: Clone> SnapshotStore<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreState {
                snapshot: initial,
                subscribers: Vec::new(),
            })),
        }
    }

    /// The receiver gets the current snapshot immediately.
    pub fn subscribe(&self) -> mpsc::Receiver<S> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.lock();
        let _ = tx.send(state.snapshot.clone());
        state.subscribers.push(tx);
        rx
    }

    pub fn snapshot(&self) -> S {
        self.lock().snapshot.clone()
    }

    pub fn read<R>(&self, reader: impl FnOnce(&S) -> R) -> R {
        reader(&self.lock().snapshot)
    }

    /// Applies `mutator` and notifies live subscribers. Dropped receivers are
    /// pruned.
    pub fn mutate<R>(&self, mutator: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.lock();
        let result = mutator(&mut state.snapshot);
        let payload = state.snapshot.clone();
        state
            .subscribers
            .retain(|sub| sub.send(payload.clone()).is_ok());
        result
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState<S>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
