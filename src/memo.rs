//! Memoized lazy values.
//!
//! A [`Memo`] computes the value for a key the first time it is asked for and
//! hands out clones of it afterwards. Failed computations are not cached, so a
//! transient error (network, expired consent, ...) is retried on the next
//! call. Concurrent first calls on the same key wait for a single computation.
//!
//! Tables never evict; they are meant for a handful of long-lived values such
//! as "the credential" or "the drive service", not for general caching.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::OnceCell;

pub struct Memo<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<OnceCell<V>>>> {
        // Cells are only inserted or removed under the lock, a panic elsewhere
        // cannot leave the map half-updated.
        self.cells.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        self.lock().entry(key.clone()).or_default().clone()
    }

    /// Returns the cached value for `key`, running `init` if there is none.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: &K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cell = self.cell(key);
        match cell.get_or_try_init(init).await {
            Ok(value) => Ok(value.clone()),
            Err(e) => {
                self.discard_failed(key, &cell);
                Err(e)
            }
        }
    }

    /// Drops the empty cell a failed computation leaves behind, unless it was
    /// replaced meanwhile or another caller still waits on it.
    fn discard_failed(&self, key: &K, cell: &Arc<OnceCell<V>>) {
        let mut cells = self.lock();
        // One reference in the map, one held by the failed caller.
        let unused = cells.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, cell) && !current.initialized() && Arc::strong_count(cell) == 2
        });
        if unused {
            cells.remove(key);
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of keys holding a computed value.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets the value for `key`. Returns whether one was cached.
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock()
            .remove(key)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    pub fn reset(&self) {
        self.lock().clear();
    }
}

/// A [`Memo`] with no key: a lazily built singleton.
pub struct Lazy<V> {
    memo: Memo<(), V>,
}

impl<V> Default for Lazy<V> {
    fn default() -> Self {
        Self {
            memo: Memo::default(),
        }
    }
}

impl<V: Clone> Lazy<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.memo.get_or_try_init(&(), init).await
    }

    pub fn get(&self) -> Option<V> {
        self.memo.get(&())
    }

    pub fn is_initialized(&self) -> bool {
        self.memo.contains(&())
    }

    pub fn reset(&self) {
        self.memo.reset();
    }
}
