//! Memoizing wrapper that can be called from several threads at once.

use crate::stats::{AtomicCounters, CacheStats};
use crate::store::CacheMap;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

type SyncCallee<'f, M, A, R> = Box<dyn Fn(&M, A) -> R + Send + Sync + 'f>;

/// Thread-safe counterpart of [`Memo`](crate::Memo).
///
/// The cache sits behind a mutex which is only held for the lookup and for the insertion, never
/// while the wrapped function runs. Recursion through the wrapper therefore cannot deadlock, but
/// two threads missing on the same key at the same time may both compute it; the first result
/// to be inserted stays.
///
/// ```
/// use memocall::SyncMemo;
/// use std::sync::Arc;
///
/// let square = Arc::new(SyncMemo::new(|n: u64| n * n));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let square = Arc::clone(&square);
///         std::thread::spawn(move || square.call(9))
///     })
///     .collect();
/// for h in handles {
///     assert_eq!(h.join().unwrap(), 81);
/// }
/// assert_eq!(square.len(), 1);
/// ```
pub struct SyncMemo<'f, A, R, C = HashMap<A, R>> {
    func: SyncCallee<'f, SyncMemo<'f, A, R, C>, A, R>,
    map: Mutex<C>,
    counters: AtomicCounters,
}

impl<'f, A, R> SyncMemo<'f, A, R>
where
    A: Hash + Eq + Clone,
    R: Clone,
{
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'f,
    {
        SyncMemo::with_cache(HashMap::new(), func)
    }

    pub fn recursive<F>(func: F) -> Self
    where
        F: Fn(&Self, A) -> R + Send + Sync + 'f,
    {
        SyncMemo::recursive_with_cache(HashMap::new(), func)
    }
}

impl<'f, A, R, C> SyncMemo<'f, A, R, C>
where
    A: Hash + Eq + Clone,
    R: Clone,
    C: CacheMap<A, R>,
{
    pub fn with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'f,
    {
        SyncMemo::recursive_with_cache(map, move |_: &Self, args: A| func(args))
    }

    pub fn recursive_with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(&Self, A) -> R + Send + Sync + 'f,
    {
        SyncMemo {
            func: Box::new(func),
            map: Mutex::new(map),
            counters: AtomicCounters::default(),
        }
    }

    // The lock is never held while user code runs, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, C> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached result for `args`, or computes and caches it.
    pub fn call(&self, args: A) -> R {
        {
            let mut map = self.lock();
            if let Some(r) = map.lookup(&args).cloned() {
                self.counters.hit();
                tracing::trace!(target: "memocall", kind = "sync_memo", "cache hit");
                return r;
            }
        }
        self.counters.miss();
        tracing::trace!(target: "memocall", kind = "sync_memo", "cache miss");

        let r = (self.func)(self, args.clone());

        let mut map = self.lock();
        map.remember(args, r.clone());
        r
    }

    pub fn contains(&self, args: &A) -> bool {
        self.lock().holds(args)
    }

    pub fn len(&self) -> usize {
        self.lock().entries()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.len())
    }
}

impl<'f, A, R, C> fmt::Debug for SyncMemo<'f, A, R, C>
where
    A: Hash + Eq + Clone,
    R: Clone,
    C: CacheMap<A, R>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncMemo")
            .field("stats", &self.stats())
            .finish()
    }
}
