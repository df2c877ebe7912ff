//! Single-threaded memoizing wrappers.
//!
//! A [`Memo`] owns one cache and one callable. The key type `A` must be `Hash + Eq + Clone`, so
//! every argument tuple is usable as a key and no runtime check is needed. Several arguments are
//! passed as a tuple. For argument lists whose hashability is only known at runtime, see
//! [`DynMemo`](crate::DynMemo).
//!
//! ```
//! use memocall::Memo;
//! use std::cell::Cell;
//!
//! let calls = Cell::new(0);
//! let square = Memo::new(|n: u64| {
//!     calls.set(calls.get() + 1);
//!     n * n
//! });
//!
//! assert_eq!(square.call(12), 144);
//! assert_eq!(square.call(12), 144);
//! assert_eq!(calls.get(), 1);
//! ```

use crate::stats::{CacheStats, Counters};
use crate::store::CacheMap;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Cache plus counters shared by the single-threaded wrappers.
///
/// The `RefCell` borrow only lives for a single lookup or insertion, never across a call of the
/// wrapped function, which is what allows recursion through the wrapper.
pub(crate) struct Slot<K, V, C> {
    map: RefCell<C>,
    counters: Counters,
    marker: PhantomData<fn(K) -> V>,
}

impl<K, V, C> Slot<K, V, C>
where
    V: Clone,
    C: CacheMap<K, V>,
{
    pub(crate) fn new(map: C) -> Self {
        Slot {
            map: RefCell::new(map),
            counters: Counters::default(),
            marker: PhantomData,
        }
    }

    pub(crate) fn recall(&self, key: &K, kind: &'static str) -> Option<V> {
        let found = self.map.borrow_mut().lookup(key).cloned();
        match found {
            Some(_) => {
                self.counters.hit();
                tracing::trace!(target: "memocall", kind, "cache hit");
            }
            None => {
                self.counters.miss();
                tracing::trace!(target: "memocall", kind, "cache miss");
            }
        }
        found
    }

    pub(crate) fn store(&self, key: K, value: V) {
        self.map.borrow_mut().remember(key, value);
    }

    pub(crate) fn bypass(&self, kind: &'static str) {
        self.counters.bypass();
        tracing::trace!(target: "memocall", kind, "unhashable arguments, bypassing cache");
    }

    pub(crate) fn holds(&self, key: &K) -> bool {
        self.map.borrow().holds(key)
    }

    pub(crate) fn entries(&self) -> usize {
        self.map.borrow().entries()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries())
    }
}

type Callee<'f, M, A, R> = Box<dyn Fn(&M, A) -> R + 'f>;

/// Memoizing wrapper around a pure function `A -> R`.
///
/// The cache is created empty, belongs to this instance only and is never cleared. Use an
/// `lru::LruCache` via [`Memo::with_cache`] to bound it.
pub struct Memo<'f, A, R, C = HashMap<A, R>> {
    func: Callee<'f, Memo<'f, A, R, C>, A, R>,
    slot: Slot<A, R, C>,
}

impl<'f, A, R> Memo<'f, A, R>
where
    A: Hash + Eq + Clone,
    R: Clone,
{
    /// Wraps `func` with an empty, unbounded cache.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> R + 'f,
    {
        Memo::with_cache(HashMap::new(), func)
    }

    /// Wraps a function that recurses through the wrapper it is given, so every recursive call
    /// is served from (and feeds) the same cache.
    ///
    /// ```
    /// use memocall::Memo;
    ///
    /// let fib = Memo::recursive(|fib, n: u64| if n <= 1 { n } else { fib.call(n - 1) + fib.call(n - 2) });
    /// assert_eq!(fib.call(90), 2880067194370816120);
    /// ```
    pub fn recursive<F>(func: F) -> Self
    where
        F: Fn(&Self, A) -> R + 'f,
    {
        Memo::recursive_with_cache(HashMap::new(), func)
    }
}

impl<'f, A, R, C> Memo<'f, A, R, C>
where
    A: Hash + Eq + Clone,
    R: Clone,
    C: CacheMap<A, R>,
{
    /// Wraps `func`, storing results in `map`.
    pub fn with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(A) -> R + 'f,
    {
        Memo::recursive_with_cache(map, move |_: &Self, args: A| func(args))
    }

    /// Recursive variant of [`Memo::with_cache`].
    pub fn recursive_with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(&Self, A) -> R + 'f,
    {
        Memo {
            func: Box::new(func),
            slot: Slot::new(map),
        }
    }

    /// Returns the cached result for `args`, or computes and caches it.
    pub fn call(&self, args: A) -> R {
        if let Some(r) = self.slot.recall(&args, "memo") {
            return r;
        }
        let r = (self.func)(self, args.clone());
        self.slot.store(args, r.clone());
        r
    }

    /// Whether a result for `args` is cached.
    pub fn contains(&self, args: &A) -> bool {
        self.slot.holds(args)
    }

    pub fn len(&self) -> usize {
        self.slot.entries()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.slot.stats()
    }
}

impl<'f, A, R, C> fmt::Debug for Memo<'f, A, R, C>
where
    A: Hash + Eq + Clone,
    R: Clone,
    C: CacheMap<A, R>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo").field("stats", &self.stats()).finish()
    }
}

/// Memoizing wrapper around a fallible function. Only `Ok` results are cached; errors are
/// returned to the caller unchanged and leave the cache untouched.
pub struct TryMemo<'f, A, T, E, C = HashMap<A, T>> {
    func: Callee<'f, TryMemo<'f, A, T, E, C>, A, Result<T, E>>,
    slot: Slot<A, T, C>,
}

impl<'f, A, T, E> TryMemo<'f, A, T, E>
where
    A: Hash + Eq + Clone,
    T: Clone,
{
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + 'f,
    {
        TryMemo::with_cache(HashMap::new(), func)
    }

    pub fn recursive<F>(func: F) -> Self
    where
        F: Fn(&Self, A) -> Result<T, E> + 'f,
    {
        TryMemo::recursive_with_cache(HashMap::new(), func)
    }
}

impl<'f, A, T, E, C> TryMemo<'f, A, T, E, C>
where
    A: Hash + Eq + Clone,
    T: Clone,
    C: CacheMap<A, T>,
{
    pub fn with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(A) -> Result<T, E> + 'f,
    {
        TryMemo::recursive_with_cache(map, move |_: &Self, args: A| func(args))
    }

    pub fn recursive_with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(&Self, A) -> Result<T, E> + 'f,
    {
        TryMemo {
            func: Box::new(func),
            slot: Slot::new(map),
        }
    }

    /// Returns the cached value for `args`, or calls the function. Errors propagate and are not
    /// cached, so a later call with the same arguments tries again.
    pub fn try_call(&self, args: A) -> Result<T, E> {
        if let Some(v) = self.slot.recall(&args, "try_memo") {
            return Ok(v);
        }
        let v = (self.func)(self, args.clone())?;
        self.slot.store(args, v.clone());
        Ok(v)
    }

    pub fn contains(&self, args: &A) -> bool {
        self.slot.holds(args)
    }

    pub fn len(&self) -> usize {
        self.slot.entries()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.slot.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn second_call_is_a_hit() {
        let calls = Cell::new(0);
        let len = Memo::new(|(s, n): (String, usize)| {
            calls.set(calls.get() + 1);
            s.len() % 2 == n
        });
        assert!(!len.call(("World".to_string(), 0)));
        assert!(!len.call(("World".to_string(), 0)));
        assert_eq!(calls.get(), 1);
        assert!(len.contains(&("World".to_string(), 0)));
        assert_eq!(len.stats().hits, 1);
        assert_eq!(len.stats().misses, 1);
    }

    #[test]
    fn distinct_arguments_are_distinct_entries() {
        let calls = Cell::new(0);
        let double = Memo::new(|n: i32| {
            calls.set(calls.get() + 1);
            n * 2
        });
        assert_eq!(double.call(1), 2);
        assert_eq!(double.call(2), 4);
        assert_eq!(double.call(1), 2);
        assert_eq!(calls.get(), 2);
        assert_eq!(double.len(), 2);
    }

    #[test]
    fn zero_arguments() {
        let calls = Cell::new(0);
        let hello = Memo::new(|()| {
            calls.set(calls.get() + 1);
            true
        });
        assert!(hello.call(()));
        assert!(hello.call(()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn instances_do_not_share_caches() {
        let calls = Cell::new(0);
        let core = |n: u32| {
            calls.set(calls.get() + 1);
            n + 1
        };
        let a = Memo::new(core);
        let b = Memo::new(core);
        assert_eq!(a.call(5), 6);
        assert!(a.contains(&5));
        assert!(!b.contains(&5));
        assert!(b.is_empty());
        assert_eq!(b.call(5), 6);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn recursive_fibonacci_computes_each_argument_once() {
        let calls = Cell::new(0);
        let fib = Memo::recursive(|fib, n: u64| {
            calls.set(calls.get() + 1);
            if n <= 1 {
                n
            } else {
                fib.call(n - 1) + fib.call(n - 2)
            }
        });
        assert_eq!(fib.call(3), 2);
        assert!(calls.get() <= 4);
        assert_eq!(fib.len(), 4);

        assert_eq!(fib.call(30), 832040);
        assert_eq!(calls.get(), 31);
    }

    #[cfg(feature = "full")]
    #[test]
    fn bounded_cache_stays_within_capacity() {
        let calls = Cell::new(0);
        let inc = Memo::with_cache(lru::LruCache::new(2), |n: u8| {
            calls.set(calls.get() + 1);
            n + 1
        });
        for n in 0..10 {
            assert_eq!(inc.call(n), n + 1);
            assert!(inc.len() <= 2);
        }
        assert!(inc.contains(&9));
        assert!(!inc.contains(&0));
        assert_eq!(inc.call(0), 1);
        assert_eq!(calls.get(), 11);
    }

    #[test]
    fn custom_hasher() {
        let map: HashMap<u64, u64, ahash::RandomState> =
            HashMap::with_hasher(ahash::RandomState::new());
        let triple = Memo::with_cache(map, |n: u64| n * 3);
        assert_eq!(triple.call(7), 21);
        assert_eq!(triple.call(7), 21);
        assert_eq!(triple.stats().hits, 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let calls = Cell::new(0);
        let parse = TryMemo::new(|s: String| {
            calls.set(calls.get() + 1);
            s.parse::<i64>()
        });
        assert!(parse.try_call("x1".to_string()).is_err());
        assert!(!parse.contains(&"x1".to_string()));
        assert!(parse.try_call("x1".to_string()).is_err());
        assert_eq!(calls.get(), 2);

        assert_eq!(parse.try_call("41".to_string()), Ok(41));
        assert_eq!(parse.try_call("41".to_string()), Ok(41));
        assert_eq!(calls.get(), 3);
        assert_eq!(parse.len(), 1);
    }

    #[test]
    fn recursive_errors_propagate() {
        let fact = TryMemo::recursive(|fact, n: i64| {
            if n < 0 {
                Err(format!("negative input {}", n))
            } else if n == 0 {
                Ok(1)
            } else {
                Ok(n * fact.try_call(n - 1)?)
            }
        });
        assert_eq!(fact.try_call(5), Ok(120));
        assert_eq!(fact.len(), 6);
        assert_eq!(fact.try_call(-1), Err("negative input -1".to_string()));
        assert!(!fact.contains(&-1));
    }

    #[test]
    fn panicking_call_leaves_cache_usable() {
        let checked = Memo::new(|n: u32| {
            assert!(n != 13, "unlucky");
            n
        });
        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| checked.call(13)));
        assert!(caught.is_err());
        assert!(!checked.contains(&13));
        assert_eq!(checked.call(12), 12);
    }
}
