/*!
 * memocall caches the results of pure functions, keyed by their arguments.
 *
 * There are two ways in:
 *
 * - Wrapper objects, for closures and anything built at runtime. [`Memo`] and [`TryMemo`] are
 *   single-threaded; [`SyncMemo`] may be shared between threads; [`DynMemo`] takes dynamically
 *   typed argument lists and skips the cache for arguments that cannot be hashed.
 * - The [`memo`] attribute, for free functions. The function is replaced by a memoizing version
 *   under the same name, so recursive calls go through the cache as well.
 *
 * Every wrapper (and every annotated function) owns its own cache. Caches are never cleared and
 * grow without bound, unless a bounded `lru::LruCache` is chosen as store (feature `full`).
 *
 * ```
 * use memocall::memo;
 *
 * #[memo]
 * fn fibonacci(n: u64) -> u64 {
 *     if n <= 1 {
 *         n
 *     } else {
 *         fibonacci(n - 1) + fibonacci(n - 2)
 *     }
 * }
 *
 * assert_eq!(fibonacci(3), 2);
 * assert_eq!(memo_size_fibonacci(), 4);
 * ```
 *
 * Cache activity is reported as `trace` level `tracing` events with target `memocall`.
 */

mod dynamic;
mod memo;
mod shared;
mod stats;
mod store;

pub use dynamic::{is_hashable, DynMemo, Key, Value};
pub use memo::{Memo, TryMemo};
pub use shared::SyncMemo;
pub use stats::CacheStats;
pub use store::CacheMap;

pub use memocall_inner::memo;

// Used by code generated by `#[memo]`.
pub use lazy_static;
#[cfg(feature = "full")]
pub use lru;
