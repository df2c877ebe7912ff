use memocall::memo;
use rustc_hash::FxHashMap;

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

// The default store is thread-local and every test runs on its own thread, so each test below
// starts with empty caches. Call counters are thread-local for the same reason.
thread_local! {
    static FIB_CALLS: Cell<u32> = Cell::new(0);
    static HELLO_CALLS: Cell<u32> = Cell::new(0);
    static PARSE_CALLS: Cell<u32> = Cell::new(0);
    static LEN_CALLS: Cell<u32> = Cell::new(0);
}

fn bump(counter: &'static std::thread::LocalKey<Cell<u32>>) {
    counter.with(|c| c.set(c.get() + 1));
}

fn count(counter: &'static std::thread::LocalKey<Cell<u32>>) -> u32 {
    counter.with(Cell::get)
}

#[memo]
fn fibonacci(n: u64) -> u64 {
    bump(&FIB_CALLS);
    if n <= 1 {
        n
    } else {
        fibonacci(n - 1) + fibonacci(n - 2)
    }
}

#[test]
fn recursive_calls_share_the_cache() {
    assert_eq!(fibonacci(3), 2);
    assert!(count(&FIB_CALLS) <= 4);
    assert_eq!(memo_size_fibonacci(), 4);

    assert_eq!(fibonacci(50), 12586269025);
    assert_eq!(count(&FIB_CALLS), 51);
}

#[memo]
fn hello(arg: String, arg2: usize) -> bool {
    bump(&HELLO_CALLS);
    arg.len() % 2 == arg2
}

#[test]
fn repeated_call_is_served_from_cache() {
    assert!(!hello("World".to_string(), 0));
    assert!(!hello("World".to_string(), 0));
    assert_eq!(count(&HELLO_CALLS), 1);

    // The original stays callable and bypasses the cache.
    assert!(!memo_original_hello("World".to_string(), 0));
    assert_eq!(count(&HELLO_CALLS), 2);
    assert_eq!(memo_size_hello(), 1);
}

#[memo]
fn parse_port(s: String) -> Result<u16, String> {
    bump(&PARSE_CALLS);
    s.parse::<u16>().map_err(|e| format!("{}: {}", s, e))
}

#[test]
fn errors_are_returned_but_not_cached() {
    assert!(parse_port("http".to_string()).is_err());
    assert!(parse_port("http".to_string()).is_err());
    assert_eq!(count(&PARSE_CALLS), 2);
    assert_eq!(memo_size_parse_port(), 0);

    assert_eq!(parse_port("8080".to_string()), Ok(8080));
    assert_eq!(parse_port("8080".to_string()), Ok(8080));
    assert_eq!(count(&PARSE_CALLS), 3);
    assert_eq!(memo_size_parse_port(), 1);
}

#[memo]
fn expensive(mut foo: i32) -> i32 {
    foo += 1;
    foo
}

#[test]
fn mutable_bindings() {
    assert_eq!(expensive(7), 8);
    assert_eq!(expensive(7), 8);
}

#[memo]
fn manhattan_distance(_p1 @ (x1, y1): (i32, i32), _p2 @ (x2, y2): (i32, i32)) -> i32 {
    (x1 - x2).abs() + (y1 - y2).abs()
}

#[test]
fn named_patterns() {
    assert_eq!(manhattan_distance((1, 1), (1, 3)), 2);
    assert_eq!(memo_size_manhattan_distance(), 1);
}

#[memo]
fn answer() -> u32 {
    42
}

#[test]
fn no_arguments() {
    assert_eq!(answer(), 42);
    assert_eq!(answer(), 42);
    assert_eq!(memo_size_answer(), 1);
}

#[memo]
fn per_thread(n: u8) -> u8 {
    n
}

#[test]
fn default_store_is_per_thread() {
    per_thread(1);
    assert_eq!(memo_size_per_thread(), 1);
    thread::spawn(|| assert_eq!(memo_size_per_thread(), 0))
        .join()
        .unwrap();
}

static SHARED_CALLS: AtomicUsize = AtomicUsize::new(0);

#[memo(Shared)]
fn shared_square(n: u64) -> u64 {
    SHARED_CALLS.fetch_add(1, Ordering::SeqCst);
    n * n
}

#[test]
fn shared_store_spans_threads() {
    assert_eq!(shared_square(12), 144);
    thread::spawn(|| assert_eq!(shared_square(12), 144))
        .join()
        .unwrap();
    assert_eq!(SHARED_CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(memo_size_shared_square(), 1);
}

#[memo(CustomHasher: FxHashMap, HasherInit: FxHashMap::default())]
fn word_len(word: String) -> usize {
    bump(&LEN_CALLS);
    word.len()
}

#[test]
fn custom_hasher() {
    assert_eq!(word_len("memo".to_string()), 4);
    assert_eq!(word_len("memo".to_string()), 4);
    assert_eq!(count(&LEN_CALLS), 1);
}

#[memo(CustomHasher: std::collections::HashMap)]
fn negate(b: bool) -> bool {
    !b
}

#[test]
fn custom_hasher_with_new() {
    assert!(negate(false));
    assert_eq!(memo_size_negate(), 1);
}

#[cfg(feature = "full")]
mod bounded {
    use super::*;

    #[memo(Capacity: 2)]
    fn twice(n: u32) -> u32 {
        n * 2
    }

    #[test]
    fn capacity_bounds_the_store() {
        for n in 0..5 {
            assert_eq!(twice(n), n * 2);
        }
        assert_eq!(memo_size_twice(), 2);
    }

    #[memo(Shared, Capacity: 8)]
    fn shared_bounded(arg: &'static str) -> Result<usize, String> {
        Ok(arg.len())
    }

    #[test]
    fn shared_and_bounded() {
        assert_eq!(shared_bounded("Hello World"), Ok(11));
        assert_eq!(memo_size_shared_bounded(), 1);
    }
}
