use memocall::{memo, Memo};
use std::cell::Cell;

#[memo]
fn fibonacci(n: u64) -> u64 {
    if n <= 1 {
        n
    } else {
        fibonacci(n - 1) + fibonacci(n - 2)
    }
}

fn main() {
    // Cache hits and misses of the wrapper objects are traced.
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let fibs = (0..21).map(fibonacci).collect::<Vec<u64>>();
    println!("fibonacci([0,...,20]) = {:?}", fibs);
    println!("cached entries: {}", memo_size_fibonacci());

    let calls = Cell::new(0);
    let fib = Memo::recursive(|fib, n: u64| {
        calls.set(calls.get() + 1);
        if n <= 1 {
            n
        } else {
            fib.call(n - 1) + fib.call(n - 2)
        }
    });
    println!("fibonacci(3) = {}", fib.call(3));
    println!("underlying calls: {}, {}", calls.get(), fib.stats());
}
