//! Memoization for dynamically typed argument lists.
//!
//! When arguments arrive as a runtime list of [`Value`]s, whether they can serve as a cache key
//! is only known per call. [`DynMemo`] checks every call: if all arguments convert to a [`Key`]
//! the cache is used, otherwise the function is called directly and nothing is stored.

use crate::memo::Slot;
use crate::stats::CacheStats;
use crate::store::CacheMap;

use std::collections::HashMap;
use std::fmt;

/// A dynamically typed argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Immutable sequence; hashable when all of its elements are.
    Tuple(Vec<Value>),
    /// Mutable sequence; never hashable.
    List(Vec<Value>),
}

impl Value {
    /// Whether this value supports value-based hashing and equality.
    pub fn is_hashable(&self) -> bool {
        match self {
            Value::List(_) => false,
            Value::Tuple(items) => items.iter().all(Value::is_hashable),
            _ => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Value {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Value {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                seq(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "[")?;
                seq(f, items)?;
                write!(f, "]")
            }
        }
    }
}

/// Whether every argument in the list is hashable.
pub fn is_hashable(args: &[Value]) -> bool {
    args.iter().all(Value::is_hashable)
}

/// The hashable subset of [`Value`], used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Bool(bool),
    Int(i64),
    /// Bit pattern of the float, with `-0.0` folded into `0.0`.
    Float(u64),
    Str(String),
    Tuple(Vec<Key>),
}

impl Key {
    /// Derives the key for `value`, or `None` if it is not hashable.
    pub fn from_value(value: &Value) -> Option<Key> {
        Some(match value {
            Value::None => Key::None,
            Value::Bool(b) => Key::Bool(*b),
            Value::Int(i) => Key::Int(*i),
            Value::Float(x) => Key::Float(if *x == 0.0 { 0 } else { x.to_bits() }),
            Value::Str(s) => Key::Str(s.clone()),
            Value::Tuple(items) => Key::Tuple(Key::from_args(items)?),
            Value::List(_) => return None,
        })
    }

    /// Derives the key for a whole argument list, or `None` if any argument is not hashable.
    pub fn from_args(args: &[Value]) -> Option<Vec<Key>> {
        args.iter().map(Key::from_value).collect()
    }
}

type DynCallee<'f, M, R, E> = Box<dyn Fn(&M, &[Value]) -> Result<R, E> + 'f>;

/// Memoizing wrapper for functions of a variable, dynamically typed argument list.
///
/// The wrapped function may fail; errors propagate and are never cached. Calls with an
/// unhashable argument (a [`Value::List`] anywhere in the list) always invoke the function and
/// are counted as `uncached` in [`CacheStats`].
///
/// ```
/// use memocall::{DynMemo, Value};
///
/// let total = DynMemo::new(|args: &[Value]| -> Result<i64, String> {
///     args.iter()
///         .map(|a| a.as_int().ok_or_else(|| format!("not an int: {}", a)))
///         .sum()
/// });
/// assert_eq!(total.call(&[Value::Int(1), Value::Int(2)]), Ok(3));
/// assert_eq!(total.call(&[Value::Int(1), Value::Int(2)]), Ok(3));
/// assert_eq!(total.stats().hits, 1);
/// assert!(total.call(&[Value::from("x")]).is_err());
/// ```
pub struct DynMemo<'f, R, E, C = HashMap<Vec<Key>, R>> {
    func: DynCallee<'f, DynMemo<'f, R, E, C>, R, E>,
    slot: Slot<Vec<Key>, R, C>,
}

impl<'f, R, E> DynMemo<'f, R, E>
where
    R: Clone,
{
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<R, E> + 'f,
    {
        DynMemo::with_cache(HashMap::new(), func)
    }

    /// Wraps a function that recurses through the wrapper it is given.
    pub fn recursive<F>(func: F) -> Self
    where
        F: Fn(&Self, &[Value]) -> Result<R, E> + 'f,
    {
        DynMemo::recursive_with_cache(HashMap::new(), func)
    }
}

impl<'f, R, E, C> DynMemo<'f, R, E, C>
where
    R: Clone,
    C: CacheMap<Vec<Key>, R>,
{
    pub fn with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<R, E> + 'f,
    {
        DynMemo::recursive_with_cache(map, move |_: &Self, args: &[Value]| func(args))
    }

    pub fn recursive_with_cache<F>(map: C, func: F) -> Self
    where
        F: Fn(&Self, &[Value]) -> Result<R, E> + 'f,
    {
        DynMemo {
            func: Box::new(func),
            slot: Slot::new(map),
        }
    }

    /// Calls the function through the cache when all arguments are hashable, and directly
    /// otherwise.
    pub fn call(&self, args: &[Value]) -> Result<R, E> {
        let key = match Key::from_args(args) {
            Some(key) => key,
            None => {
                self.slot.bypass("dyn_memo");
                return (self.func)(self, args);
            }
        };
        if let Some(r) = self.slot.recall(&key, "dyn_memo") {
            return Ok(r);
        }
        let r = (self.func)(self, args)?;
        self.slot.store(key, r.clone());
        Ok(r)
    }

    /// Whether a result for `args` is cached. Always false for unhashable arguments.
    pub fn contains(&self, args: &[Value]) -> bool {
        Key::from_args(args).map_or(false, |key| self.slot.holds(&key))
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
