// ============================================================================
// spark-observe - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// This reduces the boilerplate of manually cloning `Record` or `Sequence`
/// handles before moving them into a closure.
///
/// # Usage
///
/// ```rust
/// use spark_observe::{cloned, record, watch};
///
/// let a = record! { "n" => 1 };
/// let b = record! { "n" => 2 };
///
/// let sum = watch(cloned!(a, b => move || {
///     let n = |r: &spark_observe::Record| r.get("n").and_then(|v| v.as_number());
///     n(&a).unwrap_or(0.0) + n(&b).unwrap_or(0.0)
/// }));
/// assert_eq!(sum.value(), Some(3.0));
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Create a watcher with automatic variable capturing.
///
/// Wraps `watch(cloned!(... => move || ...))`.
///
/// # Usage
///
/// ```rust
/// use spark_observe::{observe, record, watch, Value};
///
/// let state = record! { "name" => "ada" };
/// observe(&Value::from(state.clone()), true);
///
/// let greeting = watch!(state => format!("hi {}", state.get("name").unwrap_or_default()));
/// assert_eq!(greeting.value().as_deref(), Some("hi ada"));
///
/// state.put("name", "grace");
/// assert_eq!(greeting.value().as_deref(), Some("hi grace"));
/// ```
#[macro_export]
macro_rules! watch {
    // Case 1: With dependencies
    ($($deps:ident),+ => $body:expr) => {
        $crate::watch($crate::cloned!($($deps),+ => move || $body))
    };
    // Case 2: No dependencies
    ($body:expr) => {
        $crate::watch(move || $body)
    };
}

/// Build a plain (not yet observed) record from `key => value` pairs.
///
/// ```rust
/// use spark_observe::{record, Value};
///
/// let user = record! { "name" => "ada", "age" => 36 };
/// assert_eq!(user.keys(), vec!["name", "age"]);
/// assert_eq!(user.get("age"), Some(Value::from(36)));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Record::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let record = $crate::Record::new();
            $( record.put($key, $crate::Value::from($value)); )+
            record
        }
    };
}

/// Build a plain (not yet observed) sequence.
///
/// ```rust
/// use spark_observe::{seq, Value};
///
/// let list = seq![1, "two", true];
/// assert_eq!(list.len(), 3);
/// assert_eq!(list.get(1), Some(Value::from("two")));
/// ```
#[macro_export]
macro_rules! seq {
    () => {
        $crate::Sequence::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Sequence::from_vec(vec![$( $crate::Value::from($value) ),+])
    };
}
