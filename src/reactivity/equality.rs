// ============================================================================
// spark-observe - Equality
// The comparison that decides whether a write is a change at all
// ============================================================================

use crate::core::value::Value;

// =============================================================================
// SAFE NUMBER EQUALITY (NaN is equal to itself)
// =============================================================================

/// Not-equal check for f64 where NaN equals NaN.
///
/// # Example
/// ```
/// use spark_observe::reactivity::equality::safe_not_equal_f64;
///
/// assert!(safe_not_equal_f64(1.0, 2.0));
/// assert!(!safe_not_equal_f64(1.0, 1.0));
///
/// // Two NaNs are "the same value"
/// assert!(!safe_not_equal_f64(f64::NAN, f64::NAN));
/// assert!(safe_not_equal_f64(f64::NAN, 1.0));
/// ```
pub fn safe_not_equal_f64(a: f64, b: f64) -> bool {
    if a.is_nan() {
        return !b.is_nan();
    }
    a != b
}

/// Equality for f64 where NaN equals NaN.
pub fn safe_equals_f64(a: f64, b: f64) -> bool {
    !safe_not_equal_f64(a, b)
}

// =============================================================================
// SAME VALUE (write-path equality)
// =============================================================================

/// Whether writing `new` over `old` is a no-op.
///
/// Records and sequences compare by identity, primitives by value. Two NaN
/// numbers count as the same value; without that, a field holding NaN would
/// notify on every write of NaN. No other value gets special treatment.
///
/// # Example
/// ```
/// use spark_observe::{same_value, Record, Value};
///
/// assert!(same_value(&Value::from(f64::NAN), &Value::from(f64::NAN)));
/// assert!(same_value(&Value::from("a"), &Value::from("a")));
///
/// let r = Record::new();
/// assert!(same_value(&Value::from(r.clone()), &Value::from(r)));
/// assert!(!same_value(&Value::from(Record::new()), &Value::from(Record::new())));
/// ```
pub fn same_value(old: &Value, new: &Value) -> bool {
    match (old, new) {
        (Value::Number(a), Value::Number(b)) => safe_equals_f64(*a, *b),
        _ => old == new,
    }
}

// =============================================================================
// TESTS
// =============================================================================
