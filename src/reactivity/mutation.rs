// ============================================================================
// spark-observe - Set / Del
// Field additions and deletions that interception alone cannot see
// ============================================================================
//
// A plain `put` of a new field on a tracked record adds untracked data, and
// a positional write on a sequence notifies nobody. These helpers perform
// the same mutations reactively: new fields are intercepted and the
// container set is notified, sequence positions are written via `splice`.
// ============================================================================

use crate::core::value::{Key, Value};
use crate::reactivity::define::define_reactive;

/// Set `key` on `target`, adding a reactive field if it does not exist yet.
///
/// Returns `value`. Primitive targets, non-index keys on a sequence and
/// indices the sequence cannot grow to are rejected with a warning and leave
/// everything untouched. Root state and
/// internal records get a warning but the field is still added.
///
/// # Example
///
/// ```
/// use spark_observe::{observe, set, Record, Value};
///
/// let state = Record::new();
/// observe(&Value::from(state.clone()), false);
///
/// set(&Value::from(state.clone()), "late", 1);
/// assert!(state.is_reactive("late"));
/// ```
pub fn set(target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> Value {
    let key = key.into();
    let value = value.into();

    match target {
        Value::Sequence(seq) => match key.as_index() {
            Some(index) => {
                if let Err(err) = seq.try_set_len(seq.len().max(index)) {
                    tracing::warn!(%key, error = %err, "cannot grow sequence to index");
                    return value;
                }
                seq.splice(index, 1, vec![value.clone()]);
            }
            None => {
                tracing::warn!(%key, "cannot set a non-index key on a sequence");
            }
        },
        Value::Record(record) => {
            let name = key.to_name();
            if record.has_own(&name) {
                record.put(&name, value.clone());
                return value;
            }

            let observer = record.observer();
            if record.is_internal() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
                tracing::warn!(
                    key = %name,
                    "avoid adding reactive fields to an internal or root state record at runtime"
                );
            }

            match observer {
                None => record.put(&name, value.clone()),
                Some(observer) => {
                    define_reactive(record, &name, Some(value.clone()), None, false);
                    if record.has_own(&name) {
                        observer.dep().notify();
                    }
                }
            }
        }
        _ => {
            tracing::warn!(
                %key,
                kind = target.kind(),
                "cannot set a reactive field on a primitive value"
            );
        }
    }
    value
}

/// Delete `key` from `target`, notifying the container set if it is tracked.
///
/// Deleting an absent field does nothing. A non-configurable field stays.
///
/// # Example
///
/// ```
/// use spark_observe::{del, Record, Value};
///
/// let record: Record = [("a", 1), ("b", 2)].into_iter().collect();
/// del(&Value::from(record.clone()), "a");
/// assert_eq!(record.keys(), vec!["b"]);
/// ```
pub fn del(target: &Value, key: impl Into<Key>) {
    let key = key.into();

    match target {
        Value::Sequence(seq) => match key.as_index() {
            Some(index) => {
                seq.splice(index, 1, Vec::new());
            }
            None => {
                tracing::warn!(%key, "cannot delete a non-index key from a sequence");
            }
        },
        Value::Record(record) => {
            let name = key.to_name();
            let observer = record.observer();
            if record.is_internal() || observer.as_ref().is_some_and(|ob| ob.root_count() > 0) {
                tracing::warn!(
                    key = %name,
                    "avoid deleting fields of an internal or root state record"
                );
            }

            if !record.has_own(&name) {
                return;
            }
            if !record.remove(&name) {
                tracing::debug!(key = %name, "non-configurable field not deleted");
                return;
            }
            if let Some(observer) = observer {
                observer.dep().notify();
            }
        }
        _ => {
            tracing::warn!(
                %key,
                kind = target.kind(),
                "cannot delete a reactive field of a primitive value"
            );
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
