// ============================================================================
// spark-observe - Observer
// Per-container metadata: the container-level dependency set and the walk
// that intercepts every field (records) or every element (sequences)
// ============================================================================
//
// A record or sequence owns its observer through an `Rc` slot. The observer
// keeps no reference back to its value, so the pair never forms a cycle and
// both go away when the last handle to the value is dropped.
//
// The container-level set is notified for shape changes the per-field sets
// cannot see: fields added through `set`, fields removed through `del`, and
// the intercepted sequence mutators.
// ============================================================================

use std::cell::Cell;
use std::rc::Rc;

use crate::collections::{Record, Sequence};
use crate::core::context::{should_observe, with_context};
use crate::core::types::ObserverId;
use crate::core::value::Value;
use crate::reactivity::array::INTERCEPTED_METHODS;
use crate::reactivity::define::define_reactive;
use crate::reactivity::dep::Dep;

// =============================================================================
// OBSERVER
// =============================================================================

/// Tracking metadata attached to an observed record or sequence.
#[derive(Debug)]
pub struct Observer {
    id: ObserverId,
    dep: Dep,

    /// How many times the value was observed as the root state of a component
    root_count: Cell<usize>,
}

impl Observer {
    fn new() -> Rc<Self> {
        Rc::new(Self {
            id: with_context(|ctx| ctx.next_observer_id()),
            dep: Dep::new(),
            root_count: Cell::new(0),
        })
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// The container-level dependency set.
    pub fn dep(&self) -> &Dep {
        &self.dep
    }

    pub fn root_count(&self) -> usize {
        self.root_count.get()
    }

    /// Intercept every enumerable field of `record`.
    pub fn walk(&self, record: &Record) {
        for key in record.keys() {
            define_reactive(record, &key, None, None, false);
        }
    }

    /// Observe every element of a sequence.
    pub fn observe_array(&self, items: &[Value]) {
        for item in items {
            observe(item, false);
        }
    }

    fn attach_record(record: &Record) -> Rc<Self> {
        let observer = Self::new();
        // Attach before walking so self-referencing graphs terminate
        record.attach_observer(observer.clone());
        tracing::trace!(observer = %observer.id, "observing record");
        observer.walk(record);
        observer
    }

    fn attach_sequence(seq: &Sequence) -> Rc<Self> {
        let observer = Self::new();
        seq.attach_observer(observer.clone());
        seq.install_methods(&INTERCEPTED_METHODS);
        tracing::trace!(observer = %observer.id, len = seq.len(), "observing sequence");
        observer.observe_array(&seq.to_vec());
        observer
    }
}

// =============================================================================
// OBSERVE
// =============================================================================

/// Make `value` tracked, returning its observer.
///
/// Primitives have no observer. A value that is already tracked returns its
/// existing observer. A new observer is attached only while observing is
/// enabled (see [`toggle_observing`](crate::toggle_observing)) and only to
/// extensible, non-internal values. `as_root` marks the value as the root
/// state of a component.
///
/// # Example
///
/// ```
/// use spark_observe::{observe, Record, Value};
///
/// let state = Record::new();
/// state.put("count", 0);
///
/// let value = Value::from(state.clone());
/// let observer = observe(&value, true).expect("records are observable");
/// assert!(state.is_reactive("count"));
/// assert_eq!(observer.root_count(), 1);
///
/// // Observing twice returns the same observer
/// let again = observe(&value, false).expect("still observed");
/// assert_eq!(again.id(), observer.id());
///
/// assert!(observe(&Value::from(1), false).is_none());
/// ```
pub fn observe(value: &Value, as_root: bool) -> Option<Rc<Observer>> {
    let observer = match value {
        Value::Record(record) => record.observer().or_else(|| {
            (should_observe() && record.is_extensible() && !record.is_internal())
                .then(|| Observer::attach_record(record))
        }),
        Value::Sequence(seq) => seq.observer().or_else(|| {
            (should_observe() && seq.is_extensible()).then(|| Observer::attach_sequence(seq))
        }),
        _ => None,
    };

    if as_root {
        if let Some(observer) = &observer {
            observer.root_count.set(observer.root_count.get() + 1);
        }
    }
    observer
}

/// Register the active subscriber on the container set of every element,
/// descending into nested sequences.
///
/// Sequence elements are not intercepted individually, so reading a
/// sequence field has to depend on its elements' containers directly.
///
/// The walk has no visited set: a sequence that contains itself recurses
/// until the stack overflows.
pub fn depend_array(items: &[Value]) {
    for item in items {
        if let Some(observer) = item.observer() {
            observer.dep().depend();
        }
        if let Value::Sequence(seq) = item {
            depend_array(&seq.to_vec());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{toggle_observing, with_subscriber};
    use crate::core::error::Result;
    use crate::core::types::Subscriber;

    struct Noop;

    impl Subscriber for Noop {
        fn update(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn primitives_have_no_observer() {
        assert!(observe(&Value::Null, false).is_none());
        assert!(observe(&Value::from(true), false).is_none());
        assert!(observe(&Value::from("s"), true).is_none());
    }

    #[test]
    fn observing_walks_nested_records() {
        let inner: Record = [("c", 2)].into_iter().collect();
        let outer = Record::new();
        outer.put("a", 1);
        outer.put("b", inner.clone());

        observe(&outer.clone().into(), false);

        assert!(outer.is_reactive("a"));
        assert!(outer.is_reactive("b"));
        assert!(inner.is_reactive("c"));
        assert!(inner.observer().is_some());
    }

    #[test]
    fn observe_is_idempotent() {
        let record = Record::new();
        let value = Value::from(record);
        let first = observe(&value, false).expect("observed");
        let second = observe(&value, true).expect("observed");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.root_count(), 1);
    }

    #[test]
    fn sequences_get_intercepted_mutators() {
        let element = Record::new();
        let seq: Sequence = [Value::from(element.clone()), Value::from(1)]
            .into_iter()
            .collect();

        observe(&seq.clone().into(), false);
        assert!(seq.is_intercepted());
        assert!(element.observer().is_some());
    }

    #[test]
    fn skips_non_extensible_and_internal_values() {
        let frozen = Record::new();
        frozen.prevent_extensions();
        assert!(observe(&frozen.into(), false).is_none());

        let internal = Record::new();
        internal.mark_internal();
        assert!(observe(&internal.into(), false).is_none());

        let seq = Sequence::new();
        seq.prevent_extensions();
        assert!(observe(&seq.clone().into(), false).is_none());
        assert!(!seq.is_intercepted());
    }

    #[test]
    fn toggle_disables_new_observers_only() {
        let tracked = Record::new();
        let tracked_value = Value::from(tracked);
        let existing = observe(&tracked_value, false).expect("observed");

        let previous = toggle_observing(false);
        assert!(previous);
        assert!(observe(&Record::new().into(), false).is_none());
        let again = observe(&tracked_value, false).expect("existing still returned");
        assert_eq!(again.id(), existing.id());
        toggle_observing(previous);
    }

    #[test]
    fn self_referencing_record_terminates() {
        let record = Record::new();
        record.put("me", record.clone());
        observe(&record.clone().into(), false);
        assert!(record.is_reactive("me"));
    }

    #[test]
    fn depend_array_reaches_nested_sequences() {
        let deep = Record::new();
        let inner: Sequence = [Value::from(deep.clone())].into_iter().collect();
        let outer: Sequence = [Value::from(inner.clone())].into_iter().collect();
        observe(&outer.clone().into(), false);

        let sub: Rc<dyn Subscriber> = Rc::new(Noop);
        with_subscriber(Some(sub.clone()), || depend_array(&outer.to_vec()));

        let inner_ob = inner.observer().expect("observed");
        let deep_ob = deep.observer().expect("observed");
        assert!(inner_ob.dep().contains(&sub));
        assert!(deep_ob.dep().contains(&sub));
    }
}
