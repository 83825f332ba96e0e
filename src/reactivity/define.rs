// ============================================================================
// spark-observe - Field Interception
// Turns one record field into a tracked slot: reads depend, writes notify
// ============================================================================
//
// Each intercepted field owns its own dependency set plus a cached observer
// for its current value (when that value is a record or sequence). Reading
// the field subscribes to both, so replacing the field and mutating the
// nested container are each visible through the parent field. The cache is
// recomputed on every write.
// ============================================================================

use std::cell::RefCell;
use std::rc::Rc;

use crate::collections::{Getter, Property, Record, Setter, Slot};
use crate::core::context::is_tracking;
use crate::core::value::Value;
use crate::reactivity::dep::Dep;
use crate::reactivity::equality::same_value;
use crate::reactivity::observer::{depend_array, observe, Observer};

/// Hook run just before an intercepted field stores a new value.
///
/// Used by callers that want a diagnostic when a field is written directly
/// (for example, props mutated by a child component).
pub type InvalidationHook = Rc<dyn Fn()>;

// =============================================================================
// REACTIVE FIELD
// =============================================================================

/// The state behind one intercepted field.
pub(crate) struct ReactiveField {
    key: String,

    /// Stored value, used when the field had no accessor of its own
    value: RefCell<Value>,

    /// Accessor pair the field had before interception
    getter: Option<Getter>,
    setter: Option<Setter>,

    dep: Dep,

    /// Observer of the current value, refreshed on every write
    child: RefCell<Option<Rc<Observer>>>,

    shallow: bool,
    hook: Option<InvalidationHook>,
}

impl ReactiveField {
    pub(crate) fn dep(&self) -> &Dep {
        &self.dep
    }

    fn current(&self) -> Value {
        match &self.getter {
            Some(getter) => getter(),
            None => self.value.borrow().clone(),
        }
    }

    /// Tracked read.
    pub(crate) fn get(&self) -> Value {
        let value = self.current();
        if is_tracking() {
            self.dep.depend();
            let child = self.child.borrow().clone();
            if let Some(child) = child {
                child.dep().depend();
                if let Value::Sequence(seq) = &value {
                    depend_array(&seq.to_vec());
                }
            }
        }
        value
    }

    /// Notifying write.
    pub(crate) fn set(&self, new_value: Value) {
        let old = self.current();
        if same_value(&old, &new_value) {
            return;
        }
        if self.getter.is_some() && self.setter.is_none() {
            tracing::debug!(key = %self.key, "write to getter-only field ignored");
            return;
        }
        if let Some(hook) = &self.hook {
            hook();
        }
        match &self.setter {
            Some(setter) => setter(new_value.clone()),
            None => *self.value.borrow_mut() = new_value.clone(),
        }
        let child = if self.shallow {
            None
        } else {
            observe(&new_value, false)
        };
        *self.child.borrow_mut() = child;

        tracing::trace!(key = %self.key, dep = %self.dep.id(), "field changed");
        self.dep.notify();
    }
}

// =============================================================================
// DEFINE REACTIVE
// =============================================================================

/// Intercept `key` on `record` so reads register the active subscriber and
/// writes notify everyone who read it.
///
/// - `value`: the initial value. `None` adopts the field's current value
///   (read through its getter, unless the field is getter-only).
/// - `hook`: run before each effective write.
/// - `shallow`: do not observe the field's value.
///
/// A non-configurable field is left untouched. A missing field cannot be
/// added to a non-extensible record; that case is skipped with a debug event.
///
/// # Example
///
/// ```
/// use spark_observe::{define_reactive, Record, Value};
///
/// let record = Record::new();
/// define_reactive(&record, "count", Some(Value::from(0)), None, false);
/// assert!(record.is_reactive("count"));
/// assert_eq!(record.get("count"), Some(Value::from(0)));
/// ```
pub fn define_reactive(
    record: &Record,
    key: &str,
    value: Option<Value>,
    hook: Option<InvalidationHook>,
    shallow: bool,
) {
    let existing = record.property(key);
    if existing.as_ref().is_some_and(|prop| !prop.configurable) {
        return;
    }
    if existing.is_none() && !record.is_extensible() {
        tracing::debug!(key, "cannot define reactive field on non-extensible record");
        return;
    }

    // Keep whatever accessor the field already had
    let (getter, setter) = match existing.map(|prop| prop.slot) {
        Some(Slot::Accessor { get, set }) => (get, set),
        Some(Slot::Reactive(field)) => {
            let read = field.clone();
            let write = field;
            (
                Some(Rc::new(move || read.get()) as Getter),
                Some(Rc::new(move |v| write.set(v)) as Setter),
            )
        }
        Some(Slot::Data(_)) | None => (None, None),
    };

    let value = match value {
        Some(value) => value,
        None if getter.is_none() || setter.is_some() => record.get(key).unwrap_or_default(),
        None => Value::Null,
    };

    let child = if shallow { None } else { observe(&value, false) };

    let field = ReactiveField {
        key: key.to_string(),
        value: RefCell::new(value),
        getter,
        setter,
        dep: Dep::new(),
        child: RefCell::new(child),
        shallow,
        hook,
    };

    record.define(
        key,
        Property {
            slot: Slot::Reactive(Rc::new(field)),
            enumerable: true,
            configurable: true,
        },
    );
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Sequence;
    use crate::core::context::with_subscriber;
    use crate::core::error::Result;
    use crate::core::types::Subscriber;
    use std::cell::Cell;

    struct Probe {
        runs: Cell<usize>,
    }

    impl Subscriber for Probe {
        fn update(&self) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            Ok(())
        }
    }

    fn probe() -> (Rc<Probe>, Rc<dyn Subscriber>) {
        let probe = Rc::new(Probe { runs: Cell::new(0) });
        let sub: Rc<dyn Subscriber> = probe.clone();
        (probe, sub)
    }

    #[test]
    fn read_registers_and_write_notifies() {
        let record = Record::new();
        define_reactive(&record, "x", Some(Value::from(1)), None, false);

        let (probe, sub) = probe();
        with_subscriber(Some(sub.clone()), || record.get("x"));

        let dep = record.field_dep("x").expect("intercepted");
        assert!(dep.contains(&sub));

        record.put("x", 2);
        assert_eq!(probe.runs.get(), 1);
        assert_eq!(record.get("x"), Some(Value::from(2)));
    }

    #[test]
    fn equal_writes_do_not_notify() {
        let record = Record::new();
        define_reactive(&record, "n", Some(Value::from(f64::NAN)), None, false);

        let (probe, sub) = probe();
        with_subscriber(Some(sub), || record.get("n"));

        record.put("n", f64::NAN);
        assert_eq!(probe.runs.get(), 0);

        record.put("n", 1);
        record.put("n", 1);
        assert_eq!(probe.runs.get(), 1);
    }

    #[test]
    fn adopts_existing_value_when_none_given() {
        let record = Record::new();
        record.put("name", "ada");
        define_reactive(&record, "name", None, None, false);
        assert!(record.is_reactive("name"));
        assert_eq!(record.get("name"), Some(Value::from("ada")));
    }

    #[test]
    fn wraps_existing_accessor() {
        let backing = Rc::new(RefCell::new(Value::from(5)));
        let record = Record::new();
        let (get_b, set_b) = (backing.clone(), backing.clone());
        record.define_accessor(
            "x",
            Some(Rc::new(move || get_b.borrow().clone())),
            Some(Rc::new(move |v| *set_b.borrow_mut() = v)),
        );
        define_reactive(&record, "x", None, None, false);

        let (probe, sub) = probe();
        with_subscriber(Some(sub), || assert_eq!(record.get("x"), Some(Value::from(5))));

        record.put("x", 6);
        assert_eq!(*backing.borrow(), Value::from(6));
        assert_eq!(probe.runs.get(), 1);
    }

    #[test]
    fn getter_only_field_ignores_writes() {
        let record = Record::new();
        record.define_accessor("k", Some(Rc::new(|| Value::from(1))), None);
        define_reactive(&record, "k", None, None, false);

        let (probe, sub) = probe();
        with_subscriber(Some(sub), || record.get("k"));

        record.put("k", 2);
        assert_eq!(record.get("k"), Some(Value::from(1)));
        assert_eq!(probe.runs.get(), 0);
    }

    #[test]
    fn non_configurable_fields_are_skipped() {
        let record = Record::new();
        record.define_fixed("id", 1);
        define_reactive(&record, "id", None, None, false);
        assert!(!record.is_reactive("id"));
    }

    #[test]
    fn hook_runs_before_effective_writes() {
        let calls = Rc::new(Cell::new(0));
        let record = Record::new();
        let hook_calls = calls.clone();
        define_reactive(
            &record,
            "prop",
            Some(Value::from(1)),
            Some(Rc::new(move || hook_calls.set(hook_calls.get() + 1))),
            false,
        );

        record.put("prop", 1);
        assert_eq!(calls.get(), 0);
        record.put("prop", 2);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn shallow_fields_do_not_observe_values() {
        let nested = Record::new();
        nested.put("c", 1);
        let record = Record::new();
        define_reactive(&record, "deep", Some(nested.clone().into()), None, true);

        assert!(nested.observer().is_none());
        assert!(!nested.is_reactive("c"));
    }

    #[test]
    fn reading_a_sequence_field_depends_on_its_elements() {
        let inner = Record::new();
        inner.put("v", 1);
        let list: Sequence = [Value::from(inner.clone())].into_iter().collect();
        let record = Record::new();
        define_reactive(&record, "list", Some(list.clone().into()), None, false);

        let (probe, sub) = probe();
        with_subscriber(Some(sub.clone()), || record.get("list"));

        let list_ob = list.observer().expect("observed");
        let inner_ob = inner.observer().expect("observed");
        assert!(list_ob.dep().contains(&sub));
        assert!(inner_ob.dep().contains(&sub));

        // A shape change inside the element reaches the reader of the parent
        inner_ob.dep().notify();
        assert_eq!(probe.runs.get(), 1);
    }

    #[test]
    fn untracked_reads_create_no_edges() {
        let record = Record::new();
        define_reactive(&record, "x", Some(Value::from(1)), None, false);
        record.get("x");
        assert_eq!(record.field_dep("x").map(|d| d.subscriber_count()), Some(0));
    }
}
