// ============================================================================
// spark-observe - Record
// An ordered map of named properties with explicit accessor slots
// ============================================================================
//
// Rust has no property traps, so every field lives in an explicit slot:
// plain data, a user accessor pair, or an intercepted slot installed by
// `define_reactive`. Reads and writes go through `get`/`put`, which dispatch
// on the slot kind. Slots are cloned out of the map before any callback
// runs, so getters and setters may freely re-enter the record.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::value::Value;
use crate::reactivity::define::ReactiveField;
use crate::reactivity::dep::Dep;
use crate::reactivity::observer::Observer;

// =============================================================================
// PROPERTY SLOTS
// =============================================================================

/// Computed read for an accessor property
pub type Getter = Rc<dyn Fn() -> Value>;

/// Write handler for an accessor property
pub type Setter = Rc<dyn Fn(Value)>;

#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    Reactive(Rc<ReactiveField>),
}

#[derive(Clone)]
pub(crate) struct Property {
    pub(crate) slot: Slot,
    pub(crate) enumerable: bool,
    pub(crate) configurable: bool,
}

impl Property {
    pub(crate) fn data(value: Value) -> Self {
        Self {
            slot: Slot::Data(value),
            enumerable: true,
            configurable: true,
        }
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// A shared, mutable record of named fields.
///
/// Cloning a `Record` clones the handle; both clones see the same fields and
/// the same observer.
///
/// # Example
///
/// ```
/// use spark_observe::{Record, Value};
///
/// let user = Record::new();
/// user.put("name", "ada");
/// assert_eq!(user.get("name"), Some(Value::from("ada")));
/// assert_eq!(user.get("missing"), None);
/// ```
#[derive(Clone, Default)]
pub struct Record {
    inner: Rc<RecordInner>,
}

struct RecordInner {
    props: RefCell<IndexMap<String, Property>>,
    extensible: Cell<bool>,
    internal: Cell<bool>,
    observer: RefCell<Option<Rc<Observer>>>,
}

impl Default for RecordInner {
    fn default() -> Self {
        Self {
            props: RefCell::new(IndexMap::new()),
            extensible: Cell::new(true),
            internal: Cell::new(false),
            observer: RefCell::new(None),
        }
    }
}

impl Record {
    /// Create an empty, extensible record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether two handles point at the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // READ / WRITE
    // =========================================================================

    /// Read a field.
    ///
    /// Intercepted fields register the active subscriber; accessor fields run
    /// their getter. Returns `None` when the record has no such field.
    pub fn get(&self, key: &str) -> Option<Value> {
        let slot = self.property(key)?.slot;
        Some(match slot {
            Slot::Data(value) => value,
            Slot::Accessor { get: Some(get), .. } => get(),
            Slot::Accessor { get: None, .. } => Value::Null,
            Slot::Reactive(field) => field.get(),
        })
    }

    /// Assign a field, the way a plain assignment would.
    ///
    /// Existing fields are written through their slot (intercepted fields
    /// notify). A missing field is added as plain, untracked data; use
    /// [`set`](crate::set) to add a field that is itself reactive.
    pub fn put(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.property(key).map(|p| p.slot) {
            Some(Slot::Data(_)) => {
                if let Some(prop) = self.inner.props.borrow_mut().get_mut(key) {
                    prop.slot = Slot::Data(value);
                }
            }
            Some(Slot::Accessor { set: Some(set), .. }) => set(value),
            Some(Slot::Accessor { set: None, .. }) => {
                tracing::debug!(key, "write to getter-only field ignored");
            }
            Some(Slot::Reactive(field)) => field.set(value),
            None if self.is_extensible() => {
                self.inner
                    .props
                    .borrow_mut()
                    .insert(key.to_string(), Property::data(value));
            }
            None => {
                tracing::debug!(key, "cannot add field to non-extensible record");
            }
        }
    }

    /// Read every enumerable field in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(&key).map(|value| (key, value)))
            .collect()
    }

    // =========================================================================
    // PROPERTY DEFINITION
    // =========================================================================

    /// Define an accessor field backed by closures.
    ///
    /// Returns `false` if an existing field is non-configurable or the
    /// record cannot grow.
    pub fn define_accessor(&self, key: &str, get: Option<Getter>, set: Option<Setter>) -> bool {
        self.define(
            key,
            Property {
                slot: Slot::Accessor { get, set },
                enumerable: true,
                configurable: true,
            },
        )
    }

    /// Define a data field that can never be redefined or deleted.
    pub fn define_fixed(&self, key: &str, value: impl Into<Value>) -> bool {
        self.define(
            key,
            Property {
                slot: Slot::Data(value.into()),
                enumerable: true,
                configurable: false,
            },
        )
    }

    /// Define a data field that is skipped by `keys` and by observation.
    pub fn define_hidden(&self, key: &str, value: impl Into<Value>) -> bool {
        self.define(
            key,
            Property {
                slot: Slot::Data(value.into()),
                enumerable: false,
                configurable: true,
            },
        )
    }

    pub(crate) fn define(&self, key: &str, property: Property) -> bool {
        let configurable = self.inner.props.borrow().get(key).map(|p| p.configurable);
        match configurable {
            Some(false) => false,
            None if !self.is_extensible() => false,
            _ => {
                // Redefinition keeps the field's position
                let previous = self
                    .inner
                    .props
                    .borrow_mut()
                    .insert(key.to_string(), property);
                drop(previous);
                true
            }
        }
    }

    pub(crate) fn property(&self, key: &str) -> Option<Property> {
        self.inner.props.borrow().get(key).cloned()
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Whether the record has its own field `key` (enumerable or not).
    pub fn has_own(&self, key: &str) -> bool {
        self.inner.props.borrow().contains_key(key)
    }

    /// Enumerable field names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .props
            .borrow()
            .iter()
            .filter(|(_, prop)| prop.enumerable)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of own fields, enumerable or not.
    pub fn len(&self) -> usize {
        self.inner.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `key` has been intercepted for dependency tracking.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(
            self.property(key).map(|p| p.slot),
            Some(Slot::Reactive(_))
        )
    }

    /// The dependency set of an intercepted field.
    pub fn field_dep(&self, key: &str) -> Option<Dep> {
        match self.property(key)?.slot {
            Slot::Reactive(field) => Some(field.dep().clone()),
            _ => None,
        }
    }

    // =========================================================================
    // REMOVAL
    // =========================================================================

    /// Delete a field. Non-configurable fields stay and return `false`.
    pub fn remove(&self, key: &str) -> bool {
        let configurable = self.inner.props.borrow().get(key).map(|p| p.configurable);
        match configurable {
            Some(false) => false,
            Some(true) => {
                // Keep the remaining fields in insertion order
                let removed = self.inner.props.borrow_mut().shift_remove(key);
                drop(removed);
                true
            }
            None => true,
        }
    }

    // =========================================================================
    // EXTENSIBILITY
    // =========================================================================

    /// Forbid adding new fields. A non-extensible record is never observed.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.get()
    }

    /// Mark this record as an opaque framework-internal instance.
    ///
    /// Internal records are never observed, and `set`/`del` warn on them.
    pub fn mark_internal(&self) {
        self.inner.internal.set(true);
    }

    pub fn is_internal(&self) -> bool {
        self.inner.internal.get()
    }

    // =========================================================================
    // OBSERVER SLOT
    // =========================================================================

    /// The observer attached to this record, if it is tracked.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        *self.inner.observer.borrow_mut() = Some(observer);
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let record = Record::new();
        {
            let mut props = record.inner.props.borrow_mut();
            for (key, value) in iter {
                props.insert(key.into(), Property::data(value.into()));
            }
        }
        record
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("keys", &self.keys())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
