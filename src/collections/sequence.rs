// ============================================================================
// spark-observe - Sequence
// An ordered list of values whose mutating operations dispatch per instance
// ============================================================================
//
// The seven in-place mutators (push, pop, unshift, shift, splice, sort,
// reverse) are called through a table of function pointers stored on each
// sequence. A fresh sequence uses `PLAIN_METHODS`; observing it swaps in the
// intercepted table, which wraps the plain operations with notification.
// Positional writes and length changes never go through the table.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::TryReserveError;
use std::fmt;
use std::rc::Rc;

use crate::core::value::Value;
use crate::reactivity::observer::Observer;

// =============================================================================
// MUTATOR TABLE
// =============================================================================

/// Comparison callback accepted by `sort_by`
pub type CompareFn<'a> = &'a dyn Fn(&Value, &Value) -> Ordering;

/// The in-place mutating operations of a sequence.
pub struct MutatorTable {
    pub push: fn(&Sequence, Vec<Value>) -> usize,
    pub pop: fn(&Sequence) -> Option<Value>,
    pub unshift: fn(&Sequence, Vec<Value>) -> usize,
    pub shift: fn(&Sequence) -> Option<Value>,
    pub splice: fn(&Sequence, usize, usize, Vec<Value>) -> Vec<Value>,
    pub sort: fn(&Sequence, Option<CompareFn<'_>>),
    pub reverse: fn(&Sequence),
}

/// Untracked implementations, used until a sequence is observed.
pub static PLAIN_METHODS: MutatorTable = MutatorTable {
    push: plain_push,
    pop: plain_pop,
    unshift: plain_unshift,
    shift: plain_shift,
    splice: plain_splice,
    sort: plain_sort,
    reverse: plain_reverse,
};

fn plain_push(seq: &Sequence, items: Vec<Value>) -> usize {
    let mut data = seq.inner.items.borrow_mut();
    data.extend(items);
    data.len()
}

fn plain_pop(seq: &Sequence) -> Option<Value> {
    seq.inner.items.borrow_mut().pop()
}

fn plain_unshift(seq: &Sequence, items: Vec<Value>) -> usize {
    let mut data = seq.inner.items.borrow_mut();
    data.splice(0..0, items).for_each(drop);
    data.len()
}

fn plain_shift(seq: &Sequence) -> Option<Value> {
    let mut data = seq.inner.items.borrow_mut();
    if data.is_empty() {
        None
    } else {
        Some(data.remove(0))
    }
}

fn plain_splice(seq: &Sequence, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
    let mut data = seq.inner.items.borrow_mut();
    let start = start.min(data.len());
    let end = start.saturating_add(delete_count).min(data.len());
    data.splice(start..end, items).collect()
}

fn plain_sort(seq: &Sequence, compare: Option<CompareFn<'_>>) {
    // Sort a snapshot: a comparator may read the sequence, and a panicking
    // comparator leaves it untouched
    let mut data = seq.to_vec();
    match compare {
        Some(compare) => data.sort_by(|a, b| compare(a, b)),
        None => data.sort_by_cached_key(|v| v.to_string()),
    }
    *seq.inner.items.borrow_mut() = data;
}

fn plain_reverse(seq: &Sequence) {
    seq.inner.items.borrow_mut().reverse();
}

/// Truncate or pad `data` to `len`, reserving first so a huge length fails.
fn resize_items(data: &mut Vec<Value>, len: usize) -> Result<(), TryReserveError> {
    if let Some(extra) = len.checked_sub(data.len()) {
        data.try_reserve_exact(extra)?;
    }
    data.resize(len, Value::Null);
    Ok(())
}

// =============================================================================
// SEQUENCE
// =============================================================================

/// A shared, mutable, ordered list of values.
///
/// Positional reads (`get`) and writes (`set_index`) are not interceptable;
/// only the mutating operations notify once the sequence is observed.
///
/// # Example
///
/// ```
/// use spark_observe::{Sequence, Value};
///
/// let list = Sequence::new();
/// list.push(1);
/// list.push(2);
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.pop(), Some(Value::from(2)));
/// ```
#[derive(Clone, Default)]
pub struct Sequence {
    inner: Rc<SequenceInner>,
}

struct SequenceInner {
    items: RefCell<Vec<Value>>,
    methods: Cell<&'static MutatorTable>,
    extensible: Cell<bool>,
    observer: RefCell<Option<Rc<Observer>>>,
}

impl Default for SequenceInner {
    fn default() -> Self {
        Self {
            items: RefCell::new(Vec::new()),
            methods: Cell::new(&PLAIN_METHODS),
            extensible: Cell::new(true),
            observer: RefCell::new(None),
        }
    }
}

impl Sequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequence owning `items`.
    pub fn from_vec(items: Vec<Value>) -> Self {
        let seq = Self::new();
        *seq.inner.items.borrow_mut() = items;
        seq
    }

    /// Whether two handles point at the same sequence.
    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // POSITIONAL ACCESS (never tracked)
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Overwrite the element at `index`, padding with `Null` if needed.
    ///
    /// This bypasses interception: nobody is notified and the new element
    /// is not observed. Use [`set`](crate::set) for a reactive write. An
    /// index the sequence cannot grow to is ignored with a warning.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) {
        let mut data = self.inner.items.borrow_mut();
        if index >= data.len() {
            let grown = index
                .checked_add(1)
                .map(|len| resize_items(&mut data, len).is_ok());
            if grown != Some(true) {
                tracing::warn!(index, "sequence cannot grow to index, write ignored");
                return;
            }
        }
        data[index] = value.into();
    }

    /// Truncate or pad with `Null` to exactly `len` elements. Not tracked.
    ///
    /// A length that cannot be allocated leaves the sequence unchanged.
    pub fn set_len(&self, len: usize) {
        if let Err(err) = self.try_set_len(len) {
            tracing::warn!(len, error = %err, "sequence resize refused");
        }
    }

    /// Like [`set_len`](Self::set_len), reporting allocation failure.
    pub fn try_set_len(&self, len: usize) -> Result<(), TryReserveError> {
        resize_items(&mut self.inner.items.borrow_mut(), len)
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    // =========================================================================
    // MUTATING OPERATIONS (dispatched through the mutator table)
    // =========================================================================

    fn methods(&self) -> &'static MutatorTable {
        self.inner.methods.get()
    }

    /// Append one element, returning the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        (self.methods().push)(self, vec![value.into()])
    }

    /// Append several elements, returning the new length.
    pub fn push_all(&self, items: Vec<Value>) -> usize {
        (self.methods().push)(self, items)
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        (self.methods().pop)(self)
    }

    /// Prepend one element, returning the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        (self.methods().unshift)(self, vec![value.into()])
    }

    /// Prepend several elements (kept in the given order).
    pub fn unshift_all(&self, items: Vec<Value>) -> usize {
        (self.methods().unshift)(self, items)
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        (self.methods().shift)(self)
    }

    /// Replace `delete_count` elements at `start` with `items`, returning
    /// the removed elements. Out-of-range bounds are clamped.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        (self.methods().splice)(self, start, delete_count, items)
    }

    /// Sort by each element's string form.
    pub fn sort(&self) {
        (self.methods().sort)(self, None)
    }

    /// Sort with a comparator.
    pub fn sort_by(&self, compare: impl Fn(&Value, &Value) -> Ordering) {
        let compare: CompareFn<'_> = &compare;
        (self.methods().sort)(self, Some(compare))
    }

    /// Reverse the elements in place.
    pub fn reverse(&self) {
        (self.methods().reverse)(self)
    }

    /// Whether the mutators have been swapped for intercepted ones.
    pub fn is_intercepted(&self) -> bool {
        !std::ptr::eq(self.methods(), &PLAIN_METHODS)
    }

    pub(crate) fn install_methods(&self, methods: &'static MutatorTable) {
        self.inner.methods.set(methods);
    }

    // =========================================================================
    // EXTENSIBILITY / OBSERVER SLOT
    // =========================================================================

    /// Forbid observation of this sequence.
    pub fn prevent_extensions(&self) {
        self.inner.extensible.set(false);
    }

    pub fn is_extensible(&self) -> bool {
        self.inner.extensible.get()
    }

    /// The observer attached to this sequence, if it is tracked.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.inner.observer.borrow().clone()
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) {
        *self.inner.observer.borrow_mut() = Some(observer);
    }
}

impl<V: Into<Value>> FromIterator<V> for Sequence {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("len", &self.len())
            .field("observed", &self.observer().is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
