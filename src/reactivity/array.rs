// ============================================================================
// spark-observe - Sequence Interception
// Mutator table installed on observed sequences
// ============================================================================
//
// Each intercepted operation runs the plain one, observes whatever it
// inserted, then notifies the sequence's container set. Positional writes
// never reach this table; `set`/`del` route them through `splice`.
// ============================================================================

use crate::collections::{CompareFn, MutatorTable, PLAIN_METHODS, Sequence};
use crate::core::value::Value;

/// Names of the operations replaced on observed sequences
pub const METHODS_TO_PATCH: [&str; 7] = [
    "push", "pop", "shift", "unshift", "splice", "sort", "reverse",
];

/// Mutators that notify the sequence's observer after every call.
pub static INTERCEPTED_METHODS: MutatorTable = MutatorTable {
    push,
    pop,
    unshift,
    shift,
    splice,
    sort,
    reverse,
};

/// Observe the inserted elements and notify the container set.
fn changed(seq: &Sequence, method: &'static str, inserted: &[Value]) {
    let Some(observer) = seq.observer() else {
        return;
    };
    if !inserted.is_empty() {
        observer.observe_array(inserted);
    }
    tracing::trace!(method, observer = %observer.id(), "sequence mutated");
    observer.dep().notify();
}

fn push(seq: &Sequence, items: Vec<Value>) -> usize {
    let inserted = items.clone();
    let len = (PLAIN_METHODS.push)(seq, items);
    changed(seq, "push", &inserted);
    len
}

fn pop(seq: &Sequence) -> Option<Value> {
    let removed = (PLAIN_METHODS.pop)(seq);
    changed(seq, "pop", &[]);
    removed
}

fn unshift(seq: &Sequence, items: Vec<Value>) -> usize {
    let inserted = items.clone();
    let len = (PLAIN_METHODS.unshift)(seq, items);
    changed(seq, "unshift", &inserted);
    len
}

fn shift(seq: &Sequence) -> Option<Value> {
    let removed = (PLAIN_METHODS.shift)(seq);
    changed(seq, "shift", &[]);
    removed
}

fn splice(seq: &Sequence, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
    let inserted = items.clone();
    let removed = (PLAIN_METHODS.splice)(seq, start, delete_count, items);
    changed(seq, "splice", &inserted);
    removed
}

fn sort(seq: &Sequence, compare: Option<CompareFn<'_>>) {
    (PLAIN_METHODS.sort)(seq, compare);
    changed(seq, "sort", &[]);
}

fn reverse(seq: &Sequence) {
    (PLAIN_METHODS.reverse)(seq);
    changed(seq, "reverse", &[]);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Record;
    use crate::core::context::with_subscriber;
    use crate::core::error::Result;
    use crate::core::types::Subscriber;
    use crate::reactivity::observer::observe;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counter {
        runs: Cell<usize>,
    }

    impl Subscriber for Counter {
        fn update(&self) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            Ok(())
        }
    }

    fn observed(items: Vec<Value>) -> (Sequence, Rc<Counter>) {
        let seq = Sequence::from_vec(items);
        let observer = observe(&seq.clone().into(), false).expect("observed");
        let counter = Rc::new(Counter { runs: Cell::new(0) });
        let sub: Rc<dyn Subscriber> = counter.clone();
        with_subscriber(Some(sub), || observer.dep().depend());
        (seq, counter)
    }

    #[test]
    fn every_mutator_notifies_once() {
        let (seq, counter) = observed(vec![Value::from(3), Value::from(1), Value::from(2)]);

        seq.push(4);
        seq.pop();
        seq.unshift(0);
        seq.shift();
        seq.splice(0, 1, vec![]);
        seq.sort();
        seq.reverse();

        assert_eq!(counter.runs.get(), METHODS_TO_PATCH.len());
    }

    #[test]
    fn results_match_plain_operations() {
        let (seq, _) = observed(vec![Value::from(1), Value::from(2)]);
        assert_eq!(seq.push(3), 3);
        assert_eq!(seq.pop(), Some(Value::from(3)));
        assert_eq!(seq.unshift_all(vec![Value::from(-1), Value::from(0)]), 4);
        assert_eq!(seq.shift(), Some(Value::from(-1)));
        assert_eq!(seq.splice(1, 1, vec![Value::from(9)]), vec![Value::from(1)]);
        assert_eq!(seq.to_vec(), vec![Value::from(0), Value::from(9), Value::from(2)]);
    }

    #[test]
    fn inserted_elements_are_observed() {
        let (seq, _) = observed(vec![]);
        let pushed = Record::new();
        let unshifted = Record::new();
        let spliced = Record::new();

        seq.push(pushed.clone());
        seq.unshift(unshifted.clone());
        seq.splice(1, 0, vec![spliced.clone().into()]);

        assert!(pushed.observer().is_some());
        assert!(unshifted.observer().is_some());
        assert!(spliced.observer().is_some());
    }

    #[test]
    fn positional_writes_bypass_interception() {
        let (seq, counter) = observed(vec![Value::from(1)]);
        let late = Record::new();
        seq.set_index(0, late.clone());
        seq.set_len(5);
        assert_eq!(counter.runs.get(), 0);
        assert!(late.observer().is_none());
    }

    #[test]
    fn empty_pop_still_notifies() {
        let (seq, counter) = observed(vec![]);
        assert_eq!(seq.pop(), None);
        assert_eq!(counter.runs.get(), 1);
    }
}
