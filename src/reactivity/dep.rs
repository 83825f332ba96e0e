// ============================================================================
// spark-observe - Dependency Set
// The per-field (or per-container) set of subscribers interested in a change
// ============================================================================
//
// Subscribers are held weakly: a dependency set never keeps a computation
// alive, and dropped subscribers are pruned on the next notify.
//
// notify() copies the live subscribers out of the set before calling any of
// them. An update may re-read the very field being notified (adding to this
// set) or drop an old dependency (removing from it); neither may disturb the
// pass in progress.
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use crate::core::context::{current_subscriber, with_context};
use crate::core::error::ObserveError;
use crate::core::types::{subscriber_addr, weak_subscriber_addr, DepId, Subscriber};

// =============================================================================
// NOTIFY REPORT
// =============================================================================

/// Outcome of one notify pass.
#[derive(Debug, Default)]
pub struct NotifyReport {
    /// Subscribers whose `update()` was invoked
    pub notified: usize,

    /// Failures, one per failing subscriber, in notification order
    pub failures: Vec<ObserveError>,
}

impl NotifyReport {
    /// True when every subscriber updated without error.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// DEP
// =============================================================================

/// A dependency set: the subscribers that read one field or container.
///
/// Cloning a `Dep` clones the handle; both clones are the same set.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<Weak<dyn Subscriber>>>,
}

impl Dep {
    /// Create an empty set with a fresh id.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: with_context(|ctx| ctx.next_dep_id()),
                subs: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Whether two handles point at the same set.
    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // MEMBERSHIP
    // =========================================================================

    /// Add a subscriber. Adding one that is already present does nothing.
    pub fn add_sub(&self, subscriber: &Rc<dyn Subscriber>) {
        if self.contains(subscriber) {
            return;
        }
        self.inner.subs.borrow_mut().push(Rc::downgrade(subscriber));
    }

    /// Remove a subscriber by identity. Absent subscribers are ignored.
    pub fn remove_sub(&self, subscriber: &Rc<dyn Subscriber>) {
        let target = subscriber_addr(subscriber);
        self.inner
            .subs
            .borrow_mut()
            .retain(|weak| weak.strong_count() > 0 && weak_subscriber_addr(weak) != target);
    }

    /// Whether `subscriber` is a live member of this set.
    pub fn contains(&self, subscriber: &Rc<dyn Subscriber>) -> bool {
        let target = subscriber_addr(subscriber);
        self.inner
            .subs
            .borrow()
            .iter()
            .any(|weak| weak.strong_count() > 0 && weak_subscriber_addr(weak) == target)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    // =========================================================================
    // DEPEND / NOTIFY
    // =========================================================================

    /// Register the active subscriber, if any, as depending on this set.
    ///
    /// The edge is recorded on both sides: the set keeps the subscriber and
    /// the subscriber is told about the set through [`Subscriber::add_dep`].
    pub fn depend(&self) {
        if let Some(subscriber) = current_subscriber() {
            self.add_sub(&subscriber);
            subscriber.add_dep(self);
        }
    }

    /// Tell every current subscriber that the tracked state changed.
    ///
    /// Each subscriber is isolated: an `Err` or a panic from one update is
    /// logged and reported, and the remaining subscribers still run.
    pub fn notify(&self) -> NotifyReport {
        // Snapshot under a short borrow, pruning dropped subscribers
        let snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subs = self.inner.subs.borrow_mut();
            subs.retain(|weak| weak.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };

        tracing::trace!(dep = %self.id(), subscribers = snapshot.len(), "notify");

        let mut report = NotifyReport::default();
        for subscriber in snapshot {
            report.notified += 1;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.update()));
            let result = outcome.unwrap_or_else(|payload| Err(ObserveError::from_panic(payload)));
            if let Err(err) = result {
                tracing::error!(dep = %self.id(), error = %err, "subscriber update failed");
                report.failures.push(err);
            }
        }
        report
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::with_subscriber;
    use crate::core::error::Result;
    use std::cell::Cell;

    /// Counts updates and records the sets it was told about
    struct Probe {
        runs: Cell<usize>,
        deps: RefCell<Vec<DepId>>,
    }

    impl Probe {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                runs: Cell::new(0),
                deps: RefCell::new(Vec::new()),
            })
        }
    }

    impl Subscriber for Probe {
        fn update(&self) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            Ok(())
        }

        fn add_dep(&self, dep: &Dep) {
            self.deps.borrow_mut().push(dep.id());
        }
    }

    fn as_sub(probe: &Rc<Probe>) -> Rc<dyn Subscriber> {
        probe.clone()
    }

    #[test]
    fn add_is_idempotent_by_identity() {
        let dep = Dep::new();
        let probe = Probe::new();
        dep.add_sub(&as_sub(&probe));
        dep.add_sub(&as_sub(&probe));
        assert_eq!(dep.subscriber_count(), 1);

        dep.notify();
        assert_eq!(probe.runs.get(), 1);
    }

    #[test]
    fn remove_by_identity() {
        let dep = Dep::new();
        let a = Probe::new();
        let b = Probe::new();
        dep.add_sub(&as_sub(&a));
        dep.add_sub(&as_sub(&b));

        dep.remove_sub(&as_sub(&a));
        dep.remove_sub(&as_sub(&a));
        assert!(!dep.contains(&as_sub(&a)));
        assert!(dep.contains(&as_sub(&b)));

        dep.notify();
        assert_eq!(a.runs.get(), 0);
        assert_eq!(b.runs.get(), 1);
    }

    #[test]
    fn depend_without_active_subscriber_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_records_edge_on_both_sides() {
        let dep = Dep::new();
        let probe = Probe::new();
        with_subscriber(Some(as_sub(&probe)), || dep.depend());

        assert!(dep.contains(&as_sub(&probe)));
        assert_eq!(*probe.deps.borrow(), vec![dep.id()]);
    }

    #[test]
    fn dropped_subscribers_fall_out() {
        let dep = Dep::new();
        {
            let probe = Probe::new();
            dep.add_sub(&as_sub(&probe));
            assert_eq!(dep.subscriber_count(), 1);
        }
        assert_eq!(dep.subscriber_count(), 0);
        assert_eq!(dep.notify().notified, 0);
    }

    /// Removes itself and adds a newcomer while being notified
    struct Churner {
        dep: Dep,
        me: RefCell<Option<Rc<dyn Subscriber>>>,
        newcomer: Rc<dyn Subscriber>,
        runs: Cell<usize>,
    }

    impl Subscriber for Churner {
        fn update(&self) -> Result<()> {
            self.runs.set(self.runs.get() + 1);
            if let Some(me) = self.me.borrow_mut().take() {
                self.dep.remove_sub(&me);
            }
            self.dep.add_sub(&self.newcomer);
            Ok(())
        }
    }

    #[test]
    fn notify_iterates_a_snapshot() {
        let dep = Dep::new();
        let tail = Probe::new();
        let newcomer = Probe::new();
        let churner = Rc::new(Churner {
            dep: dep.clone(),
            me: RefCell::new(None),
            newcomer: as_sub(&newcomer),
            runs: Cell::new(0),
        });
        let churner_sub: Rc<dyn Subscriber> = churner.clone();
        *churner.me.borrow_mut() = Some(churner_sub.clone());

        dep.add_sub(&churner_sub);
        dep.add_sub(&as_sub(&tail));

        let report = dep.notify();
        assert_eq!(report.notified, 2);
        assert_eq!(churner.runs.get(), 1);
        // The subscriber after the churner still ran
        assert_eq!(tail.runs.get(), 1);
        // The newcomer joined for the next pass, not this one
        assert_eq!(newcomer.runs.get(), 0);

        dep.notify();
        assert_eq!(churner.runs.get(), 1);
        assert_eq!(newcomer.runs.get(), 1);
    }

    struct Failing;

    impl Subscriber for Failing {
        fn update(&self) -> Result<()> {
            Err(ObserveError::update_failed("render failed"))
        }
    }

    struct Panicking;

    impl Subscriber for Panicking {
        fn update(&self) -> Result<()> {
            panic!("render exploded");
        }
    }

    #[test]
    fn failures_are_isolated_per_subscriber() {
        let dep = Dep::new();
        let before = Probe::new();
        let after = Probe::new();
        let failing: Rc<dyn Subscriber> = Rc::new(Failing);
        let panicking: Rc<dyn Subscriber> = Rc::new(Panicking);

        dep.add_sub(&as_sub(&before));
        dep.add_sub(&failing);
        dep.add_sub(&panicking);
        dep.add_sub(&as_sub(&after));

        let report = dep.notify();
        assert_eq!(report.notified, 4);
        assert!(!report.is_clean());
        assert_eq!(
            report.failures,
            vec![
                ObserveError::update_failed("render failed"),
                ObserveError::UpdatePanicked {
                    message: "render exploded".into()
                },
            ]
        );
        assert_eq!(before.runs.get(), 1);
        assert_eq!(after.runs.get(), 1);
    }

    #[test]
    fn ids_are_distinct() {
        let a = Dep::new();
        let b = Dep::new();
        assert_ne!(a.id(), b.id());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }
}
