// ============================================================================
// spark-observe - Watcher
// A subscriber that re-runs a getter whenever anything it read changes
// ============================================================================
//
// Each run pushes the watcher as the active subscriber, evaluates the getter,
// then reconciles dependencies: sets read this run are kept, sets read only
// by the previous run drop the watcher. A set read several times in one run
// is recorded once.
//
// Watchers run synchronously inside `notify`. There is no scheduler, so a
// write performed by the getter itself cannot loop: the nested update is
// recorded as dirty instead of re-entering the run.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::core::context::push_subscriber;
use crate::core::error::Result;
use crate::core::types::Subscriber;
use crate::reactivity::dep::Dep;

type GetterFn<T> = Rc<dyn Fn() -> Result<T>>;

// =============================================================================
// WATCHER INNER
// =============================================================================

struct WatcherInner<T> {
    /// The tracked computation (None after teardown)
    getter: RefCell<Option<GetterFn<T>>>,

    /// Result of the last successful run
    value: RefCell<Option<T>>,

    /// Sets read during the last completed run
    deps: RefCell<Vec<Dep>>,

    /// Sets read during the run in progress
    new_deps: RefCell<Vec<Dep>>,

    lazy: bool,
    dirty: Cell<bool>,
    active: Cell<bool>,
    running: Cell<bool>,
    runs: Cell<usize>,

    /// Handle used to register this watcher as a subscriber
    self_ref: Weak<WatcherInner<T>>,
}

/// Clears the running flag even if the getter unwinds.
struct RunningGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> RunningGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Reconciles dependencies when a run ends, including by unwinding.
struct CleanupGuard<'a, T: 'static> {
    watcher: &'a WatcherInner<T>,
}

impl<T: 'static> Drop for CleanupGuard<'_, T> {
    fn drop(&mut self) {
        self.watcher.cleanup_deps();
    }
}

impl<T: 'static> WatcherInner<T> {
    fn new(getter: GetterFn<T>, lazy: bool) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            getter: RefCell::new(Some(getter)),
            value: RefCell::new(None),
            deps: RefCell::new(Vec::new()),
            new_deps: RefCell::new(Vec::new()),
            lazy,
            dirty: Cell::new(lazy),
            active: Cell::new(true),
            running: Cell::new(false),
            runs: Cell::new(0),
            self_ref: me.clone(),
        })
    }

    fn as_subscriber(&self) -> Option<Rc<dyn Subscriber>> {
        let me: Rc<dyn Subscriber> = self.self_ref.upgrade()?;
        Some(me)
    }

    /// Evaluate the getter with this watcher active, then reconcile deps.
    fn run(&self) -> Result<()> {
        let getter = self.getter.borrow().clone();
        let (Some(getter), Some(me)) = (getter, self.as_subscriber()) else {
            return Ok(());
        };

        self.dirty.set(false);
        self.new_deps.borrow_mut().clear();
        let result = {
            // Dropped in reverse: pop the subscriber, clear running, reconcile
            let _cleanup = CleanupGuard { watcher: self };
            let _running = RunningGuard::enter(&self.running);
            let _active = push_subscriber(Some(me));
            getter()
        };
        self.runs.set(self.runs.get() + 1);

        let value = result?;
        *self.value.borrow_mut() = Some(value);
        Ok(())
    }

    /// Drop this watcher from sets the last run no longer read.
    fn cleanup_deps(&self) {
        let new_deps = std::mem::take(&mut *self.new_deps.borrow_mut());
        let old_deps = std::mem::replace(&mut *self.deps.borrow_mut(), new_deps);

        if let Some(me) = self.as_subscriber() {
            let current = self.deps.borrow();
            for dep in old_deps {
                if !current.iter().any(|d| d.ptr_eq(&dep)) {
                    dep.remove_sub(&me);
                }
            }
        }
    }

    fn teardown(&self) {
        if !self.active.replace(false) {
            return;
        }
        let deps = std::mem::take(&mut *self.deps.borrow_mut());
        if let Some(me) = self.as_subscriber() {
            for dep in &deps {
                dep.remove_sub(&me);
            }
        }
        // Release captured state
        let _getter = self.getter.borrow_mut().take();
        tracing::trace!(deps = deps.len(), "watcher torn down");
    }
}

impl<T: 'static> Subscriber for WatcherInner<T> {
    fn update(&self) -> Result<()> {
        if !self.active.get() {
            return Ok(());
        }
        if self.lazy {
            self.dirty.set(true);
            return Ok(());
        }
        if self.running.get() {
            tracing::debug!("watcher notified during its own run, marked dirty");
            self.dirty.set(true);
            return Ok(());
        }
        self.run()
    }

    fn add_dep(&self, dep: &Dep) {
        let mut new_deps = self.new_deps.borrow_mut();
        if !new_deps.iter().any(|d| d.id() == dep.id()) {
            new_deps.push(dep.clone());
        }
    }
}

// =============================================================================
// WATCHER<T> WRAPPER
// =============================================================================

/// A tracked computation that re-runs when its dependencies change.
///
/// # Example
///
/// ```
/// use spark_observe::{observe, record, Value, Watcher};
///
/// let state = record! { "count" => 1 };
/// observe(&Value::from(state.clone()), true);
///
/// let reader = state.clone();
/// let doubled = Watcher::new(move || {
///     reader.get("count").and_then(|v| v.as_number()).unwrap_or(0.0) * 2.0
/// });
/// assert_eq!(doubled.value(), Some(2.0));
///
/// state.put("count", 5);
/// assert_eq!(doubled.value(), Some(10.0));
/// ```
#[derive(Clone)]
pub struct Watcher<T> {
    inner: Rc<WatcherInner<T>>,
}

impl<T: Clone + 'static> Watcher<T> {
    /// Create a watcher and evaluate it immediately.
    pub fn new(getter: impl Fn() -> T + 'static) -> Self {
        let watcher = Self {
            inner: WatcherInner::new(Rc::new(move || Ok(getter())), false),
        };
        if let Err(err) = watcher.inner.run() {
            tracing::error!(error = %err, "watcher initial run failed");
        }
        watcher
    }

    /// Create a watcher from a fallible getter, failing if the first run fails.
    pub fn try_new(getter: impl Fn() -> Result<T> + 'static) -> Result<Self> {
        let watcher = Self {
            inner: WatcherInner::new(Rc::new(getter), false),
        };
        watcher.inner.run()?;
        Ok(watcher)
    }

    /// Create a watcher that only evaluates on [`evaluate`](Self::evaluate).
    ///
    /// Notifications mark it dirty instead of re-running it.
    pub fn lazy(getter: impl Fn() -> T + 'static) -> Self {
        Self {
            inner: WatcherInner::new(Rc::new(move || Ok(getter())), true),
        }
    }

    /// Re-run the getter now.
    pub fn get(&self) -> Result<()> {
        self.inner.run()
    }

    /// Handle a notification: re-run, or mark dirty if lazy or mid-run.
    pub fn update(&self) -> Result<()> {
        self.inner.update()
    }

    /// Run a lazy watcher if it is dirty and return its value.
    pub fn evaluate(&self) -> Result<Option<T>> {
        if self.inner.dirty.get() {
            self.inner.run()?;
        }
        Ok(self.value())
    }

    /// Make the active subscriber depend on everything this watcher read.
    pub fn depend(&self) {
        let deps = self.inner.deps.borrow().clone();
        for dep in &deps {
            dep.depend();
        }
    }

    /// Leave every dependency set and stop reacting.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn value(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    pub fn run_count(&self) -> usize {
        self.inner.runs.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of distinct sets read by the last run
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// This watcher as a type-erased subscriber
    pub fn as_subscriber(&self) -> Rc<dyn Subscriber> {
        self.inner.clone()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a watcher that runs `getter` now and after every relevant change.
pub fn watch<T, F>(getter: F) -> Watcher<T>
where
    T: Clone + 'static,
    F: Fn() -> T + 'static,
{
    Watcher::new(getter)
}

// =============================================================================
// TESTS
// =============================================================================
