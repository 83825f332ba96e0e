// ============================================================================
// spark-observe - Subscriber Context
// Thread-local state tracking which subscriber is currently evaluating
// ============================================================================

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use super::types::{DepId, ObserverId, Subscriber};

// =============================================================================
// SUBSCRIBER CONTEXT
// =============================================================================

/// Thread-local context holding the active subscriber and its nesting stack.
///
/// Every thread gets its own instance, so independent renderers (or tests
/// running in parallel) never see each other's active subscriber.
pub struct SubscriberContext {
    // =========================================================================
    // ACTIVE SUBSCRIBER
    // =========================================================================
    /// Subscriber whose evaluation is currently collecting dependencies
    current: RefCell<Option<Rc<dyn Subscriber>>>,

    /// Saved outer subscribers, innermost last
    stack: RefCell<Vec<Option<Rc<dyn Subscriber>>>>,

    // =========================================================================
    // CONFIGURATION
    // =========================================================================
    /// Whether `observe` may attach new observers
    observing: Cell<bool>,

    // =========================================================================
    // ID COUNTERS
    // =========================================================================
    next_dep_id: Cell<u64>,
    next_observer_id: Cell<u64>,
}

impl SubscriberContext {
    /// Create a fresh context with no active subscriber
    pub fn new() -> Self {
        Self {
            current: RefCell::new(None),
            stack: RefCell::new(Vec::new()),
            observing: Cell::new(true),
            next_dep_id: Cell::new(0),
            next_observer_id: Cell::new(0),
        }
    }

    // =========================================================================
    // PUSH / POP
    // =========================================================================

    /// Install `subscriber` as current, saving the previous one on the stack.
    pub fn push(&self, subscriber: Option<Rc<dyn Subscriber>>) {
        let previous = self.current.replace(subscriber);
        self.stack.borrow_mut().push(previous);
    }

    /// Restore the subscriber saved by the matching `push`.
    ///
    /// Popping an empty stack leaves no active subscriber.
    pub fn pop(&self) {
        let previous = self.stack.borrow_mut().pop().flatten();
        // Drop the outgoing handle after the borrow is released
        let _outgoing = self.current.replace(previous);
    }

    /// The active subscriber, if any
    pub fn current(&self) -> Option<Rc<dyn Subscriber>> {
        self.current.borrow().clone()
    }

    /// Whether a subscriber is collecting dependencies
    pub fn has_current(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Number of saved outer subscribers
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    // =========================================================================
    // OBSERVING TOGGLE
    // =========================================================================

    /// Enable or disable creation of new observers, returning the previous value
    pub fn set_observing(&self, value: bool) -> bool {
        self.observing.replace(value)
    }

    pub fn is_observing(&self) -> bool {
        self.observing.get()
    }

    // =========================================================================
    // ID COUNTERS
    // =========================================================================

    pub(crate) fn next_dep_id(&self) -> DepId {
        let id = self.next_dep_id.get();
        self.next_dep_id.set(id + 1);
        DepId(id)
    }

    pub(crate) fn next_observer_id(&self) -> ObserverId {
        let id = self.next_observer_id.get();
        self.next_observer_id.set(id + 1);
        ObserverId(id)
    }
}

impl Default for SubscriberContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local subscriber context
    static CONTEXT: SubscriberContext = SubscriberContext::new();
}

/// Access the thread-local subscriber context.
///
/// # Example
///
/// ```
/// use spark_observe::with_context;
///
/// let depth = with_context(|ctx| ctx.depth());
/// assert_eq!(depth, 0);
/// ```
pub fn with_context<R>(f: impl FnOnce(&SubscriberContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// SCOPED PUSH / POP
// =============================================================================

/// Guard returned by [`push_subscriber`]; pops the subscriber when dropped.
///
/// Dropping runs on early return and during unwinding, so a subscriber that
/// fails halfway through its evaluation never leaks into the next read.
#[must_use = "the subscriber is popped as soon as the guard is dropped"]
pub struct SubscriberGuard {
    // Tied to the thread that pushed
    _not_send: PhantomData<Rc<()>>,
}

impl SubscriberGuard {
    /// Pop now instead of at end of scope.
    pub fn pop(self) {
        drop(self);
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        // AccessError only means the thread-local is already destroyed
        // (thread teardown); there is no stack left to pop
        let _ = CONTEXT.try_with(|ctx| ctx.pop());
    }
}

/// Make `subscriber` (or nobody) the active subscriber until the guard drops.
///
/// # Example
///
/// ```
/// use spark_observe::{is_tracking, push_subscriber};
///
/// let guard = push_subscriber(None);
/// assert!(!is_tracking());
/// guard.pop();
/// ```
pub fn push_subscriber(subscriber: Option<Rc<dyn Subscriber>>) -> SubscriberGuard {
    with_context(|ctx| ctx.push(subscriber));
    SubscriberGuard {
        _not_send: PhantomData,
    }
}

/// Pop the active subscriber without a guard.
///
/// Only for evaluators that `std::mem::forget` their guard and pair the
/// calls by hand; everything else should let the guard drop.
pub fn pop_subscriber() {
    with_context(|ctx| ctx.pop());
}

/// Run `f` with `subscriber` active, restoring the previous one afterwards.
pub fn with_subscriber<R>(subscriber: Option<Rc<dyn Subscriber>>, f: impl FnOnce() -> R) -> R {
    let _guard = push_subscriber(subscriber);
    f()
}

/// Run `f` with no active subscriber, so reads inside create no edges.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    with_subscriber(None, f)
}

// =============================================================================
// CONVENIENCE FUNCTIONS
// =============================================================================

/// The subscriber currently collecting dependencies
pub fn current_subscriber() -> Option<Rc<dyn Subscriber>> {
    with_context(|ctx| ctx.current())
}

/// Check if a subscriber is currently collecting dependencies
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.has_current())
}

/// Number of saved subscribers below the current one
pub fn stack_depth() -> usize {
    with_context(|ctx| ctx.depth())
}

/// Enable or disable creation of new observers, returning the previous value.
///
/// Prop resolution flips this on around `observe` for freshly built default
/// values and restores the previous setting afterwards.
pub fn toggle_observing(value: bool) -> bool {
    with_context(|ctx| ctx.set_observing(value))
}

/// Whether `observe` may currently attach new observers
pub fn should_observe() -> bool {
    with_context(|ctx| ctx.is_observing())
}

// =============================================================================
// TESTS
// =============================================================================
