// ============================================================================
// spark-observe - Type Definitions
// The subscriber trait and the identifiers used by the dependency graph
// ============================================================================

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use super::error::Result;
use crate::reactivity::dep::Dep;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identity of a dependency set, unique within one thread's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(pub(crate) u64);

impl DepId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

/// Identity of an observer, unique within one thread's context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

impl ObserverId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ob#{}", self.0)
    }
}

// =============================================================================
// SUBSCRIBER
// =============================================================================
//
// A subscriber is the external computation (a render, a watcher, a test
// probe) that reads tracked data while it is the active subscriber and is
// later asked to re-run. Dependency sets hold subscribers weakly, so a
// dropped subscriber silently falls out of every set it joined.
// =============================================================================

/// A computation that can be registered as the active subscriber and
/// notified when data it read changes.
pub trait Subscriber: Any {
    /// Re-run (or mark stale). Called once per notify pass.
    fn update(&self) -> Result<()>;

    /// Record that this subscriber now depends on `dep`.
    ///
    /// Called by [`Dep::depend`] after the set has already added the
    /// subscriber. Subscribers that rebuild their dependency list between
    /// runs use this to later remove themselves from stale sets.
    fn add_dep(&self, _dep: &Dep) {}
}

/// Address of a subscriber allocation, used for identity comparisons.
///
/// The vtable half of the fat pointer is discarded so two handles to the
/// same allocation always compare equal.
pub(crate) fn subscriber_addr(sub: &Rc<dyn Subscriber>) -> *const () {
    Rc::as_ptr(sub) as *const ()
}

/// Address of a weakly held subscriber allocation.
pub(crate) fn weak_subscriber_addr(sub: &Weak<dyn Subscriber>) -> *const () {
    Weak::as_ptr(sub) as *const ()
}
