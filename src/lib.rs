// ============================================================================
// spark-observe - Dependency Tracking for Mutable Data Graphs
// ============================================================================
//
// Records and sequences are made observable in place: every field read by a
// running subscriber is remembered, and every write notifies exactly the
// subscribers that read it. Renderers and computed values sit on top as
// `Subscriber` implementations; `Watcher` is the bundled one.
// ============================================================================

#[macro_use]
mod macros;

pub mod collections;
pub mod core;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root
pub use core::context::{
    current_subscriber, is_tracking, pop_subscriber, push_subscriber, should_observe,
    stack_depth, toggle_observing, untracked, with_context, with_subscriber, SubscriberContext,
    SubscriberGuard,
};
pub use core::error::{ObserveError, Result};
pub use core::types::{DepId, ObserverId, Subscriber};
pub use core::value::{Key, Value};

// Re-export collections
pub use collections::{CompareFn, Getter, MutatorTable, Record, Sequence, Setter, PLAIN_METHODS};

// Re-export the tracking core
pub use reactivity::{
    define_reactive, del, depend_array, observe, same_value, set, Dep, InvalidationHook,
    NotifyReport, Observer, INTERCEPTED_METHODS, METHODS_TO_PATCH,
};
pub use reactivity::equality::{safe_equals_f64, safe_not_equal_f64};

// Re-export primitives
pub use primitives::{watch, Watcher};

// =============================================================================
// TESTS
// =============================================================================
