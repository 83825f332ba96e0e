// ============================================================================
// spark-observe - Reactivity Module
// Dependency sets, field interception, container observers, set/del
// ============================================================================

pub mod array;
pub mod define;
pub mod dep;
pub mod equality;
pub mod mutation;
pub mod observer;

pub use array::{INTERCEPTED_METHODS, METHODS_TO_PATCH};
pub use define::{define_reactive, InvalidationHook};
pub use dep::{Dep, NotifyReport};
pub use equality::same_value;
pub use mutation::{del, set};
pub use observer::{depend_array, observe, Observer};
