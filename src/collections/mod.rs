// ============================================================================
// spark-observe - Collections
// The records and sequences that make up a tracked data graph
// ============================================================================
//
// Both are shared handles with interior mutability. A record stores its
// fields as explicit property slots (plain data, accessor, or intercepted);
// a sequence dispatches its in-place mutators through a per-instance table
// that observation swaps for the intercepted one.
// ============================================================================

mod record;
mod sequence;

pub use record::{Getter, Record, Setter};
pub(crate) use record::{Property, Slot};
pub use sequence::{CompareFn, MutatorTable, PLAIN_METHODS, Sequence};
