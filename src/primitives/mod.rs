// ============================================================================
// spark-observe - Primitives Module
// Subscribers built on top of the tracking core
// ============================================================================

pub mod watcher;

pub use watcher::{watch, Watcher};
