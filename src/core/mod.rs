// ============================================================================
// spark-observe - Core Module
// Value model, subscriber trait, error type, and thread-local context
// ============================================================================

pub mod context;
pub mod error;
pub mod types;
pub mod value;
