//! Repository Module
//!
//! Data access layer for the engine.
//! Each repository handles database operations for a specific domain entity.

pub mod execution;
pub mod pipeline;
pub mod usage;

// Re-export for convenience
pub use execution as execution_repository;
pub use pipeline as pipeline_repository;
pub use usage as usage_repository;
