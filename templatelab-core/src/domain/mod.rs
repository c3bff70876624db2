//! Core domain types
//!
//! This module contains the core domain structures used by the engine.
//! These types are shared between the persistence layer (stores) and the
//! execution layer (runner, step executor, capability providers).

pub mod capability;
pub mod execution;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod usage;
