//! Data Transfer Objects for the HTTP boundary
//!
//! DTOs are the request/response shapes accepted and returned by the engine's
//! API. They convert into and out of the domain types.

pub mod execution;
pub mod pipeline;
