//! TemplateLab Core
//!
//! Core types and abstractions for the TemplateLab pipeline engine.
//!
//! This crate contains:
//! - Domain types: Pipelines, typed steps, executions and their lifecycle
//! - DTOs: Request/response shapes exchanged with the HTTP boundary

pub mod domain;
pub mod dto;
