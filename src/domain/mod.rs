//! Domain layer containing engine logic and decision types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared primitives (IDs, timestamps, error codes)
//! - `decision` - Requests, decisions, responses, confidence and validation
//! - `engine` - Registries, routing, retry, caching, metrics and the engine itself

pub mod decision;
pub mod engine;
pub mod foundation;
