//! Decision Engine - domain-agnostic decision orchestration
//!
//! Routes decision requests to a domain strategy, asks one of several AI
//! providers for a structured answer, and gates the result on validation and
//! confidence, retrying across providers and synthesizing a conservative
//! fallback when every attempt fails.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
