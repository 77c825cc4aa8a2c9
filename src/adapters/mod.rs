//! Adapters - Implementations of port interfaces.
//!
//! - `ai` - Provider adapters (OpenAI, Anthropic, mock)
//! - `strategies` - Domain decision strategies (medical)

pub mod ai;
pub mod strategies;
