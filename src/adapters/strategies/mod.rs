//! Decision strategies - one implementation per domain.

pub mod medical;

pub use medical::MedicalStrategy;
