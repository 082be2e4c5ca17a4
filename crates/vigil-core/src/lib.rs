//! VIGIL Core — domain models, error taxonomy, audit chain primitives,
//! and repository trait definitions shared across all crates.

pub mod error;
pub mod models;
pub mod repository;
