//! Domain models for VIGIL.
//!
//! These are the core types shared across all crates.

pub mod audit;
pub mod policy;
pub mod principal;
pub mod role;
pub mod service;
pub mod session;
pub mod tenant;
