//! Domain models for OrgSync.
//!
//! These are the core types shared across all crates.

pub mod actor;
pub mod audit;
pub mod job;
pub mod organization;
pub mod plan;
pub mod propagation;
pub mod snapshot;
pub mod tenant;
pub mod tier;
