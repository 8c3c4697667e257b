//! OrgSync Core — domain models, error types, and repository contracts
//! shared across all crates.
//!
//! The propagation engine never owns business configuration data; it reads
//! from a source location and writes to target locations through the trait
//! contracts defined in [`repository`].

pub mod error;
pub mod models;
pub mod repository;

pub use error::{OrgSyncError, OrgSyncResult};
