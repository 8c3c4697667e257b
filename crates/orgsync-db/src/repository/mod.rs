//! SurrealDB repository implementations for the `orgsync-core` contracts.

mod audit;
mod config;
mod directory;
mod identity;
mod job;

pub use audit::SurrealAuditLogRepository;
pub use config::SurrealConfigGateway;
pub use directory::SurrealDirectoryRepository;
pub use identity::SurrealIdentityRepository;
pub use job::SurrealJobRepository;
