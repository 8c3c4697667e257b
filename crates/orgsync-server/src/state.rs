//! Shared application state.

use std::sync::Arc;

use orgsync_db::repository::{
    SurrealAuditLogRepository, SurrealConfigGateway, SurrealDirectoryRepository,
    SurrealIdentityRepository, SurrealJobRepository,
};
use orgsync_engine::{EngineConfig, PropagationService};
use surrealdb::{Connection, Surreal};

/// The propagation service wired to the SurrealDB repositories.
pub type Service<C> = PropagationService<
    SurrealConfigGateway<C>,
    SurrealDirectoryRepository<C>,
    SurrealIdentityRepository<C>,
    SurrealJobRepository<C>,
    SurrealAuditLogRepository<C>,
>;

/// Application state shared across handlers.
pub struct AppState<C: Connection> {
    pub service: Arc<Service<C>>,
}

impl<C: Connection> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

impl<C: Connection> AppState<C> {
    /// Build the full service stack over one database handle.
    pub fn new(db: Surreal<C>, config: EngineConfig) -> Self {
        let service = PropagationService::new(
            Arc::new(SurrealConfigGateway::new(db.clone())),
            Arc::new(SurrealDirectoryRepository::new(db.clone())),
            Arc::new(SurrealIdentityRepository::new(db.clone())),
            Arc::new(SurrealJobRepository::new(db.clone())),
            Arc::new(SurrealAuditLogRepository::new(db)),
            config,
        );
        Self {
            service: Arc::new(service),
        }
    }
}
