//! OrgSync Server — HTTP surface over the propagation engine.
//!
//! Three routes: submit a job, poll a job with its per-target results,
//! and request cancellation. Authentication is delegated to the edge
//! proxy; the authenticated actor arrives in the `x-actor-id` header.

pub mod config;
pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
