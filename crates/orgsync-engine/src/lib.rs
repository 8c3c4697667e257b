//! OrgSync Engine — authorization gate, plan construction, and bounded
//! fan-out execution of propagation jobs.
//!
//! The engine is generic over the `orgsync-core` repository traits and
//! carries no storage dependency of its own.

pub mod cancel;
pub mod config;
pub mod executor;
pub mod gate;
pub mod planner;
pub mod service;

pub use cancel::CancelRegistry;
pub use config::EngineConfig;
pub use executor::PropagationExecutor;
pub use gate::{GateContext, TierGate};
pub use planner::PropagationPlanner;
pub use service::PropagationService;
