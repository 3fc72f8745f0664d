//! Caddy Orchestrator Core Library
//!
//! Business logic for managing a fleet of Caddy instances:
//! - Route model and validation
//! - Config builder (routes + global settings -> Caddy JSON config)
//! - Sync orchestrator (apply with edit history, drift detection)
//! - Health monitor (one cancellable polling task per instance)
//! - Instance registry
//!
//! Storage is abstracted behind the traits in [`traits`], so the same services
//! run against the in-memory store, SQLite, or test mocks.

pub mod builder;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use builder::{build, BuildOutput, SkipReason, SkippedRoute};
pub use error::{CoreError, CoreResult};
pub use services::ServiceContext;
pub use traits::{
    AdminClientFactory, AdminClientRegistry, GlobalConfigRepository, HistoryRepository,
    InstanceRepository, RouteRepository,
};
