//! Storage layer abstraction trait definition

mod admin_client_registry;
mod global_config_repository;
mod history_repository;
mod instance_repository;
mod route_repository;

pub use admin_client_registry::{
    AdminClientFactory, AdminClientRegistry, HttpAdminClientFactory, InMemoryAdminClientRegistry,
};
pub use global_config_repository::GlobalConfigRepository;
pub use history_repository::HistoryRepository;
pub use instance_repository::InstanceRepository;
pub use route_repository::RouteRepository;
