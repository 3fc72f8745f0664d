//! `SeaORM` entities of `SqliteStore`.

pub mod edit_history;
pub mod global_config;
pub mod instance;
pub mod route;
