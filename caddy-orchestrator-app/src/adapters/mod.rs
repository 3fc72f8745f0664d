//! Storage adapters: volatile in-memory maps or a `SQLite` file.

mod memory;

pub use memory::InMemoryStore;

#[cfg(feature = "sqlite-store")]
mod sqlite;

#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteStore;
