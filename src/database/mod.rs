pub mod json_file;
pub mod sqlite;
pub mod store;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;
pub use store::{FactStore, MemoryStore, ServedBy, TieredStore};
