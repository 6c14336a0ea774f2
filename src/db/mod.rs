mod core;
mod schema;
mod store;

pub use self::core::Database;
pub use self::store::{KeyValueStore, MemoryStore};
