//! Entry store implementations

mod in_memory;
mod redis;

pub use in_memory::InMemoryEntryStore;
pub use redis::{RedisEntryStore, RedisStoreConfig};
