//! In-process exchange adapters standing in for the cache store and the
//! backend.

pub mod echo;
pub mod memory_store;

pub use echo::EchoBackend;
pub use memory_store::MemoryCacheStore;
