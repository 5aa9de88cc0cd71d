pub mod archive;
pub mod cache;

pub use archive::RunArchive;
pub use cache::{CacheEntry, CacheStats, CacheStore, EvaluationCache, FileStore, MemoryStore};
