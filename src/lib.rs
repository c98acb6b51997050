// Базовые модули
pub mod config;
pub mod error;
pub mod metrics;

// Дерево данных с отслеживанием изменений
pub mod node; // src/node/{mod,tracker,wrap,snapshot,pointer}.rs

// Сессии, реестр, хуки завершения
pub mod lifecycle;
pub mod registry;
pub mod session; // src/session/{mod,open,saver,io}.rs

pub mod cli;

use std::path::Path;

// Удобные реэкспорты
pub use config::{CacheBuilder, CacheOptions, DEFAULT_SAVE_PERIOD};
pub use error::{CacheError, Result};
pub use node::{Entry, Key, Node, NodeKind, MAX_SEQUENCE_GAP};
pub use session::Cache;

/// Open (or join) the cache backed by `path`. See [`Cache::open`].
pub fn open(path: impl AsRef<Path>, options: CacheOptions) -> Result<Cache> {
    Cache::open(path, options)
}

/// Flush if dirty and deregister. A second close is a no-op.
pub fn close(cache: &Cache) -> Result<()> {
    cache.close()
}

/// Blocking close for termination paths.
pub fn close_sync(cache: &Cache) -> Result<()> {
    cache.close_sync()
}
