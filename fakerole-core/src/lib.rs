//! Fake roles: named groups of chat members mirrored to a storage backend.
//!
//! ```
//! use fakerole_core::group::Group;
//! use fakerole_core::storage::{MemoryBackend, StorageBackend};
//! use std::sync::Arc;
//!
//! let backend: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
//! let mut raid = Group::create(backend, "raid-night", "Raid", ["123456789012345678"])?;
//!
//! assert!(raid.add("223456789012345678")?);
//! assert!(!raid.add("not-a-snowflake")?);
//! # Ok::<(), fakerole_core::group::GroupError>(())
//! ```

pub mod config;
pub mod group;
pub mod logging;
pub mod metrics;
pub mod storage;
pub mod test_utils;

pub use config::Config;
pub use group::{fetch_all, Group, GroupError};
pub use logging::{init_logging, LogLevel};
pub use storage::{GroupRecord, StorageBackend, StorageError};
