//! aptly-store: Durable storage and configuration.
//!
//! Implements the core `KeyValueStore` trait on the file system and builds
//! the configured store for the CLI.

pub mod config;
pub mod error;
pub mod file;

pub use config::{load_config, load_config_from, open_store, AptlyConfig, StoreConfig};
pub use error::FileStoreError;
pub use file::FileStore;
