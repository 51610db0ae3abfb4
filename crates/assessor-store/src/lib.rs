//! Session store backends.
//!
//! Implements the `SessionStore` trait over process memory and over a
//! directory of JSON files, and builds either one from configuration.

pub mod config;
pub mod file;
pub mod memory;

pub use config::{create_store, load_config, load_config_from, AssessorConfig, StoreConfig};
pub use file::FileStore;
pub use memory::{MemoryStore, StoreOp};
