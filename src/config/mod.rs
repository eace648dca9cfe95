//! Configuration management
//!
//! Where the node keeps its data and how loudly it logs.

pub mod settings;

pub use settings::{Settings, DEFAULT_CONFIG_FILE, GLOBAL_SETTINGS};
