//! Configuration loading and management for the Contribution Engine.
//!
//! This module loads engine settings, the category A reference-year table and
//! the half-year policy rules from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use contribution_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Jurisdiction: {}", config.config().settings().jurisdiction);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BatchSettings, DEFAULT_CHUNK_SIZE, EngineConfig, EngineSettings, MAX_CHUNK_SIZE,
    ReferenceYearEntry, ReferenceYearTable, ReferenceYearsFile,
};
