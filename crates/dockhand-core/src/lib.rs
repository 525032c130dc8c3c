//! # dockhand-core
//!
//! Core library for the dockhand CLI providing:
//! - Settings loading (dockhand.yaml + `DOCKHAND_*` environment overrides)
//! - The shared configuration error type
//! - Default path resolution for state, backups and config

pub mod config;
pub mod error;
pub mod utils;

pub use config::{AccessMode, Settings};
pub use error::{Error, Result};
pub use utils::get_home_dir;
