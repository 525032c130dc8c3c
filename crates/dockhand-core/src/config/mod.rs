//! Settings loading and management

mod loader;
mod types;

pub use loader::{Settings, CONFIG_FILE_NAMES, ENV_PREFIX};
pub use types::AccessMode;
