//! Common test utilities for dockhand-backup
//!
//! - In-memory container runtime backed by temp directories
//! - Recording notifier
//! - Fixtures wiring settings, runtime and accessor together

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
