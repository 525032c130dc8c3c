//! Container runtime capability for dockhand
//!
//! The backup core only talks to the runtime through the
//! [`ContainerRuntime`] trait, so it never assumes a transport:
//!
//! - [`docker::DockerCli`] drives the `docker` binary (local socket,
//!   `DOCKER_HOST`, or any CLI-compatible runtime such as podman)
//! - tests inject in-memory fakes

pub mod docker;
pub mod error;
pub mod traits;
mod utils;

pub use docker::DockerCli;
pub use error::{Result, RuntimeError};
pub use traits::{ContainerRuntime, ContainerSummary, HelperSpec, HELPER_LABEL};
