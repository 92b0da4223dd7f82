//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::process`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod host;
pub mod registry;
pub mod stages;
pub mod validate;

pub use config::AppConfig;
pub use error::{
    CommandError, ConfigError, ConnectionError, ProvisionError, StageError, ValidationError,
};
pub use host::Identity;
pub use registry::{Context, Registry, Server};
pub use stages::{Phase, Stage};
