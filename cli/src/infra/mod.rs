//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: local process execution,
//! SSH sessions, local tool management and registry persistence.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod registry_store;
pub mod ssh;
pub mod toolchain;
