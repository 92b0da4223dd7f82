//! Unit tests for berth CLI
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod architecture;
mod mocks;
mod progress_view;
mod stage_engine;
