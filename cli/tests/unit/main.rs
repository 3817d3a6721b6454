//! Unit tests for the rlenable CLI
//!
//! These tests use mocked or in-memory control planes and run fast without
//! external I/O.

mod config_service;
mod enablement;
mod property_tests;
mod simulated;
mod tracker;
