//! Integration tests for the rlenable CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior.
//! They are slower and should be run separately from unit tests.

mod payload_command;
mod simulate_command;
