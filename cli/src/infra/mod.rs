//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: HTTP calls to the control
//! plane, filesystem access for config and credentials, and the in-memory
//! simulated cloud.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod control_plane;
pub mod credentials;
pub mod simulated;
