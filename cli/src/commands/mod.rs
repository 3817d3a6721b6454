//! Command implementations

pub mod config;
pub mod enable;
pub mod payload;
pub mod simulate;
pub mod version;
