//! Shared components - configuration, errors and numeric helpers

pub mod config;
pub mod errors;
pub mod utils;
