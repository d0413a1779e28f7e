//! Core types: errors, configuration, cancellation, path helpers.

pub mod config;
pub mod errors;
pub mod paths;
pub mod signals;
