//! Core types: errors, configuration.

pub mod config;
pub mod errors;
