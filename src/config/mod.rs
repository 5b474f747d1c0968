//! Configuration management module
//!
//! This module handles loading and validating node pool configuration
//! from environment variables and .env files.

pub mod settings;

pub use settings::PoolSettings;
