//! Error types

mod types;

pub use types::{Error, Result};
