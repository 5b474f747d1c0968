//! Transport node pool library
//!
//! Tracks the nodes of a cluster for an HTTP client transport, picks one per
//! request and quarantines the ones that fail.

// Public modules
pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod pool;
pub mod utils;

// Re-export commonly used types
pub use config::PoolSettings;
pub use error::{Error, Result};
pub use node::{Node, NodeConfig, Scheme};
pub use pool::{NodePool, NodeSelector, PoolConfig, PoolStats, SelectorRegistry};
pub use utils::{parse_cloud_id, url_to_node_config, CloudId};
