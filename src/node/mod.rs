//! Endpoint identity and node handles

mod config;
mod handle;

pub use config::{
    NodeConfig, NodeConfigBuilder, Scheme, DEFAULT_CONNECTIONS_PER_NODE, DEFAULT_REQUEST_TIMEOUT,
};
pub use handle::Node;
