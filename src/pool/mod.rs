//! Node Pool Module
//!
//! This module keeps track of the nodes of a cluster for an HTTP transport:
//! which ones are alive, which are quarantined after failures, and which one
//! serves the next request.
//!
//! # Features
//! - Pluggable selection policies (Random, RoundRobin, or registered by name)
//! - Capped exponential quarantine for failed nodes, resurrected lazily
//! - Dynamic `add`/`remove` of non-seed nodes under concurrent use
//!
//! # Example
//! ```
//! use transport_node_pool::node::{NodeConfig, Scheme};
//! use transport_node_pool::pool::{NodePool, PoolConfig};
//!
//! let configs = vec![
//!     NodeConfig::new(Scheme::Http, "10.0.0.1", 9200),
//!     NodeConfig::new(Scheme::Http, "10.0.0.2", 9200),
//! ];
//! let pool = NodePool::new(configs, |config| config.url(), PoolConfig::round_robin()).unwrap();
//!
//! let node = pool.get();
//! // ... issue the request against node.connection() ...
//! pool.mark_live(&node);
//! ```

mod health;
mod pool;
mod selector;

pub use health::{
    DeadNodeBackoff, NodeHealth, DEFAULT_DEAD_NODE_BACKOFF_FACTOR, DEFAULT_MAX_DEAD_NODE_BACKOFF,
};
pub use pool::{NodeFactory, NodePool, PoolConfig, PoolStats};
pub use selector::{
    NodeSelector, RandomSelector, RoundRobinSelector, SelectorFactory, SelectorKind,
    SelectorRegistry,
};
