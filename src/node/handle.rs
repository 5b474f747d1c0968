//! Pool-owned node handle

use super::config::NodeConfig;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A live handle bound to one [`NodeConfig`]
///
/// `T` is the connection resource built for the node by the factory given
/// to the pool. Nodes are compared by config only.
pub struct Node<T> {
    config: NodeConfig,
    connection: T,
}

impl<T> Node<T> {
    pub(crate) fn new(config: NodeConfig, connection: T) -> Self {
        Self { config, connection }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Connection resource for this node
    pub fn connection(&self) -> &T {
        &self.connection
    }

    pub fn url(&self) -> String {
        self.config.url()
    }
}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        self.config == other.config
    }
}

impl<T> Eq for Node<T> {}

impl<T> Hash for Node<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.config.hash(state);
    }
}

impl<T> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Node({})>", self.config.url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Scheme;

    #[test]
    fn test_node_identity_is_config() {
        let config = NodeConfig::new(Scheme::Http, "localhost", 9200);
        let a = Node::new(config.clone(), 1u8);
        let b = Node::new(config, 2u8);
        assert_eq!(a, b);
        assert_eq!(*a.connection(), 1);
        assert_eq!(format!("{:?}", a), "<Node(http://localhost:9200)>");
    }
}
