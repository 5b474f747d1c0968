//! Node Pool Implementation
//!
//! This module provides the `NodePool` that tracks which nodes of a cluster
//! are reachable, hands one out per request and quarantines nodes that fail.

use super::health::{DeadNodeBackoff, NodeHealth};
use super::health::{DEFAULT_DEAD_NODE_BACKOFF_FACTOR, DEFAULT_MAX_DEAD_NODE_BACKOFF};
use super::selector::{NodeSelector, SelectorKind, SelectorRegistry};
use crate::error::{Error, Result};
use crate::node::{Node, NodeConfig};
use rand::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

// ============================================================================
// Pool Configuration
// ============================================================================

/// Configuration for node pool behavior
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Registered name of the selection policy
    pub node_selector_class: String,
    /// Shuffle the seed nodes before first use
    pub randomize_nodes: bool,
    /// Quarantine after the first failure; doubles per further failure
    pub dead_node_backoff_factor: Duration,
    /// Upper bound on the quarantine
    pub max_dead_node_backoff: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            node_selector_class: SelectorKind::Random.name().to_string(),
            randomize_nodes: true,
            dead_node_backoff_factor: DEFAULT_DEAD_NODE_BACKOFF_FACTOR,
            max_dead_node_backoff: DEFAULT_MAX_DEAD_NODE_BACKOFF,
        }
    }
}

impl PoolConfig {
    pub fn new(node_selector_class: impl Into<String>) -> Self {
        Self {
            node_selector_class: node_selector_class.into(),
            ..Default::default()
        }
    }

    /// Round-robin over seeds kept in the given order
    pub fn round_robin() -> Self {
        Self::new(SelectorKind::RoundRobin.name()).with_randomize_nodes(false)
    }

    pub fn with_randomize_nodes(mut self, randomize: bool) -> Self {
        self.randomize_nodes = randomize;
        self
    }

    pub fn with_dead_node_backoff(mut self, factor: Duration, max: Duration) -> Self {
        self.dead_node_backoff_factor = factor;
        self.max_dead_node_backoff = max;
        self
    }
}

// ============================================================================
// Pool State
// ============================================================================

/// Builds the connection resource for a node
pub type NodeFactory<T> = Box<dyn Fn(&NodeConfig) -> T + Send + Sync>;

struct Registered<T> {
    node: Arc<Node<T>>,
    /// Insertion sequence, used to break ties between dead nodes
    order: u64,
    health: NodeHealth,
}

/// Everything guarded by the pool lock
struct PoolState<T> {
    nodes: HashMap<NodeConfig, Registered<T>>,
    /// Selection order of the alive nodes
    alive: Vec<NodeConfig>,
    /// Dead nodes keyed by (resurrect_after, insertion order)
    dead: BTreeMap<(Instant, u64), NodeConfig>,
    removed: HashSet<NodeConfig>,
    next_order: u64,
    selector: Box<dyn NodeSelector>,
}

impl<T> PoolState<T> {
    fn register(&mut self, node: Arc<Node<T>>) {
        let config = node.config().clone();
        let order = self.next_order;
        self.next_order += 1;
        self.removed.remove(&config);
        self.alive.push(config.clone());
        self.nodes.insert(
            config,
            Registered {
                node,
                order,
                health: NodeHealth::new(),
            },
        );
    }

    fn detach_alive(&mut self, config: &NodeConfig) {
        self.alive.retain(|c| c != config);
    }

    /// Move every dead node whose quarantine ran out back to alive
    fn resurrect_expired(&mut self, now: Instant) {
        while let Some(entry) = self.dead.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let config = entry.remove();
            if let Some(registered) = self.nodes.get_mut(&config) {
                registered.health.resurrect();
                tracing::info!(
                    node = %config,
                    failures = registered.health.consecutive_failures(),
                    "Resurrecting node after backoff"
                );
            }
            self.alive.push(config);
        }
    }

    fn select(&self) -> Option<Arc<Node<T>>> {
        if self.alive.is_empty() {
            return None;
        }
        let idx = self.selector.select(&self.alive) % self.alive.len();
        self.nodes
            .get(&self.alive[idx])
            .map(|registered| Arc::clone(&registered.node))
    }

    /// Dead node closest to resurrection, left dead
    fn earliest_dead(&self) -> Option<Arc<Node<T>>> {
        let (_, config) = self.dead.first_key_value()?;
        self.nodes
            .get(config)
            .map(|registered| Arc::clone(&registered.node))
    }
}

// ============================================================================
// Node Pool
// ============================================================================

/// A pool of cluster nodes with health tracking and pluggable selection
///
/// All state sits behind one mutex; every operation is a short in-memory
/// critical section, so the pool can be shared freely between threads.
pub struct NodePool<T> {
    state: Mutex<PoolState<T>>,
    seeds: HashSet<NodeConfig>,
    factory: NodeFactory<T>,
    backoff: DeadNodeBackoff,
    selector_name: String,
}

impl<T> NodePool<T> {
    /// Create a pool using the built-in selectors
    pub fn new<F>(configs: Vec<NodeConfig>, factory: F, config: PoolConfig) -> Result<Self>
    where
        F: Fn(&NodeConfig) -> T + Send + Sync + 'static,
    {
        Self::with_registry(configs, factory, config, &SelectorRegistry::default())
    }

    /// Create a pool resolving the selector name against `registry`
    pub fn with_registry<F>(
        mut configs: Vec<NodeConfig>,
        factory: F,
        config: PoolConfig,
        registry: &SelectorRegistry,
    ) -> Result<Self>
    where
        F: Fn(&NodeConfig) -> T + Send + Sync + 'static,
    {
        if configs.is_empty() {
            return Err(Error::configuration("Must specify at least one NodeConfig"));
        }

        let seeds: HashSet<NodeConfig> = configs.iter().cloned().collect();
        if seeds.len() != configs.len() {
            return Err(Error::configuration(
                "Cannot use duplicate NodeConfigs within a NodePool",
            ));
        }

        let selector = registry.create(&config.node_selector_class)?;
        let backoff =
            DeadNodeBackoff::new(config.dead_node_backoff_factor, config.max_dead_node_backoff)?;

        // Spread load across clients that share one host list
        if config.randomize_nodes {
            configs.shuffle(&mut thread_rng());
        }

        let mut state = PoolState {
            nodes: HashMap::with_capacity(configs.len()),
            alive: Vec::with_capacity(configs.len()),
            dead: BTreeMap::new(),
            removed: HashSet::new(),
            next_order: 0,
            selector,
        };
        for node_config in configs {
            let connection = factory(&node_config);
            state.register(Arc::new(Node::new(node_config, connection)));
        }

        tracing::debug!(
            nodes = seeds.len(),
            selector = %config.node_selector_class,
            randomized = config.randomize_nodes,
            "Created node pool"
        );

        Ok(Self {
            state: Mutex::new(state),
            seeds,
            factory: Box::new(factory),
            backoff,
            selector_name: config.node_selector_class,
        })
    }

    /// Get a node for the next request
    ///
    /// Nodes whose quarantine has expired are resurrected first. When no
    /// node is alive, the dead node closest to resurrection is returned
    /// without changing its state: the caller always gets something to try.
    pub fn get(&self) -> Arc<Node<T>> {
        self.get_at(Instant::now())
    }

    pub(crate) fn get_at(&self, now: Instant) -> Arc<Node<T>> {
        let mut state = self.lock();
        state.resurrect_expired(now);

        if let Some(node) = state.select() {
            return node;
        }

        tracing::debug!("No alive nodes, falling back to the next node due for resurrection");
        state
            .earliest_dead()
            .expect("seed nodes are never removed, so a pool is never empty")
    }

    /// Add a node; a no-op if its config is already registered
    pub fn add(&self, config: NodeConfig) {
        if self.lock().nodes.contains_key(&config) {
            return;
        }

        // Build the connection outside the lock
        let connection = (self.factory)(&config);
        let node = Arc::new(Node::new(config, connection));

        let mut state = self.lock();
        if state.nodes.contains_key(node.config()) {
            return;
        }
        tracing::debug!(node = %node.config(), "Adding node to pool");
        state.register(node);
    }

    /// Remove a dynamically added node
    ///
    /// Seed nodes and unknown configs are left alone.
    pub fn remove(&self, config: &NodeConfig) {
        if self.seeds.contains(config) {
            return;
        }

        let mut state = self.lock();
        let Some(registered) = state.nodes.remove(config) else {
            return;
        };
        if let Some(deadline) = registered.health.resurrect_after() {
            state.dead.remove(&(deadline, registered.order));
        } else {
            state.detach_alive(config);
        }
        state.removed.insert(config.clone());
        tracing::debug!(node = %config, "Removed node from pool");
    }

    /// Record a failed request against `node` and quarantine it
    pub fn mark_dead(&self, node: &Node<T>) {
        self.mark_dead_at(node, Instant::now());
    }

    pub(crate) fn mark_dead_at(&self, node: &Node<T>, now: Instant) {
        let config = node.config();
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(registered) = state.nodes.get_mut(config) else {
            return;
        };

        match registered.health.resurrect_after() {
            Some(deadline) => {
                state.dead.remove(&(deadline, registered.order));
            }
            None => state.alive.retain(|c| c != config),
        }

        let deadline = registered.health.record_failure(now, &self.backoff);
        let failures = registered.health.consecutive_failures();
        state.dead.insert((deadline, registered.order), config.clone());

        tracing::warn!(
            node = %config,
            failures,
            backoff_ms = deadline.duration_since(now).as_millis() as u64,
            "Node marked dead"
        );
    }

    /// Record a successful request against `node`, clearing any quarantine
    pub fn mark_live(&self, node: &Node<T>) {
        let config = node.config();
        let mut guard = self.lock();
        let state = &mut *guard;

        let Some(registered) = state.nodes.get_mut(config) else {
            return;
        };

        let deadline = registered.health.resurrect_after();
        let order = registered.order;
        registered.health.record_success();

        if let Some(deadline) = deadline {
            state.dead.remove(&(deadline, order));
            state.alive.push(config.clone());
            tracing::info!(node = %config, "Node marked live");
        }
    }

    /// Snapshot of the alive nodes in selection order
    pub fn alive_nodes(&self) -> Vec<Arc<Node<T>>> {
        let state = self.lock();
        state
            .alive
            .iter()
            .filter_map(|config| state.nodes.get(config))
            .map(|registered| Arc::clone(&registered.node))
            .collect()
    }

    /// Snapshot of the dead nodes, earliest resurrection first
    pub fn dead_nodes(&self) -> Vec<Arc<Node<T>>> {
        let state = self.lock();
        state
            .dead
            .values()
            .filter_map(|config| state.nodes.get(config))
            .map(|registered| Arc::clone(&registered.node))
            .collect()
    }

    /// Snapshot of the configs removed from the pool
    pub fn removed_nodes(&self) -> Vec<NodeConfig> {
        self.lock().removed.iter().cloned().collect()
    }

    /// Snapshot of every node in the pool, alive or dead, in insertion order
    pub fn all(&self) -> Vec<Arc<Node<T>>> {
        let state = self.lock();
        let mut registered: Vec<&Registered<T>> = state.nodes.values().collect();
        registered.sort_by_key(|r| r.order);
        registered.into_iter().map(|r| Arc::clone(&r.node)).collect()
    }

    /// Consecutive failures recorded for `config` (0 if unknown)
    pub fn consecutive_failures(&self, config: &NodeConfig) -> u32 {
        self.lock()
            .nodes
            .get(config)
            .map_or(0, |registered| registered.health.consecutive_failures())
    }

    /// Number of nodes in the pool, alive or dead
    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    /// Get pool statistics
    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            total: state.nodes.len(),
            alive: state.alive.len(),
            dead: state.dead.len(),
            removed: state.removed.len(),
            selector: self.selector_name.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState<T>> {
        // Critical sections never leave the state half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for NodePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<NodePool>")
    }
}

impl<T> fmt::Display for NodePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<NodePool>")
    }
}

// ============================================================================
// Pool Statistics
// ============================================================================

/// Statistics about a node pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Total number of nodes
    pub total: usize,
    /// Nodes eligible for selection
    pub alive: usize,
    /// Nodes in quarantine
    pub dead: usize,
    /// Configs removed from the pool
    pub removed: usize,
    /// Active selection policy
    pub selector: String,
}

impl PoolStats {
    /// Check if the pool is healthy (at least one node alive)
    pub fn is_healthy(&self) -> bool {
        self.alive > 0
    }
}

// ============================================================================
// Tests
// ============================================================================
