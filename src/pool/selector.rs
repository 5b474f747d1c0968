//! Node selection policies
//!
//! A selector picks one index out of the pool's currently alive nodes. The
//! pool calls it while holding its lock, so implementations only need to be
//! correct for a single caller at a time, but they must be `Send + Sync` to
//! live inside the pool.

use crate::error::{Error, Result};
use crate::node::NodeConfig;
use rand::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Selector Trait
// ============================================================================

/// Chooses which alive node serves the next request
pub trait NodeSelector: Send + Sync + fmt::Debug {
    /// Return an index into `candidates`, which is never empty
    fn select(&self, candidates: &[NodeConfig]) -> usize;
}

// ============================================================================
// Built-in Selectors
// ============================================================================

/// Built-in selection policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    /// Uniformly random selection (default)
    Random,
    /// Cycle through alive nodes in order
    RoundRobin,
}

impl SelectorKind {
    pub const ALL: [SelectorKind; 2] = [SelectorKind::Random, SelectorKind::RoundRobin];

    /// Registry name of the policy
    pub fn name(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::RoundRobin => "round_robin",
        }
    }

    pub fn create(&self) -> Box<dyn NodeSelector> {
        match self {
            Self::Random => Box::new(RandomSelector),
            Self::RoundRobin => Box::new(RoundRobinSelector::new()),
        }
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Random selection; keeps no state
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSelector;

impl NodeSelector for RandomSelector {
    fn select(&self, candidates: &[NodeConfig]) -> usize {
        if candidates.len() <= 1 {
            return 0;
        }
        thread_rng().gen_range(0..candidates.len())
    }
}

/// Round-robin selection over whatever is alive at call time
///
/// The counter only ever grows; the index is taken modulo the current
/// candidate count so nodes coming and going never trip it up.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counter: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }

    /// Get next index for a given total count
    pub fn next(&self, total: usize) -> usize {
        if total == 0 {
            return 0;
        }
        self.counter.fetch_add(1, Ordering::SeqCst) % total
    }
}

impl NodeSelector for RoundRobinSelector {
    fn select(&self, candidates: &[NodeConfig]) -> usize {
        self.next(candidates.len())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Factory producing a fresh selector for a new pool
pub type SelectorFactory = Arc<dyn Fn() -> Box<dyn NodeSelector> + Send + Sync>;

/// Named selector factories, consulted when a pool is built
#[derive(Clone)]
pub struct SelectorRegistry {
    factories: BTreeMap<String, SelectorFactory>,
}

impl SelectorRegistry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) a selector under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn NodeSelector> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, alphabetically
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the selector registered under `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn NodeSelector>> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => {
                let available = self
                    .names()
                    .iter()
                    .map(|n| format!("'{}'", n))
                    .collect::<Vec<_>>()
                    .join(", ");
                Err(Error::configuration(format!(
                    "Unknown option for selector_class: '{}'. Available options are: {}",
                    name, available
                )))
            }
        }
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in SelectorKind::ALL {
            registry.register(kind.name(), move || kind.create());
        }
        registry
    }
}

impl fmt::Debug for SelectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
