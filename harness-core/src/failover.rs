//! Controller failover selection.
//!
//! The harness talks to one cloud controller at a time. When a topology
//! declares a redundant pair, the selector toggles between the two on a
//! connection failure. Rotation over more than two candidates is not
//! defined; `swap()` refuses rather than guessing an order.

use harness_types::{ConfigError, HarnessError, Node, Role};

use crate::topology::TopologyStore;

/// Active-controller tracker over an ordered candidate list.
///
/// Exactly one candidate is current at any time; the index starts at 0.
#[derive(Debug, Clone)]
pub struct ControllerSelector {
    candidates: Vec<Node>,
    active: usize,
}

impl ControllerSelector {
    /// Build a selector over explicit candidates.
    ///
    /// # Errors
    ///
    /// [`ConfigError::RoleNotDeclared`] if `candidates` is empty.
    pub fn new(candidates: Vec<Node>) -> Result<Self, ConfigError> {
        if candidates.is_empty() {
            return Err(ConfigError::RoleNotDeclared(Role::CONTROLLER));
        }
        Ok(Self {
            candidates,
            active: 0,
        })
    }

    /// Build a selector over every controller declared in `store`.
    pub fn from_store(store: &TopologyStore) -> Result<Self, ConfigError> {
        let candidates = store.controllers()?.into_iter().cloned().collect();
        Self::new(candidates)
    }

    /// The current controller.
    pub fn active(&self) -> &Node {
        &self.candidates[self.active]
    }

    /// Index of the current controller.
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// All candidates in declaration order.
    pub fn candidates(&self) -> &[Node] {
        &self.candidates
    }

    /// Toggle to the other candidate and return it.
    ///
    /// # Errors
    ///
    /// [`HarnessError::UnsupportedTopology`] unless there are exactly two
    /// candidates. The active index is left unchanged in that case.
    pub fn swap(&mut self) -> Result<&Node, HarnessError> {
        if self.candidates.len() != 2 {
            return Err(HarnessError::UnsupportedTopology {
                candidates: self.candidates.len(),
            });
        }
        self.active = 1 - self.active;
        Ok(self.active())
    }
}
