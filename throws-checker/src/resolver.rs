//! Fixed-point resolution of configurations over the cyclic element/AST
//! graph.
//!
//! Requests drive computation: asking for a node's configuration computes
//! it on demand, memoizes it, and records who read it in a dependents
//! multimap. A node that is re-entered while being computed answers with a
//! provisional empty configuration and is queued for recomputation; an
//! element re-entered during its own computation answers `None` to the
//! inner requester only. The settle loop then re-runs dirty nodes until the
//! tables stop changing.
//!
//! Sessions are single-threaded and cooperative: every entry point takes
//! `&mut self`, which is the serialization a host must provide when it
//! drives many requests as tasks. Lattice operations are deterministic, so
//! cache replay yields identical answers. The cancellation token is checked
//! at each lookup and each settle iteration; cancellation drops the dirty
//! set and in-flight requests answer `None`, while finalized cache entries
//! stay valid.

use crate::configuration::Configuration;
use crate::element_config;
use crate::expr_config;
use crate::overrides::OverrideTable;
use im::{OrdMap, OrdSet};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use throws_ast::{ElementId, ElementLocation, NodeId, Program};
use tracing::{trace, warn};

/// Cooperative cancellation shared with the host.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Key of a resolvable entity: an AST node or an element location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DepKey {
    Node(NodeId),
    Element(ElementLocation),
}

// Bound on settle iterations; the lattice height argument keeps real
// programs far below it.
const MAX_SETTLE_ITERATIONS: usize = 1_000;

/// One resolution session over a program. Owns the memo tables for its
/// lifetime; the program and override table are read-only to it.
pub struct ResolverSession<'p> {
    program: &'p Program,
    overrides: OverrideTable,
    configurations: HashMap<NodeId, Configuration>,
    element_configurations: HashMap<ElementLocation, Option<Configuration>>,
    element_of_location: HashMap<ElementLocation, ElementId>,
    /// node -> nodes that consumed it.
    dependents: OrdMap<DepKey, OrdSet<DepKey>>,
    dirty: BTreeSet<DepKey>,
    in_progress: BTreeSet<DepKey>,
    stack: Vec<DepKey>,
    cancel: CancellationToken,
}

impl<'p> ResolverSession<'p> {
    pub fn new(program: &'p Program) -> Self {
        ResolverSession::with_overrides(program, OverrideTable::new())
    }

    pub fn with_overrides(program: &'p Program, overrides: OverrideTable) -> Self {
        ResolverSession {
            program,
            overrides,
            configurations: HashMap::new(),
            element_configurations: HashMap::new(),
            element_of_location: HashMap::new(),
            dependents: OrdMap::new(),
            dirty: BTreeSet::new(),
            in_progress: BTreeSet::new(),
            stack: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Settled configuration of an expression node.
    pub fn configuration(&mut self, node: NodeId) -> Option<Configuration> {
        let result = self.get_configuration(node);
        self.settle();
        self.configurations.get(&node).cloned().or(result)
    }

    /// Settled configuration of an element.
    pub fn element_configuration(&mut self, element: ElementId) -> Option<Configuration> {
        let result = self.get_element_configuration(element);
        self.settle();
        let location = self.program.elements.location_of(element);
        self.element_configurations
            .get(&location)
            .cloned()
            .flatten()
            .or(result)
    }

    /// Raw (possibly provisional) lookup used from inside computations.
    /// Records the reading site as a dependent.
    pub(crate) fn get_configuration(&mut self, node: NodeId) -> Option<Configuration> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let key = DepKey::Node(node);
        self.record_dependent(&key);
        if let Some(cached) = self.configurations.get(&node) {
            return Some(cached.clone());
        }
        if self.in_progress.contains(&key) {
            // Cycle: answer provisionally and let the settle loop revisit.
            self.dirty.insert(key);
            return Some(Configuration::empty());
        }
        let computed = self.compute_node(node);
        if let Some(configuration) = &computed {
            self.configurations.insert(node, configuration.clone());
        }
        // If the computation was re-entered it handed out provisional
        // answers; its consumers must observe the finalized value.
        if self.dirty.contains(&key) {
            self.mark_dependents_dirty(&key);
        }
        computed
    }

    pub(crate) fn get_element_configuration(
        &mut self,
        element: ElementId,
    ) -> Option<Configuration> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let location = self.program.elements.location_of(element);
        self.element_of_location.insert(location.clone(), element);
        let key = DepKey::Element(location.clone());
        self.record_dependent(&key);
        if let Some(cached) = self.element_configurations.get(&location) {
            return cached.clone();
        }
        if self.in_progress.contains(&key) {
            // Recursion protection: the inner requester sees nothing; the
            // settle loop finalizes the element afterwards.
            self.dirty.insert(key);
            return None;
        }
        let computed = self.compute_element(element, &key);
        self.element_configurations.insert(location, computed.clone());
        if self.dirty.contains(&key) {
            self.mark_dependents_dirty(&key);
        }
        computed
    }

    fn compute_node(&mut self, node: NodeId) -> Option<Configuration> {
        let key = DepKey::Node(node);
        self.in_progress.insert(key.clone());
        self.stack.push(key.clone());
        let computed = expr_config::compute_configuration(self, node);
        self.stack.pop();
        self.in_progress.remove(&key);
        computed
    }

    fn compute_element(&mut self, element: ElementId, key: &DepKey) -> Option<Configuration> {
        self.in_progress.insert(key.clone());
        self.stack.push(key.clone());
        let computed = element_config::compute_element_configuration(self, element);
        self.stack.pop();
        self.in_progress.remove(key);
        computed
    }

    fn record_dependent(&mut self, key: &DepKey) {
        if let Some(reader) = self.stack.last() {
            if reader != key {
                let mut set = self.dependents.get(key).cloned().unwrap_or_default();
                set.insert(reader.clone());
                self.dependents.insert(key.clone(), set);
            }
        }
    }

    /// Re-run dirty computations until the memo tables stop changing.
    pub fn settle(&mut self) {
        let mut iterations = 0;
        while !self.dirty.is_empty() {
            if self.cancel.is_cancelled() {
                self.dirty.clear();
                return;
            }
            iterations += 1;
            if iterations > MAX_SETTLE_ITERATIONS {
                warn!("settle loop did not stabilize after {MAX_SETTLE_ITERATIONS} iterations");
                self.dirty.clear();
                return;
            }
            let snapshot = std::mem::take(&mut self.dirty);
            trace!(pending = snapshot.len(), "settle iteration");
            for key in snapshot {
                match &key {
                    DepKey::Node(node) => {
                        let old = self.configurations.get(node).cloned();
                        let new = self.compute_node(*node);
                        if new != old {
                            match &new {
                                Some(configuration) => {
                                    self.configurations.insert(*node, configuration.clone());
                                }
                                None => {
                                    self.configurations.remove(node);
                                }
                            }
                            self.mark_dependents_dirty(&key);
                        }
                    }
                    DepKey::Element(location) => {
                        let Some(element) = self.element_of_location.get(location).copied()
                        else {
                            continue;
                        };
                        let old = self.element_configurations.get(location).cloned();
                        let new = self.compute_element(element, &key);
                        if Some(&new) != old.as_ref() {
                            self.element_configurations.insert(location.clone(), new);
                            self.mark_dependents_dirty(&key);
                        }
                    }
                }
            }
        }
    }

    fn mark_dependents_dirty(&mut self, key: &DepKey) {
        if let Some(dependents) = self.dependents.get(key) {
            for dependent in dependents {
                self.dirty.insert(dependent.clone());
            }
        }
    }
}
