//! # Graph Scheduler
//!
//! The deterministic arena that owns nodes and links, computes the
//! execution order and runs one tick at a time.
//!
//! All data structures use `BTreeMap` / `BTreeSet` for deterministic
//! ordering. No `HashMap` allowed.
//!
//! ## Cycle policy
//!
//! Links whose source is a memory node do not count toward the target's
//! in-degree, so a cycle containing at least one memory node still sorts.
//! Consumers of a memory node read the value it held at the start of the
//! tick. A cycle without a memory node degrades to a fixed fallback order.

use crate::node::{Node, NodeKind, TickContext, check_group_mappings};
use crate::primitives::{FALLBACK_PROCESS_PASSES, MAX_GRAPH_NODES};
use crate::providers::{InputProvider, VisionProvider};
use crate::{Blackboard, LinkId, NodeId, PixelgateError, PortDirection, PortRef};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// LINKS & REPORTS
// =============================================================================

/// A directed edge from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub source: PortRef,
    pub target: PortRef,
}

/// State of the cached execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    /// A topological order is cached.
    Ordered,
    /// The graph has an unbreakable cycle; ticks use the fallback order.
    Cyclic,
    /// The structure changed since the last tick.
    Stale,
}

#[derive(Debug, Clone, Default)]
enum Schedule {
    #[default]
    Stale,
    Ordered(Vec<NodeId>),
    Cyclic(Vec<NodeId>),
}

/// A node evaluation that failed during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFault {
    pub node: NodeId,
    pub error: PixelgateError,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Number of node evaluations (fallback passes count each time).
    pub evaluated: usize,
    pub faults: Vec<NodeFault>,
    /// This graph or a nested group sub-graph ran the cycle fallback.
    pub fallback: bool,
}

// =============================================================================
// GRAPH
// =============================================================================

/// Node and link arena with a cached schedule.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    links: BTreeMap<LinkId, Link>,
    next_link_id: u64,
    schedule: Schedule,
    max_nodes: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            next_link_id: 0,
            schedule: Schedule::Stale,
            max_nodes: MAX_GRAPH_NODES,
        }
    }
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph holding at most `max_nodes` nodes.
    #[must_use]
    pub fn with_max_nodes(max_nodes: usize) -> Self {
        Self {
            max_nodes,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Change the node limit. Fails if the graph already exceeds it.
    pub fn set_max_nodes(&mut self, max_nodes: usize) -> Result<(), PixelgateError> {
        if self.nodes.len() > max_nodes {
            return Err(PixelgateError::GraphTooLarge { limit: max_nodes });
        }
        self.max_nodes = max_nodes;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Mutable node access for configuration and manual port values.
    ///
    /// Structural edits go through the graph so the schedule stays valid.
    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// Links with `id` at either end, in creation order.
    #[must_use]
    pub fn links_of(&self, id: &NodeId) -> Vec<&Link> {
        self.links
            .values()
            .filter(|l| &l.source.node == id || &l.target.node == id)
            .collect()
    }

    #[must_use]
    pub fn schedule_status(&self) -> ScheduleStatus {
        match self.schedule {
            Schedule::Stale => ScheduleStatus::Stale,
            Schedule::Ordered(_) => ScheduleStatus::Ordered,
            Schedule::Cyclic(_) => ScheduleStatus::Cyclic,
        }
    }

    /// The execution order, recomputing it if the structure changed.
    ///
    /// Returns `UnbreakableCycle` when ticks would use the fallback.
    pub fn execution_order(&mut self) -> Result<Vec<NodeId>, PixelgateError> {
        if let Schedule::Ordered(order) = self.refresh_schedule() {
            return Ok(order.clone());
        }
        self.topological_order()
    }

    // -------------------------------------------------------------------------
    // Structural mutation
    // -------------------------------------------------------------------------

    /// Insert a node. Its id must be unique in this graph.
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, PixelgateError> {
        let id = node.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(PixelgateError::DuplicateNode(id));
        }
        if self.nodes.len() >= self.max_nodes {
            return Err(PixelgateError::GraphTooLarge {
                limit: self.max_nodes,
            });
        }
        self.nodes.insert(id.clone(), node);
        self.mark_dirty();
        Ok(id)
    }

    /// Remove a node and every link touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<Node> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        let incident: Vec<LinkId> = self.links_of(id).iter().map(|l| l.id).collect();
        for link in incident {
            self.remove_link(link);
        }
        self.mark_dirty();
        self.nodes.remove(id)
    }

    /// Link two named ports. Silent no-op returning `None` if either port
    /// cannot be resolved; use `try_add_link` to learn why.
    pub fn add_link(
        &mut self,
        source: &NodeId,
        source_port: &str,
        target: &NodeId,
        target_port: &str,
    ) -> Option<LinkId> {
        match self.try_add_link(source, source_port, target, target_port) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(error = %e, "link ignored");
                None
            }
        }
    }

    /// Link an output port to an input port.
    pub fn try_add_link(
        &mut self,
        source: &NodeId,
        source_port: &str,
        target: &NodeId,
        target_port: &str,
    ) -> Result<LinkId, PixelgateError> {
        let source = self.resolve_port(source, source_port, PortDirection::Output)?;
        let target = self.resolve_port(target, target_port, PortDirection::Input)?;
        if self
            .links
            .values()
            .any(|l| l.source == source && l.target == target)
        {
            return Err(PixelgateError::InvalidLink(format!(
                "{} -> {} already exists",
                source, target
            )));
        }

        let id = LinkId(self.next_link_id);
        self.next_link_id = self.next_link_id.saturating_add(1);
        self.attach(&source, PortDirection::Output, id);
        self.attach(&target, PortDirection::Input, id);
        self.links.insert(id, Link { id, source, target });
        self.mark_dirty();
        Ok(id)
    }

    /// Remove a link from the graph and from both endpoint ports.
    pub fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        let link = self.links.remove(&id)?;
        self.detach(&link.source, PortDirection::Output, id);
        self.detach(&link.target, PortDirection::Input, id);
        self.mark_dirty();
        Some(link)
    }

    /// Change a node's memory flag.
    pub fn set_memory_node(&mut self, id: &NodeId, is_memory: bool) -> Result<(), PixelgateError> {
        let node = self.require_mut(id)?;
        if node.is_memory_node() != is_memory {
            node.set_memory(is_memory);
            self.mark_dirty();
        }
        Ok(())
    }

    /// Add a named input to a Process node.
    pub fn add_input_port(&mut self, id: &NodeId, name: &str) -> Result<(), PixelgateError> {
        self.require_mut(id)?.add_input_port(name)?;
        self.mark_dirty();
        Ok(())
    }

    /// Remove a Process node input together with its links.
    pub fn remove_input_port(&mut self, id: &NodeId, name: &str) -> Result<(), PixelgateError> {
        let node = self.require(id)?;
        if !matches!(node.kind(), NodeKind::Process { .. }) {
            return Err(PixelgateError::InvalidConfig(format!(
                "{} '{}' has fixed input ports",
                node.tag(),
                node.name
            )));
        }
        self.remove_port(id, name, PortDirection::Input)
    }

    /// Expose a new input on a group. Returns the sentinel id inside it.
    pub fn add_external_input(
        &mut self,
        group: &NodeId,
        name: &str,
    ) -> Result<NodeId, PixelgateError> {
        let sentinel = self.require_mut(group)?.add_external_input(name)?;
        self.mark_dirty();
        Ok(sentinel)
    }

    /// Expose a new output on a group. Returns the sentinel id inside it.
    pub fn add_external_output(
        &mut self,
        group: &NodeId,
        name: &str,
    ) -> Result<NodeId, PixelgateError> {
        let sentinel = self.require_mut(group)?.add_external_output(name)?;
        self.mark_dirty();
        Ok(sentinel)
    }

    /// Remove a group input, its links and its sentinel.
    pub fn remove_external_input(&mut self, group: &NodeId, name: &str) -> Result<(), PixelgateError> {
        self.require_group(group)?;
        self.remove_port(group, name, PortDirection::Input)
    }

    /// Remove a group output, its links and its sentinel.
    pub fn remove_external_output(
        &mut self,
        group: &NodeId,
        name: &str,
    ) -> Result<(), PixelgateError> {
        self.require_group(group)?;
        self.remove_port(group, name, PortDirection::Output)
    }

    fn remove_port(
        &mut self,
        id: &NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<(), PixelgateError> {
        let port = PortRef::new(id.clone(), name);
        let node = self.require(id)?;
        let exists = match direction {
            PortDirection::Input => node.input_port(name).is_some(),
            PortDirection::Output => node.output_port(name).is_some(),
        };
        if !exists {
            return Err(PixelgateError::PortNotFound(port));
        }

        let attached: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| match direction {
                PortDirection::Input => l.target == port,
                PortDirection::Output => l.source == port,
            })
            .map(|l| l.id)
            .collect();
        for link in attached {
            self.remove_link(link);
        }

        let node = self.require_mut(id)?;
        match direction {
            PortDirection::Input => node.remove_input_port(name)?,
            PortDirection::Output => node.remove_output_port(name)?,
        }
        self.mark_dirty();
        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.schedule = Schedule::Stale;
    }

    fn require(&self, id: &NodeId) -> Result<&Node, PixelgateError> {
        self.nodes
            .get(id)
            .ok_or_else(|| PixelgateError::NodeNotFound(id.clone()))
    }

    fn require_mut(&mut self, id: &NodeId) -> Result<&mut Node, PixelgateError> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| PixelgateError::NodeNotFound(id.clone()))
    }

    fn require_group(&self, id: &NodeId) -> Result<(), PixelgateError> {
        let node = self.require(id)?;
        if node.group_state().is_none() {
            return Err(PixelgateError::InvalidConfig(format!(
                "'{}' is not a group node",
                node.name
            )));
        }
        Ok(())
    }

    fn resolve_port(
        &self,
        id: &NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<PortRef, PixelgateError> {
        let node = self.require(id)?;
        let found = match direction {
            PortDirection::Input => node.input_port(name),
            PortDirection::Output => node.output_port(name),
        };
        match found {
            Some(_) => Ok(PortRef::new(id.clone(), name)),
            None => Err(PixelgateError::PortNotFound(PortRef::new(id.clone(), name))),
        }
    }

    fn attach(&mut self, port: &PortRef, direction: PortDirection, link: LinkId) {
        if let Some(p) = self
            .nodes
            .get_mut(&port.node)
            .and_then(|n| n.port_mut(&port.port, direction))
        {
            p.attach(link);
        }
    }

    fn detach(&mut self, port: &PortRef, direction: PortDirection, link: LinkId) {
        if let Some(p) = self
            .nodes
            .get_mut(&port.node)
            .and_then(|n| n.port_mut(&port.port, direction))
        {
            p.detach(link);
        }
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    /// Kahn's algorithm over the link adjacency.
    ///
    /// Memory-sourced links are ignored and the smallest ready id is taken
    /// first, so the order is a pure function of the structure.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, PixelgateError> {
        let mut in_degree: BTreeMap<&NodeId, usize> =
            self.nodes.keys().map(|id| (id, 0)).collect();
        let mut successors: BTreeMap<&NodeId, Vec<&NodeId>> = BTreeMap::new();

        for link in self.links.values() {
            if self.is_memory_source(link) {
                continue;
            }
            if let Some(degree) = in_degree.get_mut(&link.target.node) {
                *degree = degree.saturating_add(1);
            }
            successors
                .entry(&link.source.node)
                .or_default()
                .push(&link.target.node);
        }

        let mut ready: BTreeSet<&NodeId> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_first() {
            order.push(id.clone());
            for next in successors.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(*next) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.insert(*next);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let unresolved = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(id, _)| id.clone())
                .collect();
            return Err(PixelgateError::UnbreakableCycle { unresolved });
        }
        Ok(order)
    }

    /// Input nodes, then Process nodes for a fixed number of passes, then
    /// Output nodes. Every other variant is skipped.
    fn fallback_order(&self) -> Vec<NodeId> {
        let mut order: Vec<NodeId> = self
            .ids_where(|k| matches!(k, NodeKind::Input { .. }))
            .collect();
        for _ in 0..FALLBACK_PROCESS_PASSES {
            order.extend(self.ids_where(|k| matches!(k, NodeKind::Process { .. })));
        }
        order.extend(self.ids_where(|k| matches!(k, NodeKind::Output { .. })));
        order
    }

    fn ids_where(&self, pick: fn(&NodeKind) -> bool) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .values()
            .filter(move |n| pick(n.kind()))
            .map(|n| n.id().clone())
    }

    fn refresh_schedule(&mut self) -> &Schedule {
        if matches!(self.schedule, Schedule::Stale) {
            self.schedule = match self.topological_order() {
                Ok(order) => {
                    tracing::debug!(nodes = order.len(), "execution order recomputed");
                    Schedule::Ordered(order)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "unbreakable cycle, using fallback order");
                    Schedule::Cyclic(self.fallback_order())
                }
            };
        }
        &self.schedule
    }

    fn is_memory_source(&self, link: &Link) -> bool {
        self.nodes
            .get(&link.source.node)
            .is_some_and(Node::is_memory_node)
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Run one tick stamped with the process clock.
    pub fn execute(
        &mut self,
        blackboard: &Blackboard,
        vision: Option<&dyn VisionProvider>,
        input: Option<&dyn InputProvider>,
    ) -> TickReport {
        let ctx = TickContext::new(blackboard)
            .with_vision(vision)
            .with_input(input);
        self.execute_at(&ctx)
    }

    /// Run one tick with the context's timestamp.
    ///
    /// Node faults are logged and collected; they never abort the tick.
    pub fn execute_at(&mut self, ctx: &TickContext<'_>) -> TickReport {
        self.refresh_schedule();
        // Evaluation never changes structure, so the order can be lent out.
        let schedule = std::mem::take(&mut self.schedule);
        let (order, fallback) = match &schedule {
            Schedule::Ordered(order) => (order.as_slice(), false),
            Schedule::Cyclic(order) => (order.as_slice(), true),
            Schedule::Stale => (&[][..], false),
        };

        let memory = self.memory_snapshot();
        let mut report = TickReport {
            fallback,
            ..TickReport::default()
        };

        for id in order {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let linked: Vec<Option<bool>> = node
                .inputs()
                .iter()
                .map(|port| self.resolve_links(port.links(), &memory))
                .collect();

            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            report.evaluated = report.evaluated.saturating_add(1);
            match node.evaluate_with(&linked, ctx) {
                // Faults inside a group surface under the inner node's id.
                Ok(nested) => {
                    report.faults.extend(nested.faults);
                    report.fallback |= nested.fallback;
                }
                Err(e) => {
                    tracing::warn!(node = %id, name = %node.name, error = %e, "node evaluation failed");
                    report.faults.push(NodeFault {
                        node: id.clone(),
                        error: PixelgateError::NodeEvaluation {
                            node: id.clone(),
                            name: node.name.clone(),
                            message: e.to_string(),
                        },
                    });
                }
            }
        }

        self.schedule = schedule;
        report
    }

    /// Forget every Timer node's previous timestamp, sub-graphs included.
    ///
    /// The next tick records a fresh baseline, so time spent outside
    /// execution is not accumulated. Accumulators and outputs are kept.
    pub fn rebase_timers(&mut self) {
        for node in self.nodes.values_mut() {
            match node.kind_mut() {
                NodeKind::Timer(timer) => timer.rebase(),
                NodeKind::Group(group) => group.sub_graph_mut().rebase_timers(),
                _ => {}
            }
        }
    }

    /// Output values of memory nodes as they stand before any evaluation.
    fn memory_snapshot(&self) -> BTreeMap<PortRef, bool> {
        self.nodes
            .values()
            .filter(|n| n.is_memory_node())
            .flat_map(|n| {
                n.outputs()
                    .iter()
                    .map(move |p| (PortRef::new(n.id().clone(), p.name()), p.value))
            })
            .collect()
    }

    /// OR of every source feeding a port; `None` when the port is unlinked.
    fn resolve_links(&self, links: &[LinkId], memory: &BTreeMap<PortRef, bool>) -> Option<bool> {
        if links.is_empty() {
            return None;
        }
        let value = links
            .iter()
            .filter_map(|id| self.links.get(id))
            .any(|link| match memory.get(&link.source) {
                Some(held) => *held,
                None => self
                    .nodes
                    .get(&link.source.node)
                    .and_then(|n| n.output_value(&link.source.port))
                    .unwrap_or(false),
            });
        Some(value)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Check structural consistency and node parameters, recursing into
    /// groups. Cycles are not an error here; they run on the fallback.
    pub fn validate(&self) -> Result<(), PixelgateError> {
        if self.nodes.len() > self.max_nodes {
            return Err(PixelgateError::GraphTooLarge {
                limit: self.max_nodes,
            });
        }

        for link in self.links.values() {
            for (end, direction) in [
                (&link.source, PortDirection::Output),
                (&link.target, PortDirection::Input),
            ] {
                let node = self.require(&end.node)?;
                let port = match direction {
                    PortDirection::Input => node.input_port(&end.port),
                    PortDirection::Output => node.output_port(&end.port),
                }
                .ok_or_else(|| PixelgateError::PortNotFound(end.clone()))?;
                if !port.links().contains(&link.id) {
                    return Err(PixelgateError::InvalidLink(format!(
                        "port {} does not record link {:?}",
                        end, link.id
                    )));
                }
            }
        }

        for node in self.nodes.values() {
            match node.kind() {
                NodeKind::Input { condition } => condition.validate()?,
                NodeKind::Output { action, .. } => action.validate()?,
                NodeKind::Group(group) => {
                    check_group_mappings(group)?;
                    group.sub_graph().validate()?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
