//! # Node Library
//!
//! Ports, the closed set of node variants, and their per-tick evaluation.
//!
//! A node never reaches into its neighbours. The owning `Graph` resolves the
//! values arriving over links and hands them to `Node::evaluate_with`; the
//! node then updates its own state and output ports.
//!
//! ## Input resolution
//!
//! For every input port the graph supplies `Some(v)` when the port has at
//! least one link (`v` is the OR of all sources) and `None` otherwise. An
//! unlinked port falls back to its own locally-set value, which is how
//! tests and editors inject signals by hand.

use crate::action::Action;
use crate::blackboard::Blackboard;
use crate::condition::Condition;
use crate::graph::{Graph, TickReport};
use crate::primitives::{DEFAULT_DELAY_MS, DEFAULT_TIME_OFF_MS, DEFAULT_TIME_ON_MS};
use crate::providers::{InputProvider, VisionProvider};
use crate::{LinkId, NodeId, PixelgateError, PortDirection, PortRef, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// TICK CONTEXT
// =============================================================================

/// Everything a node may consult while it is evaluated.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub blackboard: &'a Blackboard,
    pub vision: Option<&'a dyn VisionProvider>,
    pub input: Option<&'a dyn InputProvider>,
    /// Monotonic timestamp of this tick (ms), shared by every node in it.
    pub now_ms: u64,
}

impl<'a> TickContext<'a> {
    /// Context stamped with the process clock and no device providers.
    #[must_use]
    pub fn new(blackboard: &'a Blackboard) -> Self {
        Self {
            blackboard,
            vision: None,
            input: None,
            now_ms: crate::clock::now_ms(),
        }
    }

    #[must_use]
    pub fn with_vision(mut self, vision: Option<&'a dyn VisionProvider>) -> Self {
        self.vision = vision;
        self
    }

    #[must_use]
    pub fn with_input(mut self, input: Option<&'a dyn InputProvider>) -> Self {
        self.input = input;
        self
    }

    /// Override the tick timestamp.
    #[must_use]
    pub fn at(mut self, now_ms: u64) -> Self {
        self.now_ms = now_ms;
        self
    }
}

// =============================================================================
// PORT
// =============================================================================

/// A connection point. Owned by exactly one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    name: String,
    direction: PortDirection,
    /// Current signal.
    pub value: bool,
    links: Vec<LinkId>,
}

impl Port {
    fn new(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            value: false,
            links: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Links incident to this port, in creation order.
    #[must_use]
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    pub(crate) fn attach(&mut self, link: LinkId) {
        if !self.links.contains(&link) {
            self.links.push(link);
        }
    }

    pub(crate) fn detach(&mut self, link: LinkId) {
        self.links.retain(|l| *l != link);
    }
}

// =============================================================================
// VARIANT PARAMETERS
// =============================================================================

/// Gate function of a Process node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicType {
    #[default]
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
}

impl LogicType {
    /// Apply the gate to an operand set.
    ///
    /// With no operands AND/OR/NAND/NOR yield false, NOT yields true and XOR
    /// (odd parity) yields false. NOT negates the first operand.
    #[must_use]
    pub fn apply(self, operands: &[bool]) -> bool {
        let any = operands.iter().any(|v| *v);
        let all = !operands.is_empty() && operands.iter().all(|v| *v);
        match self {
            Self::And => all,
            Self::Or => any,
            Self::Not => operands.first().is_none_or(|v| !v),
            Self::Nand => !operands.is_empty() && !all,
            Self::Nor => !operands.is_empty() && !any,
            Self::Xor => operands.iter().filter(|v| **v).count() % 2 == 1,
        }
    }
}

impl fmt::Display for LogicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Nand => "NAND",
            Self::Nor => "NOR",
            Self::Xor => "XOR",
        };
        f.write_str(s)
    }
}

/// Behaviour of a Timer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimerType {
    /// On-delay.
    #[default]
    Ton,
    /// Off-delay.
    Tof,
    /// Periodic pulse while triggered.
    Blink,
}

impl fmt::Display for TimerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ton => "TON",
            Self::Tof => "TOF",
            Self::Blink => "BLINK",
        };
        f.write_str(s)
    }
}

/// Configuration and running state of a Timer node. Durations are ms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub timer_type: TimerType,
    pub delay_time: u64,
    pub time_on: u64,
    pub time_off: u64,
    accumulator: u64,
    last_tick_time: Option<u64>,
}

impl TimerState {
    #[must_use]
    pub fn new(timer_type: TimerType) -> Self {
        Self {
            timer_type,
            delay_time: DEFAULT_DELAY_MS,
            time_on: DEFAULT_TIME_ON_MS,
            time_off: DEFAULT_TIME_OFF_MS,
            accumulator: 0,
            last_tick_time: None,
        }
    }

    #[must_use]
    pub fn accumulator(&self) -> u64 {
        self.accumulator
    }

    /// Timestamp of the previous evaluation; `None` before the first one.
    #[must_use]
    pub fn last_tick_time(&self) -> Option<u64> {
        self.last_tick_time
    }

    /// Drop the previous timestamp; the next step only records a baseline.
    pub fn rebase(&mut self) {
        self.last_tick_time = None;
    }

    /// Advance by one evaluation and update `out`.
    ///
    /// The first call only records the baseline timestamp.
    fn step(&mut self, trigger: bool, now_ms: u64, out: &mut bool) {
        let Some(last) = self.last_tick_time else {
            self.last_tick_time = Some(now_ms);
            return;
        };
        let dt = now_ms.saturating_sub(last);
        self.last_tick_time = Some(now_ms);

        match self.timer_type {
            TimerType::Ton => {
                if trigger {
                    self.accumulator = self.accumulator.saturating_add(dt);
                    *out = self.accumulator >= self.delay_time;
                } else {
                    self.accumulator = 0;
                    *out = false;
                }
            }
            TimerType::Tof => {
                if trigger {
                    self.accumulator = 0;
                    *out = true;
                } else {
                    self.accumulator = self.accumulator.saturating_add(dt);
                    if self.accumulator >= self.delay_time {
                        *out = false;
                    }
                }
            }
            TimerType::Blink => {
                let period = self.time_on.saturating_add(self.time_off);
                if trigger && period > 0 {
                    self.accumulator = self.accumulator.saturating_add(dt) % period;
                    *out = self.accumulator < self.time_on;
                } else {
                    self.accumulator = 0;
                    *out = false;
                }
            }
        }
    }
}

/// The embedded graph of a Group node and its boundary mappings.
///
/// Mapping keys are the group's external port names; values are ids of
/// GroupInput / GroupOutput sentinels inside `sub_graph`.
#[derive(Debug, Clone)]
pub struct GroupState {
    sub_graph: Graph,
    input_map: BTreeMap<String, NodeId>,
    output_map: BTreeMap<String, NodeId>,
}

impl GroupState {
    #[must_use]
    pub fn sub_graph(&self) -> &Graph {
        &self.sub_graph
    }

    /// Mutable access to the embedded graph for internal wiring.
    ///
    /// Removing a sentinel here leaves a dangling mapping, which
    /// `Graph::validate` reports.
    pub fn sub_graph_mut(&mut self) -> &mut Graph {
        &mut self.sub_graph
    }

    #[must_use]
    pub fn input_map(&self) -> &BTreeMap<String, NodeId> {
        &self.input_map
    }

    #[must_use]
    pub fn output_map(&self) -> &BTreeMap<String, NodeId> {
        &self.output_map
    }
}

// =============================================================================
// NODE KIND
// =============================================================================

/// Variant-specific part of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Input {
        condition: Condition,
    },
    Process {
        logic: LogicType,
    },
    Timer(TimerState),
    Toggle {
        state: bool,
        prev_trigger: bool,
    },
    Output {
        action: Action,
        prev_trigger: bool,
    },
    Group(Box<GroupState>),
    GroupInput,
    GroupOutput,
}

impl NodeKind {
    /// Every node tag accepted in documents.
    pub const TAGS: [&'static str; 8] = [
        "InputNode",
        "ProcessNode",
        "TimerNode",
        "ToggleNode",
        "OutputNode",
        "GroupNode",
        "GroupInput",
        "GroupOutput",
    ];

    /// Stable document tag of this variant.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Input { .. } => "InputNode",
            Self::Process { .. } => "ProcessNode",
            Self::Timer(_) => "TimerNode",
            Self::Toggle { .. } => "ToggleNode",
            Self::Output { .. } => "OutputNode",
            Self::Group(_) => "GroupNode",
            Self::GroupInput => "GroupInput",
            Self::GroupOutput => "GroupOutput",
        }
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A block of the diagram.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    pub name: String,
    pub position: Position,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
    is_memory: bool,
    kind: NodeKind,
}

impl Node {
    fn build(name: impl Into<String>, kind: NodeKind, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            id: NodeId::generate(),
            name: name.into(),
            position: Position::default(),
            inputs: inputs
                .iter()
                .map(|n| Port::new(*n, PortDirection::Input))
                .collect(),
            outputs: outputs
                .iter()
                .map(|n| Port::new(*n, PortDirection::Output))
                .collect(),
            is_memory: false,
            kind,
        }
    }

    /// Source block wrapping a condition. Output: `Out`.
    #[must_use]
    pub fn input(name: impl Into<String>, condition: Condition) -> Self {
        Self::build(name, NodeKind::Input { condition }, &[], &["Out"])
    }

    /// Logic gate. Inputs: `In1`, `In2`. Output: `Out`.
    #[must_use]
    pub fn process(name: impl Into<String>, logic: LogicType) -> Self {
        Self::build(name, NodeKind::Process { logic }, &["In1", "In2"], &["Out"])
    }

    /// Logic gate with an explicit, possibly empty, list of input names.
    pub fn process_with_inputs<I, S>(
        name: impl Into<String>,
        logic: LogicType,
        inputs: I,
    ) -> Result<Self, PixelgateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::build(name, NodeKind::Process { logic }, &[], &["Out"]);
        for port in inputs {
            node.add_input_port(port)?;
        }
        Ok(node)
    }

    /// Timer with default durations. Input: `In`. Output: `Out`.
    #[must_use]
    pub fn timer(name: impl Into<String>, timer_type: TimerType) -> Self {
        Self::build(
            name,
            NodeKind::Timer(TimerState::new(timer_type)),
            &["In"],
            &["Out"],
        )
    }

    /// Rising-edge flip-flop. Inputs: `Trigger`, `Reset`. Output: `Out`.
    #[must_use]
    pub fn toggle(name: impl Into<String>) -> Self {
        Self::build(
            name,
            NodeKind::Toggle {
                state: false,
                prev_trigger: false,
            },
            &["Trigger", "Reset"],
            &["Out"],
        )
    }

    /// Sink block wrapping an action. Input: `Trig`.
    #[must_use]
    pub fn output(name: impl Into<String>, action: Action) -> Self {
        Self::build(
            name,
            NodeKind::Output {
                action,
                prev_trigger: false,
            },
            &["Trig"],
            &[],
        )
    }

    /// Empty group. Ports appear as external inputs/outputs are added.
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::build(
            name,
            NodeKind::Group(Box::new(GroupState {
                sub_graph: Graph::new(),
                input_map: BTreeMap::new(),
                output_map: BTreeMap::new(),
            })),
            &[],
            &[],
        )
    }

    /// Rebuild a group from its parts, creating one port per mapping key.
    ///
    /// Every mapping must point at a sentinel of the matching kind.
    pub fn group_from_parts(
        name: impl Into<String>,
        sub_graph: Graph,
        input_map: BTreeMap<String, NodeId>,
        output_map: BTreeMap<String, NodeId>,
    ) -> Result<Self, PixelgateError> {
        let inputs: Vec<&str> = input_map.keys().map(String::as_str).collect();
        let outputs: Vec<&str> = output_map.keys().map(String::as_str).collect();
        let mut node = Self::build(name, NodeKind::GroupInput, &inputs, &outputs);
        let group = GroupState {
            sub_graph,
            input_map,
            output_map,
        };
        check_group_mappings(&group)?;
        node.kind = NodeKind::Group(Box::new(group));
        Ok(node)
    }

    /// Boundary sentinel inside a sub-graph. Output: `Out`.
    #[must_use]
    pub fn group_input(name: impl Into<String>) -> Self {
        Self::build(name, NodeKind::GroupInput, &[], &["Out"])
    }

    /// Boundary sentinel inside a sub-graph. Input: `In`.
    #[must_use]
    pub fn group_output(name: impl Into<String>) -> Self {
        Self::build(name, NodeKind::GroupOutput, &["In"], &[])
    }

    /// Replace the generated id (rehydration, fixtures).
    #[must_use]
    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position(x, y);
        self
    }

    /// Flag the node as a memory node for the cycle policy.
    ///
    /// Use `Graph::set_memory_node` once the node is in a graph.
    #[must_use]
    pub fn with_memory(mut self, is_memory: bool) -> Self {
        self.is_memory = is_memory;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    #[must_use]
    pub fn is_memory_node(&self) -> bool {
        self.is_memory
    }

    pub(crate) fn set_memory(&mut self, is_memory: bool) {
        self.is_memory = is_memory;
    }

    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable variant state (condition, action, timer durations, ...).
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.kind.tag()
    }

    #[must_use]
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    #[must_use]
    pub fn input_port(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn output_port(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    pub(crate) fn port_mut(&mut self, name: &str, direction: PortDirection) -> Option<&mut Port> {
        let ports = match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        };
        ports.iter_mut().find(|p| p.name == name)
    }

    /// Set the local value of an input port (manual injection).
    pub fn set_input(&mut self, name: &str, value: bool) -> Result<(), PixelgateError> {
        let id = self.id.clone();
        let port = self
            .port_mut(name, PortDirection::Input)
            .ok_or_else(|| PixelgateError::PortNotFound(PortRef::new(id, name)))?;
        port.value = value;
        Ok(())
    }

    /// Current value of an output port.
    #[must_use]
    pub fn output_value(&self, name: &str) -> Option<bool> {
        self.output_port(name).map(|p| p.value)
    }

    /// The group state, if this is a Group node.
    #[must_use]
    pub fn group_state(&self) -> Option<&GroupState> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn group_state_mut(&mut self) -> Option<&mut GroupState> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Dynamic ports
    // -------------------------------------------------------------------------

    /// Add a named input to a Process node.
    pub fn add_input_port(&mut self, name: impl Into<String>) -> Result<(), PixelgateError> {
        let name = name.into();
        if !matches!(self.kind, NodeKind::Process { .. }) {
            return Err(PixelgateError::InvalidConfig(format!(
                "{} '{}' has fixed input ports",
                self.tag(),
                self.name
            )));
        }
        self.ensure_free_name(&name, PortDirection::Input)?;
        self.inputs.push(Port::new(name, PortDirection::Input));
        Ok(())
    }

    /// Remove an unlinked input from a Process or Group node.
    ///
    /// For a group this also drops the mapping and its GroupInput sentinel.
    /// Use `Graph::remove_input_port` to unlink and remove in one step.
    pub fn remove_input_port(&mut self, name: &str) -> Result<(), PixelgateError> {
        self.ensure_unlinked(name, PortDirection::Input)?;
        match &mut self.kind {
            NodeKind::Process { .. } => {}
            NodeKind::Group(group) => {
                if let Some(sentinel) = group.input_map.remove(name) {
                    group.sub_graph.remove_node(&sentinel);
                }
            }
            _ => {
                return Err(PixelgateError::InvalidConfig(format!(
                    "{} '{}' has fixed input ports",
                    self.kind.tag(),
                    self.name
                )));
            }
        }
        self.inputs.retain(|p| p.name != name);
        Ok(())
    }

    /// Remove an unlinked external output from a Group node.
    pub fn remove_output_port(&mut self, name: &str) -> Result<(), PixelgateError> {
        self.ensure_unlinked(name, PortDirection::Output)?;
        let NodeKind::Group(group) = &mut self.kind else {
            return Err(PixelgateError::InvalidConfig(format!(
                "{} '{}' has fixed output ports",
                self.kind.tag(),
                self.name
            )));
        };
        if let Some(sentinel) = group.output_map.remove(name) {
            group.sub_graph.remove_node(&sentinel);
        }
        self.outputs.retain(|p| p.name != name);
        Ok(())
    }

    /// Expose a new group input, backed by a fresh GroupInput sentinel.
    ///
    /// Returns the sentinel's id inside the sub-graph.
    pub fn add_external_input(&mut self, name: impl Into<String>) -> Result<NodeId, PixelgateError> {
        let name = name.into();
        self.ensure_free_name(&name, PortDirection::Input)?;
        let NodeKind::Group(group) = &mut self.kind else {
            return Err(not_a_group(&self.name));
        };
        let sentinel = group.sub_graph.add_node(Node::group_input(name.clone()))?;
        group.input_map.insert(name.clone(), sentinel.clone());
        insert_sorted(&mut self.inputs, Port::new(name, PortDirection::Input));
        Ok(sentinel)
    }

    /// Expose a new group output, backed by a fresh GroupOutput sentinel.
    pub fn add_external_output(
        &mut self,
        name: impl Into<String>,
    ) -> Result<NodeId, PixelgateError> {
        let name = name.into();
        self.ensure_free_name(&name, PortDirection::Output)?;
        let NodeKind::Group(group) = &mut self.kind else {
            return Err(not_a_group(&self.name));
        };
        let sentinel = group.sub_graph.add_node(Node::group_output(name.clone()))?;
        group.output_map.insert(name.clone(), sentinel.clone());
        insert_sorted(&mut self.outputs, Port::new(name, PortDirection::Output));
        Ok(sentinel)
    }

    fn ensure_free_name(&self, name: &str, direction: PortDirection) -> Result<(), PixelgateError> {
        let taken = match direction {
            PortDirection::Input => self.input_port(name).is_some(),
            PortDirection::Output => self.output_port(name).is_some(),
        };
        if name.trim().is_empty() || taken {
            return Err(PixelgateError::InvalidConfig(format!(
                "port name '{}' is empty or already used on '{}'",
                name, self.name
            )));
        }
        Ok(())
    }

    fn ensure_unlinked(&self, name: &str, direction: PortDirection) -> Result<(), PixelgateError> {
        let port = match direction {
            PortDirection::Input => self.input_port(name),
            PortDirection::Output => self.output_port(name),
        }
        .ok_or_else(|| PixelgateError::PortNotFound(PortRef::new(self.id.clone(), name)))?;
        if port.is_connected() {
            return Err(PixelgateError::InvalidLink(format!(
                "port {} still has {} link(s)",
                PortRef::new(self.id.clone(), name),
                port.links.len()
            )));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    /// Evaluate with every input treated as unlinked (local values only).
    pub fn evaluate(&mut self, ctx: &TickContext<'_>) -> Result<TickReport, PixelgateError> {
        self.evaluate_with(&[], ctx)
    }

    /// Evaluate one tick.
    ///
    /// `linked[i]` is the OR of the link sources into input `i`, or `None`
    /// when that port has no links. Missing entries count as `None`.
    ///
    /// A Group node returns the report of its sub-graph tick; every other
    /// variant returns an empty report.
    pub fn evaluate_with(
        &mut self,
        linked: &[Option<bool>],
        ctx: &TickContext<'_>,
    ) -> Result<TickReport, PixelgateError> {
        let Node {
            inputs,
            outputs,
            kind,
            ..
        } = self;

        for (port, value) in inputs.iter_mut().zip(linked) {
            if let Some(v) = value {
                port.value = *v;
            }
        }
        let resolved: Vec<bool> = inputs.iter().map(|p| p.value).collect();
        let first = resolved.first().copied().unwrap_or(false);
        let mut nested = TickReport::default();

        match kind {
            NodeKind::Input { condition } => {
                let result = condition.evaluate_at(ctx.blackboard, ctx.vision, ctx.now_ms);
                set_first(outputs, result);
            }
            NodeKind::Process { logic } => {
                // Unlinked ports drop out of the operand set as soon as any port is linked.
                let connected: Vec<bool> = linked.iter().flatten().copied().collect();
                let operands = if connected.is_empty() {
                    resolved
                } else {
                    connected
                };
                set_first(outputs, logic.apply(&operands));
            }
            NodeKind::Timer(timer) => {
                if let Some(out) = outputs.first_mut() {
                    timer.step(first, ctx.now_ms, &mut out.value);
                }
            }
            NodeKind::Toggle {
                state,
                prev_trigger,
            } => {
                let reset = resolved.get(1).copied().unwrap_or(false);
                if first && !*prev_trigger {
                    *state = !*state;
                }
                *prev_trigger = first;
                if reset {
                    *state = false;
                }
                set_first(outputs, *state);
            }
            NodeKind::Output {
                action,
                prev_trigger,
            } => {
                let rising = first && !*prev_trigger;
                *prev_trigger = first;
                if rising {
                    action.execute(ctx.blackboard, ctx.input)?;
                }
            }
            NodeKind::Group(group) => {
                let group = &mut **group;
                for (port, value) in inputs.iter().zip(&resolved) {
                    let Some(id) = group.input_map.get(&port.name) else {
                        continue;
                    };
                    if let Some(node) = group.sub_graph.node_mut(id) {
                        set_first(&mut node.outputs, *value);
                    }
                }
                nested = group.sub_graph.execute_at(ctx);
                for port in outputs.iter_mut() {
                    let Some(id) = group.output_map.get(&port.name) else {
                        continue;
                    };
                    if let Some(node) = group.sub_graph.node(id) {
                        port.value = node.inputs.first().is_some_and(|p| p.value);
                    }
                }
            }
            // The forwarded value already sits on `Out`.
            NodeKind::GroupInput => {}
            // The resolved value already sits on `In`.
            NodeKind::GroupOutput => {}
        }
        Ok(nested)
    }
}

fn set_first(ports: &mut [Port], value: bool) {
    if let Some(port) = ports.first_mut() {
        port.value = value;
    }
}

fn insert_sorted(ports: &mut Vec<Port>, port: Port) {
    let at = ports.partition_point(|p| p.name < port.name);
    ports.insert(at, port);
}

fn not_a_group(name: &str) -> PixelgateError {
    PixelgateError::InvalidConfig(format!("'{}' is not a group node", name))
}

/// Every mapping must name a sentinel of the right kind in the sub-graph.
pub(crate) fn check_group_mappings(group: &GroupState) -> Result<(), PixelgateError> {
    let sides = [(&group.input_map, "GroupInput"), (&group.output_map, "GroupOutput")];
    for (map, expected) in sides {
        for (port, id) in map {
            match group.sub_graph.node(id) {
                Some(node) if node.tag() == expected => {}
                Some(node) => {
                    return Err(PixelgateError::InvalidConfig(format!(
                        "group port '{}' maps to {} '{}', expected {}",
                        port,
                        node.tag(),
                        id,
                        expected
                    )));
                }
                None => return Err(PixelgateError::NodeNotFound(id.clone())),
            }
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
