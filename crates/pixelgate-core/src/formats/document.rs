//! # Graph Document
//!
//! Versioned JSON serialization for graphs, groups included.
//!
//! Format:
//! ```json
//! { "version": "1.0", "type": "PixelPilot_Graph", "nodes": [...], "links": [...] }
//! ```
//!
//! ## Loading order
//!
//! 1. Parse the envelope and check the `type` marker
//! 2. Reject incompatible versions BEFORE touching any node record
//! 3. Check every node, condition and action `type` tag against the known set
//! 4. Rebuild nodes, then links, recursing into group sub-graphs
//! 5. Run `Graph::validate`
//!
//! Any failure is returned as a typed error; a partial graph is never
//! returned.

use crate::node::{LogicType, Node, NodeKind, TimerType};
use crate::primitives::{
    DEFAULT_DELAY_MS, DEFAULT_TIME_OFF_MS, DEFAULT_TIME_ON_MS, DOCUMENT_TYPE, FORMAT_VERSION,
};
use crate::{Action, Condition, Graph, NodeId, PixelgateError, Position};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// DOCUMENT RECORDS
// =============================================================================

/// Top-level document envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub version: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(flatten)]
    pub body: GraphBody,
}

/// Nodes and links of one graph level. Node records stay raw JSON until
/// their tags have been checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphBody {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
}

/// A link, addressed by node ids and port names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_node_id: NodeId,
    pub source_port: String,
    pub target_node_id: NodeId,
    pub target_port: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRecord {
    id: NodeId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    position: Position,
    #[serde(default, skip_serializing_if = "is_false")]
    is_memory_node: bool,
    #[serde(flatten)]
    variant: NodeVariant,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum NodeVariant {
    InputNode {
        condition: Condition,
    },
    ProcessNode {
        #[serde(default)]
        logic_type: LogicType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        input_ports: Option<Vec<String>>,
    },
    TimerNode {
        #[serde(default)]
        timer_type: TimerType,
        #[serde(default = "default_delay", deserialize_with = "de_millis")]
        delay_time: u64,
        #[serde(default = "default_time_on", deserialize_with = "de_millis")]
        time_on: u64,
        #[serde(default = "default_time_off", deserialize_with = "de_millis")]
        time_off: u64,
    },
    ToggleNode {},
    OutputNode {
        action: Action,
    },
    GroupNode {
        #[serde(default)]
        sub_graph: GraphBody,
        #[serde(default)]
        input_mappings: BTreeMap<String, NodeId>,
        #[serde(default)]
        output_mappings: BTreeMap<String, NodeId>,
    },
    GroupInput {},
    GroupOutput {},
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_delay() -> u64 {
    DEFAULT_DELAY_MS
}

fn default_time_on() -> u64 {
    DEFAULT_TIME_ON_MS
}

fn default_time_off() -> u64 {
    DEFAULT_TIME_OFF_MS
}

/// Durations in milliseconds from an integer or a float (rounded).
fn de_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(ms) = number.as_u64() {
        return Ok(ms);
    }
    match number.as_f64() {
        Some(ms) if ms.is_finite() && ms >= 0.0 => Ok(ms.round() as u64),
        _ => Err(serde::de::Error::custom(format!(
            "duration must be a non-negative number of milliseconds, got {}",
            number
        ))),
    }
}

// =============================================================================
// VERSIONING
// =============================================================================

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or_default().trim()
}

/// A document loads when its major version equals the serializer's.
#[must_use]
pub fn is_compatible_version(version: &str) -> bool {
    let found = major(version);
    !found.is_empty() && found == major(FORMAT_VERSION)
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Serialize a graph to pretty-printed JSON.
///
/// This is a pure transformation - no file I/O. Output is deterministic:
/// nodes in id order, links in creation order.
pub fn graph_to_json(graph: &Graph) -> Result<String, PixelgateError> {
    let document = GraphDocument {
        version: FORMAT_VERSION.to_string(),
        doc_type: DOCUMENT_TYPE.to_string(),
        body: body_of(graph)?,
    };
    serde_json::to_string_pretty(&document)
        .map_err(|e| PixelgateError::SerializationError(e.to_string()))
}

fn body_of(graph: &Graph) -> Result<GraphBody, PixelgateError> {
    let nodes = graph
        .nodes()
        .map(|node| {
            let record = record_of(node)?;
            serde_json::to_value(record)
                .map_err(|e| PixelgateError::SerializationError(e.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let links = graph
        .links()
        .map(|link| LinkRecord {
            source_node_id: link.source.node.clone(),
            source_port: link.source.port.clone(),
            target_node_id: link.target.node.clone(),
            target_port: link.target.port.clone(),
        })
        .collect();
    Ok(GraphBody { nodes, links })
}

fn record_of(node: &Node) -> Result<NodeRecord, PixelgateError> {
    let variant = match node.kind() {
        NodeKind::Input { condition } => NodeVariant::InputNode {
            condition: condition.clone(),
        },
        NodeKind::Process { logic } => NodeVariant::ProcessNode {
            logic_type: *logic,
            input_ports: Some(node.inputs().iter().map(|p| p.name().to_string()).collect()),
        },
        NodeKind::Timer(timer) => NodeVariant::TimerNode {
            timer_type: timer.timer_type,
            delay_time: timer.delay_time,
            time_on: timer.time_on,
            time_off: timer.time_off,
        },
        NodeKind::Toggle { .. } => NodeVariant::ToggleNode {},
        NodeKind::Output { action, .. } => NodeVariant::OutputNode {
            action: action.clone(),
        },
        NodeKind::Group(group) => NodeVariant::GroupNode {
            sub_graph: body_of(group.sub_graph())?,
            input_mappings: group.input_map().clone(),
            output_mappings: group.output_map().clone(),
        },
        NodeKind::GroupInput => NodeVariant::GroupInput {},
        NodeKind::GroupOutput => NodeVariant::GroupOutput {},
    };
    Ok(NodeRecord {
        id: node.id().clone(),
        name: node.name.clone(),
        position: node.position,
        is_memory_node: node.is_memory_node(),
        variant,
    })
}

// =============================================================================
// DESERIALIZATION
// =============================================================================

/// Deserialize a graph from JSON text.
///
/// This is a pure transformation - no file I/O.
pub fn graph_from_json(text: &str) -> Result<Graph, PixelgateError> {
    let document: GraphDocument = serde_json::from_str(text)
        .map_err(|e| PixelgateError::MalformedDocument(e.to_string()))?;

    if document.doc_type != DOCUMENT_TYPE {
        return Err(PixelgateError::MalformedDocument(format!(
            "expected document type '{}', found '{}'",
            DOCUMENT_TYPE, document.doc_type
        )));
    }
    if !is_compatible_version(&document.version) {
        return Err(PixelgateError::IncompatibleVersion {
            found: document.version,
            expected: FORMAT_VERSION.to_string(),
        });
    }

    let graph = build_graph(&document.body)?;
    graph.validate()?;
    Ok(graph)
}

fn build_graph(body: &GraphBody) -> Result<Graph, PixelgateError> {
    let mut graph = Graph::new();

    for raw in &body.nodes {
        check_tags(raw)?;
        let record: NodeRecord = serde_json::from_value(raw.clone())
            .map_err(|e| PixelgateError::MalformedDocument(e.to_string()))?;
        graph.add_node(node_of(record)?)?;
    }

    for link in &body.links {
        graph.try_add_link(
            &link.source_node_id,
            &link.source_port,
            &link.target_node_id,
            &link.target_port,
        )?;
    }
    Ok(graph)
}

/// Reject unknown node, condition and action tags with a typed error.
fn check_tags(raw: &Value) -> Result<(), PixelgateError> {
    let tag = check_tag(raw, "node", &NodeKind::TAGS)?;
    match tag {
        "InputNode" => {
            if let Some(condition) = raw.get("condition") {
                check_tag(condition, "condition", &Condition::TAGS)?;
            }
        }
        "OutputNode" => {
            if let Some(action) = raw.get("action") {
                check_tag(action, "action", &Action::TAGS)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn check_tag<'a>(
    raw: &'a Value,
    kind: &'static str,
    known: &[&str],
) -> Result<&'a str, PixelgateError> {
    let tag = raw
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| PixelgateError::MalformedDocument(format!("{} record without a type", kind)))?;
    if !known.contains(&tag) {
        return Err(PixelgateError::UnknownTypeTag {
            kind,
            tag: tag.to_string(),
        });
    }
    Ok(tag)
}

fn node_of(record: NodeRecord) -> Result<Node, PixelgateError> {
    let NodeRecord {
        id,
        name,
        position,
        is_memory_node,
        variant,
    } = record;

    let mut node = match variant {
        NodeVariant::InputNode { condition } => Node::input(name, condition),
        NodeVariant::ProcessNode {
            logic_type,
            input_ports,
        } => match input_ports {
            Some(ports) => Node::process_with_inputs(name, logic_type, ports)?,
            None => Node::process(name, logic_type),
        },
        NodeVariant::TimerNode {
            timer_type,
            delay_time,
            time_on,
            time_off,
        } => {
            let mut node = Node::timer(name, timer_type);
            if let NodeKind::Timer(timer) = node.kind_mut() {
                timer.delay_time = delay_time;
                timer.time_on = time_on;
                timer.time_off = time_off;
            }
            node
        }
        NodeVariant::ToggleNode {} => Node::toggle(name),
        NodeVariant::OutputNode { action } => Node::output(name, action),
        NodeVariant::GroupNode {
            sub_graph,
            input_mappings,
            output_mappings,
        } => Node::group_from_parts(
            name,
            build_graph(&sub_graph)?,
            input_mappings,
            output_mappings,
        )?,
        NodeVariant::GroupInput {} => Node::group_input(name),
        NodeVariant::GroupOutput {} => Node::group_output(name),
    };
    node.position = position;
    Ok(node.with_id(id).with_memory(is_memory_node))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rgb;
    use serde_json::json;

    fn envelope(version: &str, nodes: Value, links: Value) -> String {
        json!({ "version": version, "type": DOCUMENT_TYPE, "nodes": nodes, "links": links })
            .to_string()
    }

    #[test]
    fn version_compatibility_is_by_major() {
        assert!(is_compatible_version("1.0"));
        assert!(is_compatible_version("1.9"));
        assert!(is_compatible_version("1"));
        assert!(!is_compatible_version("2.0"));
        assert!(!is_compatible_version("0.9"));
        assert!(!is_compatible_version(""));
    }

    #[test]
    fn version_is_checked_before_nodes() {
        let text = envelope("2.0", json!([{ "type": "Bogus" }]), json!([]));
        assert_eq!(
            graph_from_json(&text).map(|g| g.node_count()),
            Err(PixelgateError::IncompatibleVersion {
                found: "2.0".to_string(),
                expected: "1.0".to_string()
            })
        );
    }

    #[test]
    fn wrong_marker_is_malformed() {
        let text = json!({ "version": "1.0", "type": "Other", "nodes": [], "links": [] });
        assert!(matches!(
            graph_from_json(&text.to_string()),
            Err(PixelgateError::MalformedDocument(_))
        ));
        assert!(matches!(
            graph_from_json("{ not json"),
            Err(PixelgateError::MalformedDocument(_))
        ));
    }

    #[test]
    fn unknown_tags_are_typed() {
        let node = envelope("1.0", json!([{ "id": "a", "type": "LaserNode" }]), json!([]));
        assert_eq!(
            graph_from_json(&node).map(|g| g.node_count()),
            Err(PixelgateError::UnknownTypeTag {
                kind: "node",
                tag: "LaserNode".to_string()
            })
        );

        let condition = envelope(
            "1.0",
            json!([{ "id": "a", "type": "InputNode", "condition": { "type": "SmellCondition" } }]),
            json!([]),
        );
        assert!(matches!(
            graph_from_json(&condition),
            Err(PixelgateError::UnknownTypeTag { kind: "condition", .. })
        ));

        let action = envelope(
            "1.0",
            json!([{ "id": "a", "type": "OutputNode", "action": { "type": "BeepAction" } }]),
            json!([]),
        );
        assert!(matches!(
            graph_from_json(&action),
            Err(PixelgateError::UnknownTypeTag { kind: "action", .. })
        ));
    }

    #[test]
    fn timer_durations_accept_floats() {
        let text = envelope(
            "1.0",
            json!([{
                "id": "t", "type": "TimerNode", "name": "T", "position": [0, 0],
                "timer_type": "TOF", "delay_time": 250.0, "time_on": 100, "time_off": 99.6
            }]),
            json!([]),
        );
        let graph = graph_from_json(&text).expect("load");
        let node = graph.node(&NodeId::from("t")).expect("timer");
        let NodeKind::Timer(timer) = node.kind() else {
            unreachable!("timer node expected");
        };
        assert_eq!(timer.timer_type, TimerType::Tof);
        assert_eq!(
            (timer.delay_time, timer.time_on, timer.time_off),
            (250, 100, 100)
        );

        let written = graph_to_json(&graph).expect("save");
        assert!(written.contains("\"delay_time\": 250"));
    }

    #[test]
    fn timer_and_wait_durations_are_seconds() {
        let text = json!({
            "version": "1.0",
            "type": "PixelPilot_Graph",
            "nodes": [
                {
                    "id": "i", "type": "InputNode", "name": "every", "position": [0, 0],
                    "condition": { "type": "TimerCondition", "interval_seconds": 1.5, "timer_id": "t" }
                },
                {
                    "id": "o", "type": "OutputNode", "name": "pause", "position": [0, 0],
                    "action": { "type": "WaitAction", "seconds": 0.2 }
                }
            ],
            "links": []
        })
        .to_string();
        let graph = graph_from_json(&text).expect("load");

        let NodeKind::Input { condition } = graph.node(&"i".into()).expect("input").kind() else {
            unreachable!("input node expected");
        };
        assert_eq!(
            condition,
            &Condition::Timer {
                interval_ms: 1500,
                timer_id: "t".to_string()
            }
        );
        let NodeKind::Output { action, .. } = graph.node(&"o".into()).expect("output").kind()
        else {
            unreachable!("output node expected");
        };
        assert_eq!(action, &Action::Wait { millis: 200 });

        let written = graph_to_json(&graph).expect("save");
        assert!(written.contains("\"interval_seconds\": 1.5"));
        assert!(written.contains("\"seconds\": 0.2"));
        assert!(written.contains("\"type\": \"PixelPilot_Graph\""));
    }

    #[test]
    fn negative_duration_is_malformed() {
        let text = envelope(
            "1.0",
            json!([{ "id": "t", "type": "TimerNode", "delay_time": -5 }]),
            json!([]),
        );
        assert!(matches!(
            graph_from_json(&text),
            Err(PixelgateError::MalformedDocument(_))
        ));
    }

    #[test]
    fn broken_link_is_surfaced() {
        let text = envelope(
            "1.0",
            json!([
                { "id": "a", "type": "ToggleNode", "name": "a", "position": [0, 0] },
                { "id": "b", "type": "ToggleNode", "name": "b", "position": [0, 0] }
            ]),
            json!([{
                "source_node_id": "a", "source_port": "Out",
                "target_node_id": "b", "target_port": "Nope"
            }]),
        );
        assert!(matches!(
            graph_from_json(&text),
            Err(PixelgateError::PortNotFound(_))
        ));
    }

    #[test]
    fn invalid_parameters_fail_validation() {
        let text = envelope(
            "1.0",
            json!([{
                "id": "a", "type": "InputNode", "name": "a", "position": [0, 0],
                "condition": { "type": "PixelColorCondition", "x": 99999, "y": 0, "target_rgb": [0, 0, 0] }
            }]),
            json!([]),
        );
        assert!(matches!(
            graph_from_json(&text),
            Err(PixelgateError::InvalidConfig(_))
        ));
    }

    #[test]
    fn memory_flag_only_written_when_set() {
        let mut graph = Graph::new();
        graph.add_node(Node::toggle("plain").with_id("a")).expect("a");
        graph
            .add_node(Node::toggle("latched").with_id("b").with_memory(true))
            .expect("b");
        let text = graph_to_json(&graph).expect("save");
        assert_eq!(text.matches("is_memory_node").count(), 1);

        let loaded = graph_from_json(&text).expect("load");
        assert!(loaded.node(&"b".into()).is_some_and(Node::is_memory_node));
        assert!(!loaded.node(&"a".into()).is_some_and(Node::is_memory_node));
    }

    #[test]
    fn serialization_is_deterministic() {
        let mut graph = Graph::new();
        let a = graph
            .add_node(Node::input("a", Condition::pixel(1, 2, Rgb(3, 4, 5))).with_id("a"))
            .expect("a");
        let b = graph
            .add_node(Node::process("b", LogicType::Xor).with_id("b"))
            .expect("b");
        graph.try_add_link(&a, "Out", &b, "In2").expect("link");

        let first = graph_to_json(&graph).expect("first");
        let second = graph_to_json(&graph_from_json(&first).expect("load")).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn process_ports_round_trip() {
        let mut graph = Graph::new();
        let id = graph
            .add_node(Node::process("wide", LogicType::And).with_id("p"))
            .expect("p");
        graph.add_input_port(&id, "In3").expect("port");
        let loaded = graph_from_json(&graph_to_json(&graph).expect("save")).expect("load");
        let names: Vec<&str> = loaded
            .node(&id)
            .expect("p")
            .inputs()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["In1", "In2", "In3"]);
    }
}
