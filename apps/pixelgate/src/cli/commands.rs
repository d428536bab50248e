//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use crate::dry_run::{DryRunInput, DryRunVision};
use pixelgate_core::{
    Action, Condition, Engine, EngineEvent, Graph, InputProvider, LogicType, MouseButton, Node,
    PixelgateError, Rgb, RunMode, ScheduleStatus, TimerType, VisionProvider, graph_from_json,
    graph_to_json,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// =============================================================================
// FILE LIMITS
// =============================================================================

/// Maximum size of a graph document (16 MiB).
///
/// Checked before the file is read.
pub const MAX_GRAPH_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// How often the runner checks its stop conditions and drains events.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), PixelgateError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| PixelgateError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(PixelgateError::MalformedDocument(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Canonicalize an input path and require a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, PixelgateError> {
    let canonical = path.canonicalize().map_err(|e| {
        PixelgateError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(PixelgateError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Canonicalize the parent directory of an output path.
fn validate_output_path(path: &Path) -> Result<PathBuf, PixelgateError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        PixelgateError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(PixelgateError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| PixelgateError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

/// Read and parse a graph document.
pub fn load_graph(path: &Path) -> Result<Graph, PixelgateError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_GRAPH_FILE_SIZE)?;

    let text = std::fs::read_to_string(&validated)
        .map_err(|e| PixelgateError::IoError(format!("Read graph: {}", e)))?;
    let graph = graph_from_json(&text)?;

    tracing::debug!(
        path = %validated.display(),
        nodes = graph.node_count(),
        links = graph.link_count(),
        "graph loaded"
    );
    Ok(graph)
}

fn schedule_name(status: ScheduleStatus) -> &'static str {
    match status {
        ScheduleStatus::Ordered => "ordered",
        ScheduleStatus::Cyclic => "cyclic",
        ScheduleStatus::Stale => "stale",
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StopReason {
    Ticks,
    Duration,
    Interrupt,
}

/// Counters reported when a run ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub reason: StopReason,
    pub ticks: u64,
    pub frames_dropped: u64,
    pub node_faults: u64,
    pub rule_faults: u64,
    /// Actions received by the dry-run input provider.
    pub actions: u64,
}

/// Run `graph` in a background engine until a tick count, a duration or
/// Ctrl+C, whichever comes first.
///
/// A crashed tick loop is reported as `EngineStop`.
pub async fn run_graph(
    graph: Graph,
    config: &AppConfig,
    ticks: Option<u64>,
    duration_ms: Option<u64>,
) -> Result<RunSummary, PixelgateError> {
    let engine = Engine::new(config.engine.clone())?;
    engine.set_graph(Some(Arc::new(Mutex::new(graph))))?;

    let input = Arc::new(DryRunInput::new());
    let vision: Arc<dyn VisionProvider> = Arc::new(DryRunVision);
    let shared_input: Arc<dyn InputProvider> = input.clone();
    engine.set_vision_provider(Some(vision));
    engine.set_input_provider(Some(shared_input));

    let events = engine.subscribe();
    engine.start(RunMode::Background)?;

    let started = Instant::now();
    let limit = duration_ms.map(Duration::from_millis);
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(interrupt);
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    let mut fatal: Option<String> = None;

    let reason = loop {
        tokio::select! {
            () = &mut interrupt => {
                tracing::info!("interrupted");
                break StopReason::Interrupt;
            }
            _ = poll.tick() => {
                while let Ok(event) = events.try_recv() {
                    tracing::debug!(event = ?event, "engine event");
                    if let EngineEvent::Fatal { message } = event {
                        fatal = Some(message);
                    }
                }
                if let Some(message) = fatal.take() {
                    return Err(PixelgateError::EngineStop(message));
                }
                if !engine.is_running() {
                    return Err(PixelgateError::EngineStop(
                        "tick loop exited unexpectedly".to_string(),
                    ));
                }
                if ticks.is_some_and(|n| engine.stats().ticks >= n) {
                    break StopReason::Ticks;
                }
                if limit.is_some_and(|limit| started.elapsed() >= limit) {
                    break StopReason::Duration;
                }
            }
        }
    };

    engine.stop()?;
    let stats = engine.stats();

    Ok(RunSummary {
        reason,
        ticks: stats.ticks,
        frames_dropped: stats.frames_dropped,
        node_faults: stats.node_faults,
        rule_faults: stats.rule_faults,
        actions: input.action_count(),
    })
}

/// Run a graph file with the dry-run providers.
pub async fn cmd_run(
    path: &Path,
    config: &AppConfig,
    json_mode: bool,
    ticks: Option<u64>,
    duration_ms: Option<u64>,
) -> Result<(), PixelgateError> {
    let graph = load_graph(path)?;
    tracing::info!(
        path = %path.display(),
        nodes = graph.node_count(),
        hz = config.engine.target_hz,
        "running graph"
    );

    if !json_mode && ticks.is_none() && duration_ms.is_none() {
        println!("Running {:?} at {} Hz", path, config.engine.target_hz);
        println!("Press Ctrl+C to stop");
    }

    let summary = run_graph(graph, config, ticks, duration_ms).await?;

    if json_mode {
        print_json(&serde_json::to_value(&summary).unwrap_or_default());
        return Ok(());
    }

    println!("pixelgate Run Summary");
    println!("=====================");
    println!("Stopped by:     {:?}", summary.reason);
    println!("Ticks:          {}", summary.ticks);
    println!("Frames dropped: {}", summary.frames_dropped);
    println!("Node faults:    {}", summary.node_faults);
    println!("Rule faults:    {}", summary.rule_faults);
    println!("Actions:        {}", summary.actions);

    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Load a graph and report whether it has a proper execution order.
///
/// Fails on unreadable or invalid documents and on unbreakable cycles.
pub fn cmd_validate(path: &Path, json_mode: bool) -> Result<(), PixelgateError> {
    let mut graph = load_graph(path)?;
    let order = graph.execution_order();
    let status = graph.schedule_status();

    if json_mode {
        let unresolved = match &order {
            Err(PixelgateError::UnbreakableCycle { unresolved }) => unresolved
                .iter()
                .map(|id| id.as_str().to_string())
                .collect(),
            _ => Vec::new(),
        };
        print_json(&serde_json::json!({
            "graph": path.to_string_lossy(),
            "valid": order.is_ok(),
            "nodes": graph.node_count(),
            "links": graph.link_count(),
            "schedule": schedule_name(status),
            "unresolved": unresolved,
        }));
    } else {
        match &order {
            Ok(_) => println!(
                "OK: {} nodes, {} links, schedule {}",
                graph.node_count(),
                graph.link_count(),
                schedule_name(status)
            ),
            Err(e) => println!("INVALID: {}", e),
        }
    }

    order.map(|_| ())
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

#[derive(Debug, Serialize)]
struct NodeRow {
    id: String,
    #[serde(rename = "type")]
    node_type: &'static str,
    name: String,
    memory: bool,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// Print the node table, links and execution order of a graph.
///
/// Cyclic graphs are reported, not rejected.
pub fn cmd_inspect(path: &Path, json_mode: bool) -> Result<(), PixelgateError> {
    let mut graph = load_graph(path)?;
    let order = graph.execution_order();

    let rows: Vec<NodeRow> = graph
        .nodes()
        .map(|node| NodeRow {
            id: node.id().as_str().to_string(),
            node_type: node.tag(),
            name: node.name.clone(),
            memory: node.is_memory_node(),
            inputs: node.inputs().iter().map(|p| p.name().to_string()).collect(),
            outputs: node.outputs().iter().map(|p| p.name().to_string()).collect(),
        })
        .collect();
    let links: Vec<String> = graph
        .links()
        .map(|l| format!("{} -> {}", l.source, l.target))
        .collect();

    if json_mode {
        let order_json = match &order {
            Ok(order) => serde_json::json!(order.iter().map(|id| id.as_str()).collect::<Vec<_>>()),
            Err(_) => serde_json::Value::Null,
        };
        print_json(&serde_json::json!({
            "nodes": rows,
            "links": links,
            "schedule": schedule_name(graph.schedule_status()),
            "order": order_json,
        }));
        return Ok(());
    }

    println!("Nodes ({})", rows.len());
    println!("=========");
    for row in &rows {
        let memory = if row.memory { " [memory]" } else { "" };
        println!(
            "  {:<38} {:<12} {}{}",
            row.id, row.node_type, row.name, memory
        );
        println!(
            "  {:<38} in: [{}] out: [{}]",
            "",
            row.inputs.join(", "),
            row.outputs.join(", ")
        );
    }

    println!();
    println!("Links ({})", links.len());
    println!("=========");
    for link in &links {
        println!("  {}", link);
    }

    println!();
    match order {
        Ok(order) => {
            println!("Execution order");
            println!("===============");
            for (i, id) in order.iter().enumerate() {
                println!("  {:>3}. {}", i + 1, id);
            }
        }
        Err(e) => println!("No execution order: {} (fallback passes apply)", e),
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// A small armed-clicker graph using every node type.
///
/// F8 arms a toggle; while armed and the screen centre is red for one
/// second, the target is clicked once.
pub fn starter_graph() -> Result<Graph, PixelgateError> {
    let mut graph = Graph::new();

    let hotkey = graph.add_node(
        Node::input(
            "Hotkey F8",
            Condition::KeyPress {
                key_code: "f8".to_string(),
            },
        )
        .with_id("hotkey")
        .with_position(40.0, 40.0),
    )?;
    let target = graph.add_node(
        Node::input("Target visible", Condition::pixel(960, 540, Rgb(255, 0, 0)))
            .with_id("target")
            .with_position(40.0, 200.0),
    )?;
    let armed = graph.add_node(
        Node::toggle("Armed")
            .with_id("armed")
            .with_position(240.0, 40.0),
    )?;
    let gate = graph.add_node(
        Node::process("Armed and visible", LogicType::And)
            .with_id("gate")
            .with_position(440.0, 120.0),
    )?;
    let settle = graph.add_node(
        Node::timer("Settle", TimerType::Ton)
            .with_id("settle")
            .with_position(640.0, 120.0),
    )?;
    let filter = graph.add_node(
        Node::group("Pass-through")
            .with_id("filter")
            .with_position(840.0, 120.0),
    )?;
    let fire = graph.add_node(
        Node::output(
            "Click target",
            Action::MouseClick {
                x: 960,
                y: 540,
                button: MouseButton::Left,
            },
        )
        .with_id("fire")
        .with_position(1040.0, 120.0),
    )?;

    let inner_in = graph.add_external_input(&filter, "In")?;
    let inner_out = graph.add_external_output(&filter, "Out")?;
    let group = graph
        .node_mut(&filter)
        .and_then(Node::group_state_mut)
        .ok_or_else(|| PixelgateError::NodeNotFound(filter.clone()))?;
    let sub_graph = group.sub_graph_mut();
    let pass = sub_graph.add_node(Node::process("Pass", LogicType::Or).with_id("pass"))?;
    sub_graph.try_add_link(&inner_in, "Out", &pass, "In1")?;
    sub_graph.try_add_link(&pass, "Out", &inner_out, "In")?;

    graph.try_add_link(&hotkey, "Out", &armed, "Trigger")?;
    graph.try_add_link(&armed, "Out", &gate, "In1")?;
    graph.try_add_link(&target, "Out", &gate, "In2")?;
    graph.try_add_link(&gate, "Out", &settle, "In")?;
    graph.try_add_link(&settle, "Out", &filter, "In")?;
    graph.try_add_link(&filter, "Out", &fire, "Trig")?;

    Ok(graph)
}

/// Write the starter graph to `output`.
pub fn cmd_init(output: &Path, force: bool) -> Result<(), PixelgateError> {
    if output.exists() && !force {
        return Err(PixelgateError::IoError(format!(
            "'{}' already exists. Use --force to overwrite.",
            output.display()
        )));
    }

    let validated_output = validate_output_path(output)?;
    let graph = starter_graph()?;
    let text = graph_to_json(&graph)?;

    std::fs::write(&validated_output, &text)
        .map_err(|e| PixelgateError::IoError(format!("Write file: {}", e)))?;

    println!(
        "Wrote starter graph ({} nodes, {} links) to {:?}",
        graph.node_count(),
        graph.link_count(),
        validated_output
    );

    Ok(())
}
