//! # Engine
//!
//! Fixed-rate tick loop around one active graph and a list of legacy rules.
//!
//! ## Frame stages
//!
//! Each frame runs two independent stages in a fixed order:
//! 1. Graph stage: `Graph::execute_at` on the active graph
//! 2. Rule stage: `Rule::check_and_execute` for every legacy rule
//!
//! A panic inside either stage is caught and logged; the loop carries on.
//! A panic that escapes the loop itself stops the engine.
//!
//! ## Sharing
//!
//! The active graph, rules and device providers sit under one mutex that a
//! frame holds only long enough to clone their `Arc`s. Replacements take
//! effect on the next frame. Editors that mutate the running graph lock the
//! graph's own mutex, which serializes them with the tick.

use crate::config::EngineConfig;
use crate::graph::Graph;
use crate::node::TickContext;
use crate::providers::{InputProvider, VisionProvider};
use crate::rules::Rule;
use crate::{Blackboard, NodeId, PixelgateError};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// A graph shared between the engine and its editors.
pub type SharedGraph = Arc<Mutex<Graph>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// PUBLIC TYPES
// =============================================================================

/// Where the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// On the calling thread; `start` returns once the loop stops.
    Blocking,
    /// On a spawned thread; `start` returns immediately.
    Background,
}

/// Lifecycle state. `Stopped → Running ⇄ Paused → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Stopped = 0,
    Running = 1,
    Paused = 2,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Started,
    Paused,
    Resumed,
    Stopped,
    /// The loop fell more than one period behind and resynchronised.
    FrameDropped { missed: u64 },
    NodeFault { node: NodeId, error: PixelgateError },
    RuleFault { rule: String, error: PixelgateError },
    /// The active graph entered the cycle fallback.
    CycleFallback,
    /// The loop crashed; the engine is stopping.
    Fatal { message: String },
}

/// Counters since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub frames_dropped: u64,
    pub node_faults: u64,
    pub rule_faults: u64,
}

// =============================================================================
// SHARED STATE
// =============================================================================

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    frames_dropped: AtomicU64,
    node_faults: AtomicU64,
    rule_faults: AtomicU64,
}

#[derive(Clone, Default)]
struct ActiveSet {
    graph: Option<SharedGraph>,
    rules: Arc<Vec<Rule>>,
    vision: Option<Arc<dyn VisionProvider>>,
    input: Option<Arc<dyn InputProvider>>,
}

struct Shared {
    config: EngineConfig,
    blackboard: Arc<Blackboard>,
    active: Mutex<ActiveSet>,
    state: AtomicU8,
    stop_requested: AtomicBool,
    in_fallback: AtomicBool,
    /// Set on resume; the next graph stage rebases Timer nodes first.
    rebase_timers: AtomicBool,
    counters: Counters,
    subscribers: Mutex<Vec<Sender<EngineEvent>>>,
}

impl Shared {
    fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, from: EngineState, to: EngineState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Fan out to every subscriber without blocking. Full queues drop the
    /// event; disconnected subscribers are forgotten.
    fn emit(&self, event: EngineEvent) {
        lock(&self.subscribers).retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    fn process_frame(&self) {
        let active = lock(&self.active).clone();
        let now_ms = crate::clock::now_ms();
        let ctx = TickContext::new(&self.blackboard)
            .with_vision(active.vision.as_deref())
            .with_input(active.input.as_deref())
            .at(now_ms);

        if let Some(graph) = &active.graph {
            let stage = catch_unwind(AssertUnwindSafe(|| self.graph_stage(graph, &ctx)));
            if let Err(payload) = stage {
                tracing::error!(panic = %panic_message(payload.as_ref()), "graph stage panicked");
            }
        }

        let stage = catch_unwind(AssertUnwindSafe(|| self.rule_stage(&active.rules, &ctx)));
        if let Err(payload) = stage {
            tracing::error!(panic = %panic_message(payload.as_ref()), "rule stage panicked");
        }

        self.counters.ticks.fetch_add(1, Ordering::Relaxed);
    }

    fn graph_stage(&self, graph: &SharedGraph, ctx: &TickContext<'_>) {
        let mut graph = lock(graph);
        if self.rebase_timers.swap(false, Ordering::SeqCst) {
            graph.rebase_timers();
        }
        let report = graph.execute_at(ctx);
        drop(graph);

        let was_fallback = self.in_fallback.swap(report.fallback, Ordering::SeqCst);
        if report.fallback && !was_fallback {
            self.emit(EngineEvent::CycleFallback);
        }
        for fault in report.faults {
            self.counters.node_faults.fetch_add(1, Ordering::Relaxed);
            self.emit(EngineEvent::NodeFault {
                node: fault.node,
                error: fault.error,
            });
        }
    }

    fn rule_stage(&self, rules: &[Rule], ctx: &TickContext<'_>) {
        for rule in rules {
            if let Err(e) = rule.check_and_execute(ctx.blackboard, ctx.vision, ctx.input, ctx.now_ms)
            {
                tracing::warn!(rule = %rule.name, error = %e, "rule failed");
                self.counters.rule_faults.fetch_add(1, Ordering::Relaxed);
                self.emit(EngineEvent::RuleFault {
                    rule: rule.name.clone(),
                    error: e,
                });
            }
        }
    }

    fn frame_loop(&self) {
        let period = self.config.frame_period();
        let mut deadline = Instant::now();

        while !self.stop_requested.load(Ordering::SeqCst) {
            deadline += period;
            if self.state() == EngineState::Running {
                self.process_frame();
            }

            let now = Instant::now();
            match deadline.checked_duration_since(now) {
                Some(wait) => thread::sleep(wait),
                None => {
                    let lag = now.duration_since(deadline);
                    if lag > period {
                        let missed = u64::try_from(lag.as_nanos() / period.as_nanos().max(1))
                            .unwrap_or(u64::MAX);
                        self.counters
                            .frames_dropped
                            .fetch_add(missed, Ordering::Relaxed);
                        let lag_ms = u64::try_from(lag.as_millis()).unwrap_or(u64::MAX);
                        tracing::warn!(missed, lag_ms, "frame overrun, resynchronising");
                        self.emit(EngineEvent::FrameDropped { missed });
                        deadline = now;
                    }
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Marks the engine stopped whenever the loop exits, however it exits.
struct LoopGuard<'a> {
    shared: &'a Shared,
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.shared
            .state
            .store(EngineState::Stopped as u8, Ordering::SeqCst);
        tracing::info!("engine stopped");
        self.shared.emit(EngineEvent::Stopped);
    }
}

fn run_loop(shared: &Shared) {
    let _guard = LoopGuard { shared };
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| shared.frame_loop())) {
        let message = panic_message(payload.as_ref());
        tracing::error!(panic = %message, "engine loop crashed");
        shared.emit(EngineEvent::Fatal { message });
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Owner of the tick loop.
pub struct Engine {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    /// Create a stopped engine with its own blackboard.
    pub fn new(config: EngineConfig) -> Result<Self, PixelgateError> {
        Self::with_blackboard(config, Arc::new(Blackboard::new()))
    }

    /// Create a stopped engine sharing an existing blackboard.
    pub fn with_blackboard(
        config: EngineConfig,
        blackboard: Arc<Blackboard>,
    ) -> Result<Self, PixelgateError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                blackboard,
                active: Mutex::new(ActiveSet::default()),
                state: AtomicU8::new(EngineState::Stopped as u8),
                stop_requested: AtomicBool::new(false),
                in_fallback: AtomicBool::new(false),
                rebase_timers: AtomicBool::new(false),
                counters: Counters::default(),
                subscribers: Mutex::new(Vec::new()),
            }),
            handle: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn blackboard(&self) -> &Arc<Blackboard> {
        &self.shared.blackboard
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Start the loop. A no-op while already running or paused.
    pub fn start(&self, mode: RunMode) -> Result<(), PixelgateError> {
        if !self
            .shared
            .transition(EngineState::Stopped, EngineState::Running)
        {
            return Ok(());
        }
        // A previous background loop has exited; reap it.
        if let Some(old) = lock(&self.handle).take() {
            let _ = old.join();
        }
        self.shared.stop_requested.store(false, Ordering::SeqCst);
        tracing::info!(
            target_hz = self.shared.config.target_hz,
            ?mode,
            "engine started"
        );
        self.shared.emit(EngineEvent::Started);

        match mode {
            RunMode::Blocking => {
                run_loop(&self.shared);
                Ok(())
            }
            RunMode::Background => {
                let shared = Arc::clone(&self.shared);
                let spawned = thread::Builder::new()
                    .name("pixelgate-engine".to_string())
                    .spawn(move || run_loop(&shared));
                match spawned {
                    Ok(handle) => {
                        *lock(&self.handle) = Some(handle);
                        Ok(())
                    }
                    Err(e) => {
                        self.shared
                            .state
                            .store(EngineState::Stopped as u8, Ordering::SeqCst);
                        Err(PixelgateError::EngineStart(e.to_string()))
                    }
                }
            }
        }
    }

    /// Request the loop to stop and wait for a background loop to exit.
    ///
    /// Called from the loop thread itself, it only raises the stop flag.
    pub fn stop(&self) -> Result<(), PixelgateError> {
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return Ok(());
            }
            handle
                .join()
                .map_err(|_| PixelgateError::EngineStop("engine thread panicked".to_string()))?;
        }
        Ok(())
    }

    /// Skip frame processing while keeping the loop on schedule.
    pub fn pause(&self) {
        if self
            .shared
            .transition(EngineState::Running, EngineState::Paused)
        {
            tracing::info!("engine paused");
            self.shared.emit(EngineEvent::Paused);
        }
    }

    /// Continue processing frames. Timer nodes do not count the paused span.
    pub fn resume(&self) {
        if self.shared.state() != EngineState::Paused {
            return;
        }
        self.shared.rebase_timers.store(true, Ordering::SeqCst);
        if self
            .shared
            .transition(EngineState::Paused, EngineState::Running)
        {
            tracing::info!("engine resumed");
            self.shared.emit(EngineEvent::Resumed);
        }
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.shared.state()
    }

    /// True while the loop is alive, paused or not.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() != EngineState::Stopped
    }

    /// Run one frame on the calling thread, whatever the loop state.
    pub fn process_frame(&self) {
        self.shared.process_frame();
    }

    // -------------------------------------------------------------------------
    // Active set
    // -------------------------------------------------------------------------

    /// Install (or clear) the graph run by the graph stage.
    ///
    /// The engine's node limit is applied to the graph; an oversized graph
    /// is rejected and the previous one stays active.
    pub fn set_graph(&self, graph: Option<SharedGraph>) -> Result<(), PixelgateError> {
        if let Some(graph) = &graph {
            lock(graph).set_max_nodes(self.shared.config.max_graph_nodes)?;
        }
        lock(&self.shared.active).graph = graph;
        self.shared.in_fallback.store(false, Ordering::SeqCst);
        Ok(())
    }

    #[must_use]
    pub fn graph(&self) -> Option<SharedGraph> {
        lock(&self.shared.active).graph.clone()
    }

    pub fn add_rule(&self, rule: Rule) {
        Arc::make_mut(&mut lock(&self.shared.active).rules).push(rule);
    }

    pub fn set_rules(&self, rules: Vec<Rule>) {
        lock(&self.shared.active).rules = Arc::new(rules);
    }

    pub fn clear_rules(&self) {
        self.set_rules(Vec::new());
    }

    #[must_use]
    pub fn rules(&self) -> Arc<Vec<Rule>> {
        Arc::clone(&lock(&self.shared.active).rules)
    }

    pub fn set_vision_provider(&self, vision: Option<Arc<dyn VisionProvider>>) {
        lock(&self.shared.active).vision = vision;
    }

    pub fn set_input_provider(&self, input: Option<Arc<dyn InputProvider>>) {
        lock(&self.shared.active).input = input;
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let c = &self.shared.counters;
        EngineStats {
            ticks: c.ticks.load(Ordering::Relaxed),
            frames_dropped: c.frames_dropped.load(Ordering::Relaxed),
            node_faults: c.node_faults.load(Ordering::Relaxed),
            rule_faults: c.rule_faults.load(Ordering::Relaxed),
        }
    }

    /// New event receiver with a bounded queue.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = crossbeam_channel::bounded(self.shared.config.event_queue_capacity);
        lock(&self.shared.subscribers).push(tx);
        rx
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::error!(error = %e, "engine shutdown failed");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{LogicType, Node, NodeKind, TimerType};
    use crate::{Action, Condition, Region, Rgb};
    use serde_json::Value;
    use std::time::Duration;

    fn engine(target_hz: u32) -> Engine {
        Engine::new(EngineConfig::default().with_target_hz(target_hz)).expect("engine")
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let give_up = Instant::now() + Duration::from_secs(3);
        while Instant::now() < give_up {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn drain(rx: &Receiver<EngineEvent>) -> Vec<EngineEvent> {
        rx.try_iter().collect()
    }

    /// Key "go" held → SetState fired=true.
    fn key_to_state_graph() -> SharedGraph {
        let mut graph = Graph::new();
        let input = graph
            .add_node(Node::input(
                "go?",
                Condition::KeyPress {
                    key_code: "go".to_string(),
                },
            ))
            .expect("input");
        let output = graph
            .add_node(Node::output(
                "fire",
                Action::SetState {
                    key: "fired".to_string(),
                    value: Value::Bool(true),
                },
            ))
            .expect("output");
        graph
            .try_add_link(&input, "Out", &output, "Trig")
            .expect("link");
        Arc::new(Mutex::new(graph))
    }

    #[test]
    fn background_loop_runs_graph() {
        let engine = engine(200);
        engine.set_graph(Some(key_to_state_graph())).expect("graph");
        engine.start(RunMode::Background).expect("start");
        assert!(engine.is_running());

        engine.blackboard().set("key_pressed_go", true);
        assert!(wait_until(|| engine.blackboard().exists("fired")));

        engine.stop().expect("stop");
        assert!(!engine.is_running());
        assert!(engine.stats().ticks > 0);
    }

    #[test]
    fn start_is_idempotent_and_events_are_ordered() {
        let engine = engine(200);
        let rx = engine.subscribe();
        engine.start(RunMode::Background).expect("start");
        engine.start(RunMode::Background).expect("second start");
        engine.pause();
        assert_eq!(engine.state(), EngineState::Paused);
        engine.pause();
        engine.resume();
        engine.stop().expect("stop");

        assert_eq!(
            drain(&rx),
            vec![
                EngineEvent::Started,
                EngineEvent::Paused,
                EngineEvent::Resumed,
                EngineEvent::Stopped
            ]
        );
    }

    #[test]
    fn paused_engine_skips_frames() {
        let engine = engine(200);
        engine.start(RunMode::Background).expect("start");
        engine.pause();
        // Let a frame that was already in flight finish.
        thread::sleep(Duration::from_millis(20));
        let before = engine.stats().ticks;
        thread::sleep(Duration::from_millis(50));
        assert_eq!(engine.stats().ticks, before);
        assert!(engine.is_running());

        engine.resume();
        assert!(wait_until(|| engine.stats().ticks > before));
        engine.stop().expect("stop");
    }

    #[test]
    fn blocking_mode_stops_from_another_thread() {
        let engine = Arc::new(engine(100));
        let stopper = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                engine.stop().expect("stop");
            })
        };
        engine.start(RunMode::Blocking).expect("run");
        assert!(!engine.is_running());
        stopper.join().expect("stopper");
    }

    #[test]
    fn engine_can_restart_after_stop() {
        let engine = engine(200);
        engine.start(RunMode::Background).expect("start");
        engine.stop().expect("stop");
        engine.start(RunMode::Background).expect("restart");
        assert!(engine.is_running());
        engine.stop().expect("stop again");
        assert!(!engine.is_running());
    }

    #[test]
    fn overrun_is_reported_as_frame_drop() {
        let engine = engine(100);
        let rx = engine.subscribe();
        engine.add_rule(Rule::new("slow", crate::RuleLogic::And).then(Action::Wait { millis: 40 }));
        engine.start(RunMode::Background).expect("start");
        assert!(wait_until(|| engine.stats().frames_dropped > 0));
        engine.stop().expect("stop");

        assert!(
            drain(&rx)
                .iter()
                .any(|e| matches!(e, EngineEvent::FrameDropped { missed } if *missed >= 1))
        );
    }

    #[test]
    fn rule_faults_are_counted_and_forwarded() {
        let engine = engine(30);
        let rx = engine.subscribe();
        engine.add_rule(Rule::new("bad", crate::RuleLogic::And).then(Action::key("x")));
        engine.add_rule(Rule::new("good", crate::RuleLogic::And).then(Action::SetState {
            key: "good".to_string(),
            value: Value::Bool(true),
        }));

        struct Unplugged;
        impl InputProvider for Unplugged {
            fn press_key(&self, _code: &str) -> Result<(), PixelgateError> {
                Err(PixelgateError::Provider("unplugged".to_string()))
            }
            fn click_mouse(
                &self,
                _x: i32,
                _y: i32,
                _button: crate::MouseButton,
            ) -> Result<(), PixelgateError> {
                Ok(())
            }
            fn move_mouse(&self, _x: i32, _y: i32) -> Result<(), PixelgateError> {
                Ok(())
            }
        }
        engine.set_input_provider(Some(Arc::new(Unplugged)));

        engine.process_frame();
        assert_eq!(engine.stats().rule_faults, 1);
        assert!(engine.blackboard().exists("good"));
        assert!(matches!(
            drain(&rx).as_slice(),
            [EngineEvent::RuleFault { rule, .. }] if rule == "bad"
        ));

        engine.clear_rules();
        assert!(engine.rules().is_empty());
    }

    #[test]
    fn paused_span_is_not_timed() {
        let accumulated = |graph: &SharedGraph| match lock(graph).node(&"t".into()).map(Node::kind) {
            Some(NodeKind::Timer(timer)) => timer.accumulator(),
            _ => 0,
        };
        // TOF with a released trigger accumulates every tick and never expires.
        let mut timer = Node::timer("idle", TimerType::Tof).with_id("t");
        if let NodeKind::Timer(state) = timer.kind_mut() {
            state.delay_time = u64::MAX;
        }
        let mut graph = Graph::new();
        graph.add_node(timer).expect("timer");
        let graph: SharedGraph = Arc::new(Mutex::new(graph));

        let engine = engine(200);
        engine.set_graph(Some(Arc::clone(&graph))).expect("graph");
        engine.start(RunMode::Background).expect("start");
        assert!(wait_until(|| engine.stats().ticks >= 3));
        engine.pause();
        thread::sleep(Duration::from_millis(20));
        let before = accumulated(&graph);

        thread::sleep(Duration::from_millis(400));
        let resumed_at = engine.stats().ticks;
        engine.resume();
        assert!(wait_until(|| engine.stats().ticks >= resumed_at + 3));
        engine.pause();
        thread::sleep(Duration::from_millis(20));
        let timed = accumulated(&graph).saturating_sub(before);
        engine.stop().expect("stop");

        assert!(timed < 300, "paused span was timed: {} ms", timed);
    }

    #[test]
    fn cycle_fallback_is_announced_once() {
        let engine = engine(30);
        let rx = engine.subscribe();
        let mut graph = Graph::new();
        let a = graph
            .add_node(Node::process("a", LogicType::Or))
            .expect("a");
        let b = graph
            .add_node(Node::process("b", LogicType::Or))
            .expect("b");
        graph.try_add_link(&a, "Out", &b, "In1").expect("link");
        graph.try_add_link(&b, "Out", &a, "In1").expect("link");
        engine
            .set_graph(Some(Arc::new(Mutex::new(graph))))
            .expect("graph");

        engine.process_frame();
        engine.process_frame();
        assert_eq!(drain(&rx), vec![EngineEvent::CycleFallback]);
    }

    #[test]
    fn oversized_graph_is_rejected() {
        let config = EngineConfig {
            max_graph_nodes: 1,
            ..EngineConfig::default()
        };
        let engine = Engine::new(config).expect("engine");
        let mut graph = Graph::new();
        graph.add_node(Node::toggle("a")).expect("a");
        graph.add_node(Node::toggle("b")).expect("b");

        assert_eq!(
            engine.set_graph(Some(Arc::new(Mutex::new(graph)))),
            Err(PixelgateError::GraphTooLarge { limit: 1 })
        );
        assert!(engine.graph().is_none());
    }

    #[test]
    #[allow(clippy::panic)]
    fn panicking_provider_does_not_kill_the_frame() {
        struct Exploding;
        impl VisionProvider for Exploding {
            fn get_pixel(&self, _x: i32, _y: i32) -> Option<Rgb> {
                panic!("capture device vanished")
            }
            fn search_color(&self, _r: Region, _t: Rgb, _tol: u32) -> Option<(i32, i32)> {
                None
            }
        }

        let engine = engine(30);
        let mut graph = Graph::new();
        graph
            .add_node(Node::input("pixel", Condition::pixel(1, 1, Rgb(0, 0, 0))))
            .expect("input");
        engine
            .set_graph(Some(Arc::new(Mutex::new(graph))))
            .expect("graph");
        engine.set_vision_provider(Some(Arc::new(Exploding)));
        engine.add_rule(Rule::new("after", crate::RuleLogic::And).then(Action::SetState {
            key: "rules_ran".to_string(),
            value: Value::Bool(true),
        }));

        engine.process_frame();
        engine.process_frame();
        assert_eq!(engine.stats().ticks, 2);
        assert!(engine.blackboard().exists("rules_ran"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(Engine::new(EngineConfig::default().with_target_hz(0)).is_err());
    }
}
