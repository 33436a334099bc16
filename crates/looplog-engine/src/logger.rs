//! The cycle coordinator.
//!
//! A [`Logger`] owns the live [`Table`] and drives it through each control
//! loop iteration:
//!
//! ```text
//! start() ──> cycle_before_user() ──> user code ──> cycle_after_user() ─┐
//!                   ^                                                   │
//!                   └───────────────────────────────────────────────────┘
//! ```
//!
//! In live mode `cycle_before_user` stamps the table from the time source;
//! in replay mode it asks the replay source for the next recorded cycle
//! and stops the logger once the recording is exhausted.
//! `cycle_after_user` records the built-in timing outputs and hands a clone
//! of the table to the [`SinkPipeline`].

use std::time::Duration;

use indexmap::IndexMap;
use looplog_core::{LogSink, LoggableInputs, ReplaySource, StructCodec, Table, Value};

use crate::config::{ConfigError, LoggerConfig};
use crate::console::{normalize_console, ConsoleSource};
use crate::pipeline::{EnqueueError, SinkPipeline};
use crate::timing::{MonotonicClock, TimeSource, TimeUnit, TimedSpan};

/// Output root while capturing live data.
pub const REAL_OUTPUTS: &str = "RealOutputs";
/// Output root while replaying.
pub const REPLAY_OUTPUTS: &str = "ReplayOutputs";
/// Metadata root while capturing live data.
pub const REAL_METADATA: &str = "RealMetadata";
/// Metadata root while replaying.
pub const REPLAY_METADATA: &str = "ReplayMetadata";

// ── SessionReport ────────────────────────────────────────────────

/// Summary of one session, returned by [`Logger::end`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionReport {
    /// Cycles handed to the sink worker.
    pub cycles_enqueued: u64,
    /// Cycles dropped because the queue was full.
    pub cycles_dropped: u64,
    /// Whether the sink worker was joined cleanly.
    pub worker_joined: bool,
}

// ── RunState ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Stopped,
    Live,
    Replay,
}

// ── Logger ───────────────────────────────────────────────────────

/// Records, or replays, one control loop's per-cycle state.
///
/// Configuration calls ([`add_sink`](Self::add_sink),
/// [`set_replay_source`](Self::set_replay_source),
/// [`record_metadata`](Self::record_metadata)) only take effect while
/// stopped. Logging faults never stop the control loop: the only way a
/// running logger stops on its own is an exhausted replay source.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use looplog_engine::{Logger, LoggerConfig};
///
/// let mut logger = Logger::new(LoggerConfig::default()).unwrap();
/// let mut tick = 0u32;
/// logger.set_time_source(move || {
///     tick += 1;
///     f64::from(tick) * 0.02
/// });
/// logger.start().unwrap();
/// logger.cycle_after_user(Duration::ZERO, Duration::ZERO);
///
/// for _ in 0..3 {
///     logger.cycle_before_user();
///     logger.record_output("Arm/Angle", 0.25);
///     logger.cycle_after_user(Duration::from_millis(2), Duration::ZERO);
/// }
/// assert!((logger.timestamp() - 0.08).abs() < 1e-12);
///
/// let report = logger.end();
/// assert_eq!(report.cycles_enqueued, 4);
/// assert!(!logger.is_running());
/// ```
pub struct Logger {
    config: LoggerConfig,
    state: RunState,
    entry: Table,
    metadata: IndexMap<String, String>,
    time_source: Box<dyn TimeSource>,
    replay_source: Option<Box<dyn ReplaySource>>,
    console: Option<Box<dyn ConsoleSource>>,
    capture_console: bool,
    pipeline: SinkPipeline,
    cycle_count: u64,
    queue_fault: bool,
}

impl Logger {
    /// Create a stopped logger.
    pub fn new(config: LoggerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: LoggerConfig) -> Self {
        Self {
            state: RunState::Stopped,
            entry: Table::new(0.0),
            metadata: IndexMap::new(),
            time_source: Box::new(MonotonicClock::new()),
            replay_source: None,
            console: None,
            capture_console: config.capture_console,
            pipeline: SinkPipeline::new(config.queue_capacity),
            cycle_count: 0,
            queue_fault: false,
            config,
        }
    }

    // ── Configuration ────────────────────────────────────────────

    /// Replace the time source. The default measures seconds since
    /// construction (or the last [`reset`](Self::reset)).
    pub fn set_time_source(&mut self, source: impl TimeSource + 'static) {
        self.time_source = Box::new(source);
    }

    /// Use `source` for replay on the next start. Ignored while running.
    pub fn set_replay_source(&mut self, source: Box<dyn ReplaySource>) {
        if self.is_running() {
            log::warn!("replay source can only be set before start");
            return;
        }
        self.replay_source = Some(source);
    }

    /// Drop the configured replay source. Ignored while running.
    pub fn clear_replay_source(&mut self) {
        if !self.is_running() {
            self.replay_source = None;
        }
    }

    /// Register a sink. Ignored while running.
    pub fn add_sink(&mut self, sink: Box<dyn LogSink>) {
        if self.is_running() {
            log::warn!("sinks can only be added before start");
            return;
        }
        self.pipeline.add_sink(sink);
    }

    /// Record a metadata value, written on the next start. Ignored while
    /// running.
    pub fn record_metadata(&mut self, key: &str, value: &str) {
        if self.is_running() {
            return;
        }
        self.metadata.insert(key.to_owned(), value.to_owned());
    }

    /// Capture console text from `console` until the session ends.
    /// Ignored while running.
    pub fn set_console_source(&mut self, console: Box<dyn ConsoleSource>) {
        if self.is_running() {
            return;
        }
        self.console = Some(console);
    }

    /// Stop recording console text.
    pub fn disable_console_capture(&mut self) {
        self.capture_console = false;
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start the session and run the first before-user step.
    ///
    /// The mode is replay if a replay source was set, live otherwise.
    /// Calling `start` while running is a no-op.
    pub fn start(&mut self) -> Result<(), ConfigError> {
        if self.is_running() {
            return Ok(());
        }
        self.pipeline.start()?;
        self.queue_fault = false;

        let metadata_root = match self.replay_source.as_mut() {
            Some(source) => {
                source.start();
                self.state = RunState::Replay;
                REPLAY_METADATA
            }
            None => {
                self.state = RunState::Live;
                REAL_METADATA
            }
        };
        let mut metadata = self.entry.subtable(metadata_root);
        for (key, value) in &self.metadata {
            metadata.put(key, value.as_str());
        }
        log::info!(
            "logger started in {} mode",
            if self.is_replay() { "replay" } else { "live" }
        );

        self.cycle_before_user();
        Ok(())
    }

    /// Stop the session: close console capture, end the replay source,
    /// let the sink worker drain and join it.
    ///
    /// A later [`start`](Self::start) begins a new session with the same
    /// sinks. The console source is closed and released, so a new session
    /// needs a fresh one from [`set_console_source`](Self::set_console_source).
    /// Calling `end` while stopped returns an empty report.
    pub fn end(&mut self) -> SessionReport {
        if !self.is_running() {
            return SessionReport {
                cycles_enqueued: 0,
                cycles_dropped: 0,
                worker_joined: true,
            };
        }
        self.state = RunState::Stopped;

        if let Some(mut console) = self.console.take() {
            if let Err(e) = console.close() {
                log::error!("failed to stop console capture: {e}");
            }
        }
        if let Some(source) = self.replay_source.as_mut() {
            source.end();
        }
        let worker_joined = self.pipeline.stop();
        let report = SessionReport {
            cycles_enqueued: self.pipeline.enqueued(),
            cycles_dropped: self.pipeline.dropped(),
            worker_joined,
        };
        log::info!(
            "logger stopped: {} cycles logged, {} dropped",
            report.cycles_enqueued,
            report.cycles_dropped
        );
        report
    }

    /// End any session and restore the logger to its construction-time
    /// configuration: no sinks, no replay source, no metadata, a fresh
    /// table, and a fresh default clock.
    pub fn reset(&mut self) {
        self.end();
        *self = Self::from_valid(self.config.clone());
    }

    // ── Cycle ────────────────────────────────────────────────────

    /// Advance to the next cycle before user code runs.
    ///
    /// Live: stamp the table from the time source. Replay: load the next
    /// recorded cycle, or stop the logger if the recording is exhausted.
    pub fn cycle_before_user(&mut self) {
        self.cycle_count += 1;
        match self.state {
            RunState::Stopped => {}
            RunState::Live => {
                let now = self.time_source.now();
                self.entry.set_timestamp(now);
            }
            RunState::Replay => {
                let updated = match self.replay_source.as_mut() {
                    Some(source) => source.update(&mut self.entry),
                    None => false,
                };
                if !updated {
                    log::info!("replay source exhausted, ending session");
                    self.end();
                }
            }
        }
    }

    /// Finish the cycle after user code: record the built-in outputs and
    /// hand a snapshot to the sinks.
    ///
    /// `user_code` and `before_user` are the caller-measured durations of
    /// user code and of [`cycle_before_user`](Self::cycle_before_user).
    /// Never blocks; a full queue drops the cycle and sets
    /// [`receiver_queue_fault`](Self::receiver_queue_fault).
    pub fn cycle_after_user(&mut self, user_code: Duration, before_user: Duration) {
        if !self.is_running() {
            return;
        }
        let user_ms = user_code.as_secs_f64() * 1e3;
        let before_ms = before_user.as_secs_f64() * 1e3;
        self.record_output("Cycle/UserCodeMS", user_ms);
        self.record_output("Cycle/BeforeUserMS", before_ms);
        self.record_output("Cycle/FullCycleMS", user_ms + before_ms);
        let queued = i64::try_from(self.pipeline.queued()).unwrap_or(i64::MAX);
        self.record_output("Logger/QueuedCycles", queued);

        if self.capture_console {
            if let Some(console) = self.console.as_mut() {
                let text = normalize_console(&console.new_data());
                if !text.is_empty() {
                    self.record_output("Console", text);
                }
            }
        }

        match self.pipeline.try_enqueue(self.entry.clone()) {
            Ok(()) => self.queue_fault = false,
            Err(EnqueueError::Full) => {
                self.queue_fault = true;
                log::error!("capacity of the sink queue exceeded, data will NOT be logged");
            }
            Err(EnqueueError::Disconnected) => {
                self.queue_fault = true;
                log::error!("sink worker is gone, data will NOT be logged");
            }
        }
    }

    // ── Data access ──────────────────────────────────────────────

    /// Capture `inputs` under `key` (live) or restore them from the
    /// recorded cycle (replay). No-op while stopped.
    pub fn process_inputs(&mut self, key: &str, inputs: &mut dyn LoggableInputs) {
        match self.state {
            RunState::Stopped => {}
            RunState::Live => inputs.to_log(&mut self.entry.subtable(key)),
            RunState::Replay => inputs.from_log(&self.entry.subtable(key)),
        }
    }

    /// Record an output value under the mode's output root. No-op while
    /// stopped.
    pub fn record_output(&mut self, key: &str, value: impl Into<Value>) {
        if let Some(root) = self.output_root() {
            self.entry.subtable(root).put(key, value);
        }
    }

    /// Record a struct output through `codec`. No-op while stopped.
    pub fn record_struct_output<T>(&mut self, key: &str, codec: &dyn StructCodec<T>, value: &T) {
        if let Some(root) = self.output_root() {
            self.entry.subtable(root).put_struct(key, codec, value);
        }
    }

    /// Record an array of struct outputs through `codec`. No-op while
    /// stopped.
    pub fn record_struct_array_output<T>(
        &mut self,
        key: &str,
        codec: &dyn StructCodec<T>,
        values: &[T],
    ) {
        if let Some(root) = self.output_root() {
            self.entry.subtable(root).put_struct_array(key, codec, values);
        }
    }

    /// Record a two-dimensional output as `key/length` plus one entry per
    /// row. No-op while stopped.
    ///
    /// Enum outputs are recorded by name: pass `&str` for one value or
    /// `&[&str]` for an array.
    pub fn record_output_rows<R: Clone + Into<Value>>(&mut self, key: &str, rows: &[R]) {
        if let Some(root) = self.output_root() {
            self.entry.subtable(root).put_rows(key, rows);
        }
    }

    /// Time the enclosing scope and record it in milliseconds under `key`.
    pub fn time_ms(&mut self, key: &str) -> TimedSpan<'_> {
        TimedSpan::new(self, key, TimeUnit::Millis)
    }

    /// Time the enclosing scope and record it in microseconds under `key`.
    pub fn time_us(&mut self, key: &str) -> TimedSpan<'_> {
        TimedSpan::new(self, key, TimeUnit::Micros)
    }

    /// Run `action` on cycles whose counter is a multiple of `n`.
    ///
    /// Must be called every cycle to have any effect. `n == 0` never runs.
    pub fn run_every_n(&mut self, n: u64, action: impl FnOnce(&mut Self)) {
        if n != 0 && self.cycle_count % n == 0 {
            action(self);
        }
    }

    /// The live table.
    pub fn entry(&self) -> &Table {
        &self.entry
    }

    /// The live table, for user code that reads and writes fields directly.
    pub fn entry_mut(&mut self) -> &mut Table {
        &mut self.entry
    }

    // ── State queries ────────────────────────────────────────────

    /// Cycle timestamp while running (replayed time in replay mode),
    /// otherwise the time source.
    pub fn timestamp(&mut self) -> f64 {
        if self.is_running() {
            self.entry.timestamp()
        } else {
            self.time_source.now()
        }
    }

    /// The time source, regardless of mode. Not for logic that must
    /// replay deterministically.
    pub fn real_timestamp(&mut self) -> f64 {
        self.time_source.now()
    }

    /// True between `start` and `end`.
    pub fn is_running(&self) -> bool {
        self.state != RunState::Stopped
    }

    /// True while running from a replay source.
    pub fn is_replay(&self) -> bool {
        self.state == RunState::Replay
    }

    /// True if a replay source is configured.
    pub fn has_replay_source(&self) -> bool {
        self.replay_source.is_some()
    }

    /// Set when a cycle could not be queued for the sinks; cleared by the
    /// next cycle that is queued.
    pub fn receiver_queue_fault(&self) -> bool {
        self.queue_fault
    }

    /// Number of before-user steps taken since construction or reset.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// The configuration this logger was constructed with.
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    fn output_root(&self) -> Option<&'static str> {
        match self.state {
            RunState::Stopped => None,
            RunState::Live => Some(REAL_OUTPUTS),
            RunState::Replay => Some(REPLAY_OUTPUTS),
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.end();
    }
}
