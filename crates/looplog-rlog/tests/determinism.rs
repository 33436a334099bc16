//! Record/replay determinism through real files.
//!
//! Each test: run a live session writing to a `FileSink` in a temp dir →
//! start a fresh logger replaying that file via `FileReplay` → compare
//! inputs, timestamps and recomputed outputs cycle by cycle.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use looplog_core::{LoggableInputs, SubTable};
use looplog_engine::{Logger, LoggerConfig};
use looplog_rlog::{CycleReader, FileReplay, FileSink};

// ── Helpers ─────────────────────────────────────────────────────

const TIME_DIVISOR: f64 = 5000.0;
const CYCLES: u32 = 400;

#[derive(Default)]
struct TestInput {
    number: i64,
    heading: f64,
    label: String,
}

impl LoggableInputs for TestInput {
    fn to_log(&self, table: &mut SubTable<'_>) {
        table.put("Number", self.number);
        table.put("Heading", self.heading);
        table.put("Label", self.label.as_str());
    }

    fn from_log(&mut self, table: &SubTable<'_>) {
        self.number = table.get("Number", self.number);
        self.heading = table.get("Heading", self.heading);
        self.label = table.get("Label", self.label.clone());
    }
}

fn quiet_logger() -> Logger {
    let mut logger = Logger::new(LoggerConfig::default()).unwrap();
    logger.disable_console_capture();
    logger
}

/// The control function under test: depends only on logged inputs.
fn control(input: &TestInput) -> f64 {
    (input.heading * 3.0).sin() * input.number as f64 + input.label.len() as f64
}

/// Live session: cycle `i` has timestamp `i / 5000` and input number `i`.
fn record(dir: &Path) -> std::path::PathBuf {
    let tick = Arc::new(AtomicU32::new(0));
    let clock = Arc::clone(&tick);

    let mut logger = quiet_logger();
    logger.set_time_source(move || f64::from(clock.load(Ordering::SeqCst)) / TIME_DIVISOR);
    let sink = FileSink::new(dir, "testLog");
    let path = sink.path().to_path_buf();
    logger.add_sink(Box::new(sink));

    logger.start().unwrap();
    logger.cycle_after_user(Duration::ZERO, Duration::ZERO);

    let mut inputs = TestInput::default();
    for i in 1..CYCLES {
        tick.store(i, Ordering::SeqCst);
        logger.cycle_before_user();

        inputs.number = i64::from(i);
        inputs.heading = f64::from(i) * 0.01;
        inputs.label = format!("cycle-{}", i % 7);
        logger.process_inputs("TestInput", &mut inputs);
        let out = control(&inputs);
        logger.record_output("Result", out);

        logger.cycle_after_user(Duration::ZERO, Duration::ZERO);
    }
    let report = logger.end();
    assert_eq!(report.cycles_dropped, 0);
    assert!(report.worker_joined);
    path
}

// ── Tests ───────────────────────────────────────────────────────

#[test]
fn replay_reproduces_inputs_and_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let path = record(dir.path());
    assert!(path.exists());
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    let mut logger = quiet_logger();
    logger.set_replay_source(Box::new(FileReplay::new(&path)));
    logger.start().unwrap();
    assert!(logger.is_replay());
    logger.cycle_after_user(Duration::ZERO, Duration::ZERO);

    let mut inputs = TestInput::default();
    for i in 1..CYCLES {
        logger.cycle_before_user();
        assert!(logger.is_running(), "replay ended early at cycle {i}");
        logger.process_inputs("TestInput", &mut inputs);

        assert_eq!(inputs.number, i64::from(i));
        let expected = f64::from(i) / TIME_DIVISOR;
        assert!((logger.timestamp() - expected).abs() < 1e-12);

        logger.cycle_after_user(Duration::ZERO, Duration::ZERO);
    }

    // The recording is exhausted on the next cycle.
    logger.cycle_before_user();
    assert!(!logger.is_running());
}

#[test]
fn replayed_control_matches_recorded_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let path = record(dir.path());

    let mut logger = quiet_logger();
    logger.set_replay_source(Box::new(FileReplay::new(&path)));
    logger.start().unwrap();
    logger.cycle_after_user(Duration::ZERO, Duration::ZERO);

    let mut inputs = TestInput::default();
    let mut compared = 0;
    loop {
        logger.cycle_before_user();
        if !logger.is_running() {
            break;
        }
        logger.process_inputs("TestInput", &mut inputs);
        let replayed = control(&inputs);
        logger.record_output("Result", replayed);

        let entry = logger.entry();
        let recorded = entry.get("RealOutputs/Result", f64::NAN);
        assert_eq!(
            recorded.to_bits(),
            entry.get("ReplayOutputs/Result", f64::NAN).to_bits()
        );
        compared += 1;
        logger.cycle_after_user(Duration::ZERO, Duration::ZERO);
    }
    assert_eq!(compared, CYCLES - 1);
}

#[test]
fn recording_holds_one_cycle_per_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let path = record(dir.path());

    let bytes = std::fs::read(&path).unwrap();
    let tables: Vec<_> = CycleReader::new(bytes.as_slice())
        .tables()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(tables.len(), CYCLES as usize);
    for (i, table) in tables.iter().enumerate() {
        assert_eq!(table.timestamp(), i as f64 / TIME_DIVISOR);
    }
    assert!(tables[0].contains("RealOutputs/Cycle/FullCycleMS"));
    assert!(tables[1].contains("TestInput/Number"));
}

#[test]
fn replay_of_missing_file_stops_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let mut logger = quiet_logger();
    logger.set_replay_source(Box::new(FileReplay::new(dir.path().join("absent.rlog"))));
    logger.start().unwrap();
    assert!(!logger.is_running());
}
