//! Bounded fan-out from the control loop to the registered sinks.
//!
//! ```text
//! Control loop                 Sink worker ("looplog-sink")
//!     |                             |
//!     |--try_enqueue(clone)-------->| rx.recv()
//!     |   [tx: bounded(capacity)]   | sink[0].put_table(&t)
//!     |   Full => fault, dropped    | sink[1].put_table(&t) ...
//!     |                             |
//!     |--stop(): drop tx----------->| drains queue, sink.end()
//!     |<--join() returns sinks------|
//! ```
//!
//! The producer side never blocks. A stalled sink blocks only the worker;
//! once the queue fills, further cycles are dropped.

use std::fmt;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, TrySendError};
use looplog_core::{LogSink, Table};

use crate::config::ConfigError;

/// Error returned by [`SinkPipeline::try_enqueue`].
#[derive(Debug, PartialEq, Eq)]
pub enum EnqueueError {
    /// The queue is at capacity; the table was dropped.
    Full,
    /// No worker is running.
    Disconnected,
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "sink queue full"),
            Self::Disconnected => write!(f, "sink worker is not running"),
        }
    }
}

impl std::error::Error for EnqueueError {}

/// A bounded queue drained by one worker thread that forwards every table
/// to each sink in registration order.
///
/// Sinks are owned by the worker while it runs and handed back when it is
/// joined, so the pipeline can be started again with the same sinks.
pub struct SinkPipeline {
    capacity: usize,
    sinks: Vec<Box<dyn LogSink>>,
    tx: Option<Sender<Table>>,
    worker: Option<JoinHandle<Vec<Box<dyn LogSink>>>>,
    enqueued: u64,
    dropped: u64,
}

impl SinkPipeline {
    /// An idle pipeline with the given queue capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sinks: Vec::new(),
            tx: None,
            worker: None,
            enqueued: 0,
            dropped: 0,
        }
    }

    /// Register a sink. Ignored while the worker is running.
    pub fn add_sink(&mut self, sink: Box<dyn LogSink>) {
        if self.is_running() {
            log::warn!("sinks cannot be added while the pipeline is running");
            return;
        }
        self.sinks.push(sink);
    }

    /// Number of sinks held while idle. The running worker owns them, so
    /// this reads zero between `start` and `stop`.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// True while a worker is accepting tables.
    pub fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    /// Spawn the worker. No-op if already running. Resets the session
    /// counters.
    pub fn start(&mut self) -> Result<(), ConfigError> {
        if self.is_running() {
            return Ok(());
        }
        let (tx, rx) = crossbeam_channel::bounded::<Table>(self.capacity);
        let mut sinks = std::mem::take(&mut self.sinks);
        let worker = thread::Builder::new()
            .name("looplog-sink".into())
            .spawn(move || {
                for sink in sinks.iter_mut() {
                    sink.start();
                }
                // recv() fails only once the sender is dropped and the
                // queue is empty.
                while let Ok(table) = rx.recv() {
                    for sink in sinks.iter_mut() {
                        sink.put_table(&table);
                    }
                }
                for sink in sinks.iter_mut() {
                    sink.end();
                }
                sinks
            })
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("sink worker: {e}"),
            })?;
        self.tx = Some(tx);
        self.worker = Some(worker);
        self.enqueued = 0;
        self.dropped = 0;
        Ok(())
    }

    /// Hand `table` to the worker without blocking.
    pub fn try_enqueue(&mut self, table: Table) -> Result<(), EnqueueError> {
        let Some(tx) = self.tx.as_ref() else {
            self.dropped += 1;
            return Err(EnqueueError::Disconnected);
        };
        match tx.try_send(table) {
            Ok(()) => {
                self.enqueued += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Err(EnqueueError::Full)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped += 1;
                Err(EnqueueError::Disconnected)
            }
        }
    }

    /// Tables waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tx.as_ref().map_or(0, Sender::len)
    }

    /// Tables accepted since the last start.
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }

    /// Tables dropped since the last start.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Close the queue, let the worker drain it and end every sink, then
    /// join the worker and take the sinks back.
    ///
    /// Returns `false` if the worker panicked (its sinks are lost).
    pub fn stop(&mut self) -> bool {
        self.tx = None;
        let Some(worker) = self.worker.take() else {
            return true;
        };
        match worker.join() {
            Ok(sinks) => {
                self.sinks = sinks;
                true
            }
            Err(_) => {
                log::error!("sink worker panicked; its sinks were dropped");
                false
            }
        }
    }
}

impl Drop for SinkPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use looplog_test_utils::{RecordingSink, StallingSink};

    #[test]
    fn delivers_in_order_to_every_sink() {
        let first = RecordingSink::new();
        let second = RecordingSink::new();
        let mut pipeline = SinkPipeline::new(16);
        pipeline.add_sink(Box::new(first.clone()));
        pipeline.add_sink(Box::new(second.clone()));
        pipeline.start().unwrap();

        for step in 1..=10 {
            pipeline.try_enqueue(Table::new(f64::from(step))).unwrap();
        }
        assert!(pipeline.stop());

        for sink in [&first, &second] {
            let ts: Vec<f64> = sink.tables().iter().map(Table::timestamp).collect();
            assert_eq!(ts, (1..=10).map(f64::from).collect::<Vec<_>>());
            assert_eq!(sink.starts(), 1);
            assert_eq!(sink.ends(), 1);
        }
        assert_eq!(pipeline.enqueued(), 10);
        assert_eq!(pipeline.sink_count(), 2);
    }

    #[test]
    fn enqueue_without_worker_is_disconnected() {
        let mut pipeline = SinkPipeline::new(4);
        assert_eq!(
            pipeline.try_enqueue(Table::new(0.0)),
            Err(EnqueueError::Disconnected)
        );
        assert_eq!(pipeline.dropped(), 1);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let stall = StallingSink::new();
        let mut pipeline = SinkPipeline::new(2);
        pipeline.add_sink(Box::new(stall.clone()));
        pipeline.start().unwrap();

        // The worker holds at most one table while stalled, so capacity + 2
        // attempts must overflow.
        let results: Vec<_> = (0..4)
            .map(|i| pipeline.try_enqueue(Table::new(f64::from(i))))
            .collect();
        assert!(results.contains(&Err(EnqueueError::Full)));
        assert!(pipeline.dropped() >= 1);

        stall.release();
        assert!(pipeline.stop());
        assert_eq!(
            stall.delivered() as u64,
            pipeline.enqueued(),
            "every accepted table reaches the sink"
        );
    }

    #[test]
    fn restart_reuses_sinks() {
        let sink = RecordingSink::new();
        let mut pipeline = SinkPipeline::new(4);
        pipeline.add_sink(Box::new(sink.clone()));
        for session in 0..3 {
            pipeline.start().unwrap();
            pipeline.try_enqueue(Table::new(f64::from(session))).unwrap();
            assert!(pipeline.stop());
        }
        assert_eq!(sink.tables().len(), 3);
        assert_eq!(sink.starts(), 3);
    }

    #[test]
    fn add_sink_ignored_while_running() {
        let mut pipeline = SinkPipeline::new(4);
        pipeline.start().unwrap();
        pipeline.add_sink(Box::new(RecordingSink::new()));
        assert_eq!(pipeline.sink_count(), 0);
        pipeline.stop();
        assert_eq!(pipeline.sink_count(), 0);
    }
}
