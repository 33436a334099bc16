//! Test utilities and mock types for looplog development.
//!
//! Provides mock implementations of the collaborator traits
//! ([`LogSink`], [`ReplaySource`], [`ConsoleSource`]) and table fixtures
//! for codec and logger tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use looplog_core::{ConsoleSource, LogSink, ReplaySource, Table};

pub use fixtures::{mixed_table, Point, PointCodec};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── RecordingSink ───────────────────────────────────────────────

#[derive(Default)]
struct Recording {
    tables: Vec<Table>,
    starts: usize,
    ends: usize,
}

/// Sink that keeps every table it receives.
///
/// Clones share one recording, so keep a clone to inspect after handing
/// the sink to a logger.
#[derive(Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables received so far, in delivery order.
    pub fn tables(&self) -> Vec<Table> {
        lock(&self.inner).tables.clone()
    }

    pub fn starts(&self) -> usize {
        lock(&self.inner).starts
    }

    pub fn ends(&self) -> usize {
        lock(&self.inner).ends
    }
}

impl LogSink for RecordingSink {
    fn start(&mut self) {
        lock(&self.inner).starts += 1;
    }

    fn put_table(&mut self, table: &Table) {
        lock(&self.inner).tables.push(table.clone());
    }

    fn end(&mut self) {
        lock(&self.inner).ends += 1;
    }
}

// ── StallingSink ────────────────────────────────────────────────

/// Sink that blocks inside `put_table` until [`release`](Self::release)
/// is called, simulating a stalled disk or network.
#[derive(Clone, Default)]
pub struct StallingSink {
    gate: Arc<(Mutex<bool>, Condvar)>,
    delivered: Arc<AtomicUsize>,
}

impl StallingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let every pending and future `put_table` complete.
    pub fn release(&self) {
        let (open, cvar) = &*self.gate;
        *lock(open) = true;
        cvar.notify_all();
    }

    /// Tables that made it past the gate.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Acquire)
    }
}

impl LogSink for StallingSink {
    fn put_table(&mut self, _table: &Table) {
        let (open, cvar) = &*self.gate;
        let mut guard = lock(open);
        while !*guard {
            guard = cvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        drop(guard);
        self.delivered.fetch_add(1, Ordering::AcqRel);
    }
}

// ── ScriptedReplay ──────────────────────────────────────────────

/// Replay source that plays back a fixed list of tables.
#[derive(Clone, Default)]
pub struct ScriptedReplay {
    pending: VecDeque<Table>,
    started: bool,
}

impl ScriptedReplay {
    pub fn new(tables: Vec<Table>) -> Self {
        Self {
            pending: tables.into(),
            started: false,
        }
    }

    /// Tables not yet played.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl ReplaySource for ScriptedReplay {
    fn start(&mut self) {
        self.started = true;
    }

    fn end(&mut self) {
        self.started = false;
    }

    fn update(&mut self, table: &mut Table) -> bool {
        if !self.started {
            return false;
        }
        let Some(next) = self.pending.pop_front() else {
            return false;
        };
        table.set_timestamp(next.timestamp());
        for (key, value) in next.entries(true) {
            table.put(key, value.clone());
        }
        true
    }
}

// ── ScriptedConsole ─────────────────────────────────────────────

/// Console source that hands out queued text, one chunk per poll, and
/// counts polls and closes. Optionally fails on close.
#[derive(Clone, Default)]
pub struct ScriptedConsole {
    chunks: Arc<Mutex<VecDeque<String>>>,
    polls: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// A console whose `close` always returns an I/O error.
    pub fn failing_close() -> Self {
        Self {
            fail_close: true,
            ..Self::default()
        }
    }

    /// Queue `text` for a later poll.
    pub fn push(&self, text: &str) {
        lock(&self.chunks).push_back(text.to_owned());
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::Acquire)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::Acquire)
    }
}

impl ConsoleSource for ScriptedConsole {
    fn new_data(&mut self) -> String {
        self.polls.fetch_add(1, Ordering::AcqRel);
        lock(&self.chunks).pop_front().unwrap_or_default()
    }

    fn close(&mut self) -> io::Result<()> {
        self.closes.fetch_add(1, Ordering::AcqRel);
        if self.fail_close {
            return Err(io::Error::other("console stream already closed"));
        }
        Ok(())
    }
}
