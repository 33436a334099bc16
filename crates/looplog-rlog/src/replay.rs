//! File-backed replay source and replay log discovery.

use std::env;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use looplog_core::{ReplaySource, Table};

use crate::error::CodecError;
use crate::reader::CycleReader;

/// Replay source that plays back a `.rlog` file one cycle per update.
///
/// The file is opened on [`start`](ReplaySource::start). If it cannot be
/// opened, the failure is logged and the first update reports exhaustion.
pub struct FileReplay {
    path: PathBuf,
    reader: Option<CycleReader<BufReader<File>>>,
}

impl FileReplay {
    /// Replay source for the log at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
        }
    }

    /// Replay source for the log found by `resolver`.
    pub fn discover(resolver: &ReplayPathResolver) -> Result<Self, CodecError> {
        Ok(Self::new(resolver.resolve(None)?))
    }

    /// Path of the log being replayed.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReplaySource for FileReplay {
    fn start(&mut self) {
        match File::open(&self.path) {
            Ok(file) => {
                log::info!("replaying {}", self.path.display());
                self.reader = Some(CycleReader::new(BufReader::new(file)));
            }
            Err(e) => {
                log::error!("failed to open replay log {}: {e}", self.path.display());
                self.reader = None;
            }
        }
    }

    fn end(&mut self) {
        self.reader = None;
    }

    fn update(&mut self, table: &mut Table) -> bool {
        let Some(reader) = self.reader.as_mut() else {
            return false;
        };
        match reader.next_table() {
            Ok(Some(cycle)) => {
                table.set_timestamp(cycle.timestamp());
                for (key, value) in cycle.entries(true) {
                    table.put(key, value.clone());
                }
                true
            }
            Ok(None) => {
                log::info!("replay of {} has ended", self.path.display());
                false
            }
            Err(e) => {
                log::error!("replay of {} stopped: {e}", self.path.display());
                false
            }
        }
    }
}

// ── Path discovery ──────────────────────────────────────────────

/// Environment variable naming the log to replay.
pub const DEFAULT_ENV_VAR: &str = "AKIT_LOG_PATH";

/// File in the temp directory where a log viewer leaves the path of the
/// log it has open.
pub const DEFAULT_COMPANION_FILE: &str = "akit-log-path.txt";

/// Finds the log to replay when the caller does not name one.
///
/// Tried in order: an explicit path, the environment variable, then the
/// first line of the companion file.
#[derive(Clone, Debug)]
pub struct ReplayPathResolver {
    /// Environment variable consulted second.
    pub env_var: String,
    /// Companion file consulted last.
    pub companion_file: PathBuf,
}

impl Default for ReplayPathResolver {
    fn default() -> Self {
        Self {
            env_var: DEFAULT_ENV_VAR.to_owned(),
            companion_file: env::temp_dir().join(DEFAULT_COMPANION_FILE),
        }
    }
}

impl ReplayPathResolver {
    /// Resolve the replay path, or [`CodecError::NoReplayPath`] when no
    /// source names one.
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<PathBuf, CodecError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = env::var_os(&self.env_var).filter(|v| !v.is_empty()) {
            log::debug!("replay path from ${}", self.env_var);
            return Ok(PathBuf::from(path));
        }
        if let Ok(contents) = fs::read_to_string(&self.companion_file) {
            if let Some(line) = contents.lines().next().map(unquote).filter(|l| !l.is_empty()) {
                log::info!("using log from log viewer: \"{line}\"");
                return Ok(PathBuf::from(line));
            }
        }
        Err(CodecError::NoReplayPath)
    }
}

fn unquote(line: &str) -> &str {
    let line = line.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = line
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    line
}
