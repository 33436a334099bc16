//! Console capture: text output recorded alongside each cycle.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

pub use looplog_core::ConsoleSource;

/// An in-memory console: clone a [`ConsoleWriter`] into whatever produces
/// output, hand the console itself to the logger.
///
/// ```
/// use std::io::Write;
/// use looplog_engine::{BufferedConsole, ConsoleSource};
///
/// let mut console = BufferedConsole::new();
/// let mut out = console.writer();
/// writeln!(out, "arm homed").unwrap();
/// assert_eq!(console.new_data(), "arm homed\n");
/// assert_eq!(console.new_data(), "");
/// ```
#[derive(Debug, Default)]
pub struct BufferedConsole {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl BufferedConsole {
    /// An empty console.
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer appending to this console.
    pub fn writer(&self) -> ConsoleWriter {
        ConsoleWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

impl ConsoleSource for BufferedConsole {
    fn new_data(&mut self) -> String {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = std::mem::take(&mut *buffer);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Write handle into a [`BufferedConsole`].
#[derive(Clone, Debug)]
pub struct ConsoleWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Normalize line endings to `\n` and trim surrounding whitespace.
pub(crate) fn normalize_console(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn writers_share_one_buffer() {
        let mut console = BufferedConsole::new();
        let mut a = console.writer();
        let mut b = a.clone();
        a.write_all(b"one ").unwrap();
        b.write_all(b"two").unwrap();
        assert_eq!(console.new_data(), "one two");
    }

    #[test]
    fn normalizes_line_endings() {
        assert_eq!(normalize_console("a\r\nb\rc\n\n"), "a\nb\nc");
        assert_eq!(normalize_console("  \n"), "");
    }

    proptest::proptest! {
        #[test]
        fn normalized_text_has_no_carriage_returns(text in "[a-z \r\n]{0,40}") {
            let out = normalize_console(&text);
            proptest::prop_assert!(!out.contains('\r'));
            proptest::prop_assert_eq!(out.trim(), out.as_str());
            proptest::prop_assert_eq!(
                out.lines().filter(|l| !l.trim().is_empty()).count(),
                text.split(['\r', '\n']).filter(|l| !l.trim().is_empty()).count()
            );
        }
    }
}
