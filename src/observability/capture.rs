//! In-memory log capture
//!
//! [`LogBuffer`] is a `MakeWriter` that appends formatted events to a shared
//! byte buffer, so a run's log can be printed after the report.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;

/// Shared buffer of captured log output
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // a panic while holding the lock leaves at worst a partial line
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Everything captured so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.lock()).into_owned()
    }

    /// Captured lines, without blank ones
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Writer handed out per event
pub struct LogBufferWriter {
    buffer: LogBuffer,
}

impl io::Write for LogBufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogBufferWriter {
            buffer: self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info, warn};
    use tracing_subscriber::fmt;

    fn capture_subscriber(buffer: &LogBuffer) -> impl tracing::Subscriber {
        fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::INFO)
            .finish()
    }

    #[test]
    fn test_events_are_captured() {
        let buffer = LogBuffer::new();

        tracing::subscriber::with_default(capture_subscriber(&buffer), || {
            info!(cards = 3, "Board fetched");
            warn!("Slow response");
        });

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Board fetched"));
        assert!(lines[0].contains("cards=3"));
        assert!(lines[1].contains("Slow response"));
    }

    #[test]
    fn test_events_below_level_are_dropped() {
        let buffer = LogBuffer::new();

        tracing::subscriber::with_default(capture_subscriber(&buffer), || {
            debug!("hidden");
        });

        assert!(buffer.is_empty());
    }

    #[test]
    fn test_clear_empties_buffer() {
        let buffer = LogBuffer::new();
        tracing::subscriber::with_default(capture_subscriber(&buffer), || {
            info!("something");
        });
        assert!(!buffer.is_empty());

        buffer.clear();
        assert_eq!(buffer.contents(), "");
    }
}
