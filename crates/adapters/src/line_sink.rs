//! Line-oriented outputs for the diagnostic loggers.

use std::io::Write;
use std::sync::Mutex;

/// A sink that receives pre-formatted, newline-terminated lines.
pub trait LineSink: Send + Sync {
    /// Write a line to the sink.
    fn write_line(&self, line: &str);
}

/// Line sink that writes to stderr.
#[derive(Debug, Default)]
pub struct StderrLineSink;

impl LineSink for StderrLineSink {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        if let Err(error) = stderr.write_all(line.as_bytes()) {
            eprintln!("diagnostic sink write failed: {error}");
        }
    }
}

/// Line sink that keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLineSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLineSink {
    /// Drain the captured lines.
    pub fn take(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}

impl LineSink for MemoryLineSink {
    fn write_line(&self, line: &str) {
        if let Ok(mut guard) = self.lines.lock() {
            guard.push(line.to_owned());
        }
    }
}
