//! Mock serial console.

use crate::{HardwareError, Result, traits::ConsoleChannel};
use std::sync::{Arc, Mutex, mpsc};

/// Mock console: lines go in through the handle, output is collected.
#[derive(Debug)]
pub struct MockConsole {
    line_rx: mpsc::Receiver<String>,
    output: Arc<Mutex<Vec<String>>>,
}

impl MockConsole {
    pub fn new() -> (Self, MockConsoleHandle) {
        let (line_tx, line_rx) = mpsc::channel();
        let output = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                line_rx,
                output: Arc::clone(&output),
            },
            MockConsoleHandle { line_tx, output },
        )
    }
}

impl ConsoleChannel for MockConsole {
    fn poll_line(&mut self) -> Option<String> {
        self.line_rx.try_recv().ok()
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.output
            .lock()
            .map_err(|_| HardwareError::write_failed("console output poisoned"))?
            .push(line.to_string());
        Ok(())
    }
}

/// Handle for typing into a mock console and reading what it printed.
#[derive(Debug, Clone)]
pub struct MockConsoleHandle {
    line_tx: mpsc::Sender<String>,
    output: Arc<Mutex<Vec<String>>>,
}

impl MockConsoleHandle {
    /// Queue an input line.
    ///
    /// # Errors
    ///
    /// Returns an error if the console has been dropped.
    pub fn send_line(&self, line: impl Into<String>) -> Result<()> {
        self.line_tx
            .send(line.into())
            .map_err(|_| HardwareError::disconnected("console"))
    }

    /// Drain everything the console printed so far.
    pub fn take_output(&self) -> Vec<String> {
        self.output
            .lock()
            .map(|mut lines| std::mem::take(&mut *lines))
            .unwrap_or_default()
    }
}
