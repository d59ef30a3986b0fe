//! Logging setup for CLI and service mode

use crate::service::config::ServiceSettings;
use crate::service::descriptor::LogCallback;
use std::io::{self, Write};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Writer forwarding each formatted log line to the descriptor's log callback
pub struct CallbackWriter {
    callback: LogCallback,
    buf: Vec<u8>,
}

impl CallbackWriter {
    pub fn new(callback: LogCallback) -> Self {
        Self {
            callback,
            buf: Vec::new(),
        }
    }

    fn emit_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            (self.callback)(text.trim_end_matches(['\r', '\n']));
        }
    }
}

impl Write for CallbackWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        self.emit_lines();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.buf.push(b'\n');
            self.emit_lines();
        }
        Ok(())
    }
}

impl Drop for CallbackWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize logging for the administrative CLI
///
/// Diagnostics go to stderr; command output itself is printed directly.
pub fn init_cli_logging(settings: &ServiceSettings) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(settings.log_level()))
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Initialize logging for service mode
///
/// Services have no console, so output goes to the configured log file and
/// the descriptor's log callback, if any.
pub fn init_service_logging(settings: &ServiceSettings, callback: Option<LogCallback>) {
    let file_layer = settings.log_file.as_ref().and_then(|path| {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => Some(fmt::layer().with_writer(file).with_ansi(false)),
            Err(e) => {
                eprintln!(
                    "Warning: Failed to open log file '{}': {}",
                    path.display(),
                    e
                );
                None
            }
        }
    });

    let callback_layer = callback.map(|callback| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(move || CallbackWriter::new(callback.clone()))
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter(settings.log_level()))
        .with(file_layer)
        .with(callback_layer)
        .try_init();
}
