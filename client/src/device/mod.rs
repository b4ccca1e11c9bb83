//! Device line reader
//!
//! The board prints one JSON object per line, e.g.
//! `{"TDS": 412.5, "temperature": 23.1}`. Anything else is logged and
//! skipped so a noisy boot banner never stops the reader.

use anyhow::{Context, Result};
use policy::SensorInput;
use serde_json::Value;
use std::io::{self, BufRead, BufReader, Read};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;

#[derive(Debug, Error)]
pub enum LineError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object")]
    NotAnObject,

    #[error("missing or non-numeric field '{0}'")]
    MissingField(&'static str),
}

/// Parse one trimmed line into a sample.
pub fn parse_line(line: &str) -> Result<SensorInput, LineError> {
    let value: Value = serde_json::from_str(line)?;
    let object = value.as_object().ok_or(LineError::NotAnObject)?;

    let number = |field: &'static str| {
        object
            .get(field)
            .and_then(Value::as_f64)
            .ok_or(LineError::MissingField(field))
    };

    Ok(SensorInput {
        tds: number("TDS")?,
        temperature: number("temperature")?,
    })
}

/// Open the serial device and wait for the board to come out of reset.
pub fn open_serial(config: &DeviceConfig) -> Result<Box<dyn serialport::SerialPort>> {
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(config.read_timeout())
        .open()
        .with_context(|| format!("Failed to open serial port {}", config.port))?;

    info!("Connected to {} at {} baud", config.port, config.baud_rate);
    std::thread::sleep(config.settle_delay());

    Ok(port)
}

/// Splits a byte stream into lines. A partial line survives a read
/// timeout and is completed by the next read.
pub struct LineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    /// Next line, lossily decoded and trimmed. `None` at end of input.
    pub fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let read = self.inner.read_until(b'\n', &mut self.pending)?;

            if read == 0 {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_line()));
            }

            if self.pending.ends_with(b"\n") {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        line
    }
}

/// Feed every valid sample to `on_sample` until the input ends.
pub fn run<R, F>(mut reader: LineReader<R>, backoff: Duration, mut on_sample: F)
where
    R: Read,
    F: FnMut(SensorInput),
{
    loop {
        match reader.next_line() {
            Ok(None) => {
                info!("Input closed");
                return;
            }
            Ok(Some(line)) => {
                if line.is_empty() {
                    continue;
                }
                debug!("Line: {}", line);

                match parse_line(&line) {
                    Ok(sample) => on_sample(sample),
                    Err(e) => warn!("Skipping line {:?}: {}", line, e),
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!("Read error: {}", e);
                std::thread::sleep(backoff);
            }
        }
    }
}
