//! Bridges the kiosk to a message bus through plain files.
//!
//! The bus clients themselves live outside this crate. Whatever subscribes
//! to the `scale` channel (or the robot's MQTT topic) writes one message per
//! line into a file or FIFO, and [`spawn_feed`] follows it. In the other
//! direction the [`Publisher`] appends one JSON line per message for a bus
//! client to pick up.

use crate::remote::TargetMessage;
use log::{debug, info, warn};
use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver},
    thread,
    time::Duration,
};

const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Follows `path` like `tail -f`, sending every complete, non-empty line over
/// the returned channel. Text without a trailing newline is held back until
/// the rest of the line is written. Stops once the receiver is dropped.
///
/// The file is opened on the feed thread because opening a FIFO blocks until
/// a writer shows up.
pub fn spawn_feed(path: impl AsRef<Path>) -> Receiver<String> {
    let path = path.as_ref().to_path_buf();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Cannot open feed {}: {}", path.display(), e);
                return;
            }
        };
        info!("Following feed {}", path.display());

        let mut reader = BufReader::new(file);
        // Holds a partial line until its newline arrives.
        let mut line = String::new();
        loop {
            match reader.read_line(&mut line) {
                // End of what was written so far; a FIFO writer may come back.
                Ok(0) => thread::sleep(IDLE_WAIT),
                Ok(_) if !line.ends_with('\n') => {}
                Ok(_) => {
                    let message = line.trim().to_owned();
                    line.clear();
                    if message.is_empty() {
                        continue;
                    }
                    debug!("Feed message {:?}", message);
                    if tx.send(message).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Feed {} failed: {}", path.display(), e);
                    return;
                }
            }
        }
    });

    rx
}

/// Publishes target messages as JSON lines.
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    path: Option<PathBuf>,
}

impl Publisher {
    /// Appends to `path`; `None` only logs what would have been sent.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Sends one message.
    pub fn publish(&self, message: &TargetMessage) -> io::Result<()> {
        let json = serde_json::to_string(message)?;
        match &self.path {
            Some(path) => {
                let mut out = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(out, "{}", json)?;
                info!("Published {} to {}", json, path.display());
            }
            None => info!("No publish target, dropping {}", json),
        }
        Ok(())
    }
}
