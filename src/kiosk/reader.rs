//! Card reader capability
//!
//! The physical reader driver is out of scope; the terminal sees hardware
//! only through the `CardReader` trait. Transport problems are a normal
//! part of operation (reader unplugged, bus glitch) and are reported as
//! values, logged and retried by the polling loop, never propagated as
//! fatal.

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use thiserror::Error;

/// Why a poll returned no UID
#[derive(Debug, Error)]
pub enum ReadError {
    /// Nothing is on the reader right now; the normal idle case
    #[error("no card present")]
    NoCard,

    /// The reader or its transport misbehaved; retried after a delay
    #[error("card reader transport error: {0}")]
    Transport(String),
}

/// One poll of the card reader
pub trait CardReader {
    /// Read the UID of the card currently presented, if any.
    fn read_uid(&mut self) -> Result<String, ReadError>;
}

/// Line-based stand-in for the hardware reader
///
/// Reads lines from stdin on a background thread; each non-empty line is
/// reported as one card presentation. Lets a terminal run (and the demo
/// flow be exercised) on machines without a reader attached.
pub struct LineReader {
    lines: Receiver<String>,
}

impl LineReader {
    /// Spawn the stdin pump and return the reader.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
        LineReader { lines: rx }
    }
}

impl CardReader for LineReader {
    fn read_uid(&mut self) -> Result<String, ReadError> {
        match self.lines.try_recv() {
            Ok(line) if line.trim().is_empty() => Err(ReadError::NoCard),
            Ok(line) => Ok(line),
            Err(TryRecvError::Empty) => Err(ReadError::NoCard),
            Err(TryRecvError::Disconnected) => {
                Err(ReadError::Transport("input closed".to_string()))
            }
        }
    }
}
