// src/bridge/types.rs
//
// Messages and channel bundles for the outcome/release handshake between
// the gated readers, the acceptor, and the dispatcher.

use std::io;
use std::net::SocketAddr;
use std::sync::mpsc as std_mpsc;

use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

// ============================================================================
// Outcomes
// ============================================================================

/// Result of one read attempt. The buffer travels with the outcome and comes
/// back to the reader inside the release signal; a reader without its buffer
/// cannot start the next read, which is what limits every source to a single
/// outstanding read.
#[derive(Debug)]
pub struct ReadOutcome {
    pub buf: Vec<u8>,
    pub len: usize,
    pub error: Option<io::Error>,
}

impl ReadOutcome {
    pub fn data(buf: Vec<u8>, len: usize) -> Self {
        ReadOutcome { buf, len, error: None }
    }

    pub fn failed(buf: Vec<u8>, error: io::Error) -> Self {
        ReadOutcome { buf, len: 0, error: Some(error) }
    }

    /// The bytes actually read.
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Result of one accept attempt: a live connection or the listener error.
pub type AcceptOutcome = io::Result<(TcpStream, SocketAddr)>;

/// One write to the serial device, answered with the blocking write's result.
pub struct WriteRequest {
    pub data: Vec<u8>,
    pub result_tx: oneshot::Sender<io::Result<()>>,
}

// ============================================================================
// Channel bundles
// ============================================================================

/// Dispatcher-side handle to the serial worker thread.
pub struct SerialLink {
    pub outcome_rx: mpsc::Receiver<ReadOutcome>,
    pub release_tx: std_mpsc::Sender<Vec<u8>>,
    pub write_tx: std_mpsc::Sender<WriteRequest>,
}

impl SerialLink {
    /// Hand the buffer back so the worker can start its next read.
    pub fn release(&self, buf: Vec<u8>) {
        // A gone worker means the bridge is tearing down; nothing to signal.
        let _ = self.release_tx.send(buf);
    }

    /// Write to the device through the worker and wait for the result.
    pub async fn write(&self, data: Vec<u8>) -> io::Result<()> {
        let (result_tx, result_rx) = oneshot::channel();
        if self.write_tx.send(WriteRequest { data, result_tx }).is_err() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "serial worker is gone"));
        }
        match result_rx.await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "serial worker dropped the write",
            )),
        }
    }
}

/// Dispatcher-side handle to one network gated reader. Created per adopted
/// connection; dropping it (plus aborting the task) is how a session's
/// reader dies with the session.
pub struct NetLink {
    pub outcome_rx: mpsc::Receiver<ReadOutcome>,
    pub release_tx: mpsc::Sender<Vec<u8>>,
    pub task: JoinHandle<()>,
}

impl NetLink {
    /// Hand the buffer back so the reader can start its next read.
    pub async fn release(&self, buf: Vec<u8>) {
        // A gone reader means the session is being torn down.
        let _ = self.release_tx.send(buf).await;
    }
}

/// Dispatcher-side handle to the connection acceptor.
pub struct AcceptorLink {
    pub outcome_rx: mpsc::Receiver<AcceptOutcome>,
    pub release_tx: mpsc::Sender<()>,
    pub task: JoinHandle<()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_outcome_bytes_honors_len() {
        let outcome = ReadOutcome::data(vec![1, 2, 3, 4], 2);
        assert_eq!(outcome.bytes(), &[1, 2]);
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_failed_outcome_reads_nothing() {
        let err = io::Error::new(io::ErrorKind::Other, "boom");
        let outcome = ReadOutcome::failed(vec![9; 8], err);
        assert_eq!(outcome.bytes(), &[] as &[u8]);
        assert!(outcome.error.is_some());
    }
}
