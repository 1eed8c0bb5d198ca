// src/bridge/reader.rs
//
// The two gated reader flavors. Each performs one read, publishes a
// ReadOutcome (the buffer goes with it), then parks until the dispatcher
// sends the buffer back. A closed release channel ends the reader.
//
// The serial flavor runs on a blocking worker thread and doubles as the
// serial write path: pending write requests are served between read polls,
// during the pacing sleep, and while parked, so the network-to-serial
// direction can never deadlock against an unprocessed read outcome.

use std::io::{self, Read, Write};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::types::{NetLink, ReadOutcome, SerialLink, WriteRequest};

/// How long the worker parks on its channels between polls. Also bounds how
/// long a pending serial write waits while the worker is gated.
const GATE_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Serial flavor (blocking)
// ============================================================================

/// Start the serial worker on the blocking pool and return the dispatcher's
/// handle to it. `device` is the opened port; tests pass an in-memory fake.
pub fn spawn_serial_worker<D>(device: D, buffer_size: usize, before_read: Duration) -> SerialLink
where
    D: Read + Write + Send + 'static,
{
    let (outcome_tx, outcome_rx) = mpsc::channel(1);
    let (release_tx, release_rx) = std_mpsc::channel();
    let (write_tx, write_rx) = std_mpsc::channel();

    tokio::task::spawn_blocking(move || {
        run_serial_worker(device, buffer_size, before_read, outcome_tx, release_rx, write_rx);
        debug!("Serial worker stopped");
    });

    SerialLink { outcome_rx, release_tx, write_tx }
}

fn run_serial_worker<D: Read + Write>(
    mut device: D,
    buffer_size: usize,
    before_read: Duration,
    outcome_tx: mpsc::Sender<ReadOutcome>,
    release_rx: std_mpsc::Receiver<Vec<u8>>,
    write_rx: std_mpsc::Receiver<WriteRequest>,
) {
    let mut buf = vec![0u8; buffer_size];
    loop {
        // Paced in slices; a pending write must not wait out the whole
        // read interval.
        let mut remaining = before_read;
        while !remaining.is_zero() {
            if let Err(std_mpsc::TryRecvError::Disconnected) = release_rx.try_recv() {
                return;
            }
            serve_writes(&mut device, &write_rx);
            let step = remaining.min(GATE_POLL_INTERVAL);
            thread::sleep(step);
            remaining -= step;
        }

        // One gated read attempt. Port timeouts are polling, not outcomes;
        // they are the windows in which pending writes get served.
        let outcome = loop {
            if let Err(std_mpsc::TryRecvError::Disconnected) = release_rx.try_recv() {
                return;
            }
            serve_writes(&mut device, &write_rx);
            match device.read(&mut buf) {
                Ok(n) => break ReadOutcome::data(std::mem::take(&mut buf), n),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break ReadOutcome::failed(std::mem::take(&mut buf), e),
            }
        };

        if outcome_tx.blocking_send(outcome).is_err() {
            return;
        }

        // Parked until the dispatcher hands the buffer back.
        buf = loop {
            serve_writes(&mut device, &write_rx);
            match release_rx.recv_timeout(GATE_POLL_INTERVAL) {
                Ok(buf) => break buf,
                Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                Err(std_mpsc::RecvTimeoutError::Disconnected) => return,
            }
        };
    }
}

fn serve_writes<D: Write>(device: &mut D, write_rx: &std_mpsc::Receiver<WriteRequest>) {
    while let Ok(request) = write_rx.try_recv() {
        let result = device.write_all(&request.data);
        let _ = request.result_tx.send(result);
    }
}

// ============================================================================
// Network flavor (async)
// ============================================================================

/// Start a gated reader over the read half of an adopted connection.
pub fn spawn_net_reader<R>(read_half: R, buffer_size: usize, before_read: Duration) -> NetLink
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let (outcome_tx, outcome_rx) = mpsc::channel(1);
    let (release_tx, release_rx) = mpsc::channel(1);

    let task = tokio::spawn(run_net_reader(
        read_half,
        buffer_size,
        before_read,
        outcome_tx,
        release_rx,
    ));

    NetLink { outcome_rx, release_tx, task }
}

async fn run_net_reader<R: AsyncRead + Unpin>(
    mut read_half: R,
    buffer_size: usize,
    before_read: Duration,
    outcome_tx: mpsc::Sender<ReadOutcome>,
    mut release_rx: mpsc::Receiver<Vec<u8>>,
) {
    let mut buf = vec![0u8; buffer_size];
    loop {
        if !before_read.is_zero() {
            tokio::time::sleep(before_read).await;
        }

        // End-of-stream is a connection error here: the peer hung up, and
        // relaying empty reads forever helps nobody.
        let outcome = match read_half.read(&mut buf).await {
            Ok(0) => ReadOutcome::failed(
                std::mem::take(&mut buf),
                io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by peer"),
            ),
            Ok(n) => ReadOutcome::data(std::mem::take(&mut buf), n),
            Err(e) => ReadOutcome::failed(std::mem::take(&mut buf), e),
        };

        if outcome_tx.send(outcome).await.is_err() {
            return;
        }

        buf = match release_rx.recv().await {
            Some(buf) => buf,
            None => return,
        };
    }
}

// ============================================================================
// Tests
// ============================================================================
