// src/bridge/dispatcher.rs
//
// The bridge control loop. Sole owner of bridge state: consumes read and
// accept outcomes, performs the writes in each direction, applies pacing,
// and decides teardown. Two states: no connection, or one active session.
//
// Error policy: the serial side is not replaceable, so any serial failure
// ends the bridge. The network side is; a connection error closes the
// session and releases the acceptor for the next client.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tracing::{debug, error, info, trace, warn};

use crate::config::{BridgeConfig, PacingConfig};
use crate::error::Error;

use super::reader::spawn_net_reader;
use super::types::{AcceptOutcome, AcceptorLink, NetLink, ReadOutcome, SerialLink};

/// The one active connection. Destruction closes the handle: the write half
/// drops here and aborting the reader task drops the read half.
struct Session {
    writer: OwnedWriteHalf,
    peer: SocketAddr,
    reader: NetLink,
    error: Option<io::Error>,
}

impl Session {
    fn close(self) {
        self.reader.task.abort();
    }
}

/// The next thing that happened, whichever source it came from.
enum Event {
    SerialRead(Option<ReadOutcome>),
    NetRead(Option<ReadOutcome>),
    Accepted(Option<AcceptOutcome>),
}

pub struct Bridge {
    serial: SerialLink,
    acceptor: AcceptorLink,
    session: Option<Session>,
    pacing: PacingConfig,
    tcp_buffer_size: usize,
    /// A recorded serial failure. Checked first after every transition.
    fatal: Option<Error>,
}

impl Bridge {
    pub fn new(serial: SerialLink, acceptor: AcceptorLink, config: BridgeConfig) -> Self {
        Bridge {
            serial,
            acceptor,
            session: None,
            pacing: config.pacing,
            tcp_buffer_size: config.tcp_buffer_size,
            fatal: None,
        }
    }

    /// Run until the serial side or the listener fails. Always returns the
    /// terminal error; there is no clean exit from a bridge that works.
    pub async fn run(mut self) -> Result<(), Error> {
        let result = loop {
            match self.next_event().await {
                Event::SerialRead(Some(outcome)) => self.on_serial_read(outcome).await,
                Event::SerialRead(None) => {
                    self.fatal = Some(Error::serial_io(
                        "worker",
                        io::Error::new(io::ErrorKind::BrokenPipe, "serial worker stopped"),
                    ));
                }
                Event::NetRead(Some(outcome)) => self.on_net_read(outcome).await,
                Event::NetRead(None) => {
                    if let Some(session) = &mut self.session {
                        session.error = Some(io::Error::new(
                            io::ErrorKind::BrokenPipe,
                            "connection reader stopped",
                        ));
                    }
                }
                Event::Accepted(Some(Ok((stream, peer)))) => self.adopt(stream, peer),
                Event::Accepted(Some(Err(err))) => {
                    error!("Accept failed: {}", err);
                    break Err(Error::accept(err));
                }
                Event::Accepted(None) => {
                    break Err(Error::accept(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "acceptor stopped",
                    )));
                }
            }

            // Post-conditions, fixed order: a serial failure ends the
            // bridge; a connection failure recycles the connection.
            if let Some(err) = self.fatal.take() {
                break Err(err);
            }
            if self.session.as_ref().map_or(false, |s| s.error.is_some()) {
                if let Some(session) = self.session.take() {
                    if let Some(err) = &session.error {
                        info!("Connection to {} closed: {}", session.peer, err);
                    }
                    session.close();
                }
                debug!("Waiting for a new client");
                if self.acceptor.release_tx.send(()).await.is_err() {
                    break Err(Error::accept(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "acceptor stopped",
                    )));
                }
            }
        };

        if let Some(session) = self.session.take() {
            info!("Closing connection to {}", session.peer);
            session.close();
        }
        self.acceptor.task.abort();
        result
    }

    /// Wait for the first available outcome, no timeout, no priority. The
    /// network source only exists while a session does; without one it
    /// simply never fires.
    async fn next_event(&mut self) -> Event {
        tokio::select! {
            outcome = self.serial.outcome_rx.recv() => Event::SerialRead(outcome),
            outcome = Self::next_net_outcome(&mut self.session) => Event::NetRead(outcome),
            accepted = self.acceptor.outcome_rx.recv() => Event::Accepted(accepted),
        }
    }

    async fn next_net_outcome(session: &mut Option<Session>) -> Option<ReadOutcome> {
        match session {
            Some(session) => session.reader.outcome_rx.recv().await,
            None => std::future::pending().await,
        }
    }

    async fn on_serial_read(&mut self, outcome: ReadOutcome) {
        let ReadOutcome { buf, len, error } = outcome;
        if let Some(err) = error {
            error!("Serial read failed: {}", err);
            self.fatal = Some(Error::serial_io("read", err));
            return;
        }
        trace!("Read from serial: {}", hex::encode(&buf[..len]));

        match &mut self.session {
            Some(session) => {
                debug!("Relaying {} bytes serial -> {}", len, session.peer);
                pace(self.pacing.tcp_before_write).await;
                trace!("Write to IP: {}", hex::encode(&buf[..len]));
                if let Err(err) = session.writer.write_all(&buf[..len]).await {
                    error!("Write to {} failed: {}", session.peer, err);
                    session.error = Some(err);
                }
                // Released regardless of the write result; the serial side
                // keeps its cadence while the connection gets recycled.
                self.serial.release(buf);
                pace(self.pacing.tcp_after_write).await;
            }
            None => {
                debug!("No client connected, dropping {} bytes from serial", len);
                self.serial.release(buf);
            }
        }
    }

    async fn on_net_read(&mut self, outcome: ReadOutcome) {
        let session = match &mut self.session {
            Some(session) => session,
            None => return,
        };

        let ReadOutcome { buf, len, error } = outcome;
        if let Some(err) = error {
            debug!("Connection read from {} ended: {}", session.peer, err);
            session.error = Some(err);
            return;
        }
        trace!("Read from IP: {}", hex::encode(&buf[..len]));

        debug!("Relaying {} bytes {} -> serial", len, session.peer);
        pace(self.pacing.serial_before_write).await;
        trace!("Write to serial: {}", hex::encode(&buf[..len]));
        match self.serial.write(buf[..len].to_vec()).await {
            Ok(()) => session.reader.release(buf).await,
            Err(err) => {
                // No release: that direction stays parked while the fatal
                // teardown below closes the whole session.
                error!("Serial write failed: {}", err);
                self.fatal = Some(Error::serial_io("write", err));
            }
        }
        pace(self.pacing.serial_after_write).await;
    }

    fn adopt(&mut self, stream: TcpStream, peer: SocketAddr) {
        if let Some(old) = self.session.take() {
            // Unreachable through the release discipline; never hold two
            // live handles.
            warn!("Adopting {} with a session still active, closing the old one", peer);
            old.close();
        }
        info!("Client connected from {}", peer);
        let (read_half, writer) = stream.into_split();
        let reader = spawn_net_reader(read_half, self.tcp_buffer_size, self.pacing.before_read);
        self.session = Some(Session { writer, peer, reader, error: None });
    }
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ============================================================================
// Tests
// ============================================================================
