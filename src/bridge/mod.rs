// src/bridge/mod.rs
//
// The bridge core: two gated readers, a gated acceptor, and the dispatcher
// that splices them together around one serial device and one TCP client.

mod acceptor;
mod dispatcher;
mod reader;
mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use acceptor::spawn_acceptor;
pub use dispatcher::Bridge;
pub use reader::{spawn_net_reader, spawn_serial_worker};
pub use types::{AcceptOutcome, AcceptorLink, NetLink, ReadOutcome, SerialLink, WriteRequest};
