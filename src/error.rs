// src/error.rs
//
// Crate error type. Startup failures (config, device open, bind) are
// distinguished from runtime failures (serial I/O, accept) so the binary
// can map each to its own exit code.

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum Error {
    /// Malformed configuration value, e.g. a duration flag that does not parse.
    Config { message: String },
    /// The serial device could not be opened or configured.
    SerialOpen { port: String, message: String },
    /// A serial read or write failed at runtime. Always fatal to the bridge.
    SerialIo { context: String, source: io::Error },
    /// The TCP listener could not be bound.
    Bind { addr: String, source: io::Error },
    /// The listener failed while accepting. Fatal to the bridge.
    Accept { source: io::Error },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config { message: message.into() }
    }

    pub fn serial_open(port: &str, message: impl Into<String>) -> Self {
        Error::SerialOpen { port: port.to_string(), message: message.into() }
    }

    pub fn serial_io(context: &str, source: io::Error) -> Self {
        Error::SerialIo { context: context.to_string(), source }
    }

    pub fn bind(addr: &str, source: io::Error) -> Self {
        Error::Bind { addr: addr.to_string(), source }
    }

    pub fn accept(source: io::Error) -> Self {
        Error::Accept { source }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config { message } => write!(f, "Configuration error: {}", message),
            Error::SerialOpen { port, message } => {
                write!(f, "Failed to open serial port {}: {}", port, message)
            }
            Error::SerialIo { context, source } => {
                write!(f, "Serial {} failed: {}", context, source)
            }
            Error::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            Error::Accept { source } => write!(f, "Failed to accept connection: {}", source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::SerialIo { source, .. }
            | Error::Bind { source, .. }
            | Error::Accept { source } => Some(source),
            Error::Config { .. } | Error::SerialOpen { .. } => None,
        }
    }
}
