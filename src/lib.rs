// src/lib.rs
//
// portlink: bridge one serial device to one TCP client at a time.

pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod serial;
