// src/serial.rs
//
// Serial device parameters and opening.
// Translates CLI-level settings to the serialport crate's types.

use std::time::Duration;

use clap::ValueEnum;
use serialport::{DataBits, Parity as SpParity, SerialPort, StopBits};

use crate::error::Error;

/// Read timeout on the opened port. Bounds how long the serial worker holds
/// the device in one read poll before checking for pending writes.
const READ_POLL_TIMEOUT: Duration = Duration::from_millis(10);

// ============================================================================
// Types
// ============================================================================

/// Parity setting, single-letter flag values as the bridge has always taken
/// them. Mark and space parse but the backend cannot open them (see below).
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum Parity {
    #[value(name = "N", alias = "none")]
    None,
    #[value(name = "O", alias = "odd")]
    Odd,
    #[value(name = "E", alias = "even")]
    Even,
    #[value(name = "M", alias = "mark")]
    Mark,
    #[value(name = "S", alias = "space")]
    Space,
}

/// Stop bits, with `15` meaning 1.5 stop bits.
#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
pub enum StopBitsArg {
    #[value(name = "1")]
    One,
    #[value(name = "15")]
    OnePointFive,
    #[value(name = "2")]
    Two,
}

/// Line settings for the device, straight from the CLI.
#[derive(Clone, Copy, Debug)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBitsArg,
    pub data_bits: u8,
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert our Parity enum to the serialport crate's Parity type. The crate
/// exposes no mark or space variants, so those are open-time errors rather
/// than silently remapped settings.
pub fn to_serialport_parity(p: Parity) -> Result<SpParity, String> {
    match p {
        Parity::None => Ok(SpParity::None),
        Parity::Odd => Ok(SpParity::Odd),
        Parity::Even => Ok(SpParity::Even),
        Parity::Mark => Err("mark parity is not supported by the serial backend".to_string()),
        Parity::Space => Err("space parity is not supported by the serial backend".to_string()),
    }
}

/// Convert stop bits to the serialport crate's StopBits type. 1.5 stop bits
/// has no backend variant and is an open-time error.
pub fn to_serialport_stop_bits(bits: StopBitsArg) -> Result<StopBits, String> {
    match bits {
        StopBitsArg::One => Ok(StopBits::One),
        StopBitsArg::Two => Ok(StopBits::Two),
        StopBitsArg::OnePointFive => {
            Err("1.5 stop bits are not supported by the serial backend".to_string())
        }
    }
}

/// Convert data bits count to the serialport crate's DataBits type.
pub fn to_serialport_data_bits(bits: u8) -> DataBits {
    match bits {
        5 => DataBits::Five,
        6 => DataBits::Six,
        7 => DataBits::Seven,
        _ => DataBits::Eight,
    }
}

// ============================================================================
// Opening
// ============================================================================

/// Open the device with the given line settings and the worker poll timeout.
pub fn open_port(path: &str, settings: &SerialSettings) -> Result<Box<dyn SerialPort>, Error> {
    let parity = to_serialport_parity(settings.parity).map_err(|msg| Error::serial_open(path, msg))?;
    let stop_bits =
        to_serialport_stop_bits(settings.stop_bits).map_err(|msg| Error::serial_open(path, msg))?;

    serialport::new(path, settings.baud_rate)
        .data_bits(to_serialport_data_bits(settings.data_bits))
        .stop_bits(stop_bits)
        .parity(parity)
        .timeout(READ_POLL_TIMEOUT)
        .open()
        .map_err(|e| Error::serial_open(path, e.to_string()))
}

/// One-line summary of the settings for startup logs, e.g. `9600 8-E-1`.
pub fn describe_settings(settings: &SerialSettings) -> String {
    let parity = match settings.parity {
        Parity::None => "N",
        Parity::Odd => "O",
        Parity::Even => "E",
        Parity::Mark => "M",
        Parity::Space => "S",
    };
    let stop = match settings.stop_bits {
        StopBitsArg::One => "1",
        StopBitsArg::OnePointFive => "1.5",
        StopBitsArg::Two => "2",
    };
    format!("{} {}-{}-{}", settings.baud_rate, settings.data_bits, parity, stop)
}

// ============================================================================
// Tests
// ============================================================================
