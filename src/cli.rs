// src/cli.rs
//
// Command line surface. Delay flags stay strings here; they are parsed into
// durations at startup so a malformed duration gets its own exit code
// instead of folding into generic usage errors.

use clap::Parser;

use crate::config::{parse_duration, PacingConfig};
use crate::error::Error;
use crate::serial::{Parity, SerialSettings, StopBitsArg};

/// Bridge one serial device to one TCP client at a time, raw bytes both ways.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Serial device path, e.g. /dev/ttyUSB0 or COM2.
    #[arg(long)]
    pub serial_port: String,

    /// Baud rate for the serial device.
    #[arg(long, default_value_t = 9600)]
    pub baud_rate: u32,

    /// Parity: N, O, E, M or S.
    #[arg(long, value_enum, ignore_case = true, default_value = "E")]
    pub parity: Parity,

    /// Stop bits: 1, 15 (meaning 1.5) or 2.
    #[arg(long, value_enum, default_value = "1")]
    pub stop_bits: StopBitsArg,

    /// Data bits per character.
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub data_bits: u8,

    /// TCP port to listen on.
    #[arg(long, default_value_t = 9000)]
    pub tcp_port: u16,

    /// Interface address to bind the listener to.
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Delay before every read attempt, serial and network alike.
    #[arg(long, default_value = "1000ms")]
    pub response_interval: String,

    /// Delay before writing network bytes to the serial device.
    #[arg(long, default_value = "0")]
    pub serial_write_delay: String,

    /// Delay after a serial write cycle completes.
    #[arg(long, default_value = "100ms")]
    pub serial_write_settle: String,

    /// Delay before writing serial bytes to the network client.
    #[arg(long, default_value = "0")]
    pub tcp_write_delay: String,

    /// Delay after a network write cycle completes.
    #[arg(long, default_value = "0")]
    pub tcp_write_settle: String,

    /// Serial read chunk capacity in bytes.
    #[arg(long, default_value_t = 64)]
    pub serial_buffer_size: usize,

    /// Network read chunk capacity in bytes.
    #[arg(long, default_value_t = 64)]
    pub tcp_buffer_size: usize,

    /// Log level when RUST_LOG is unset: trace, debug, info, warn or error.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse the five delay flags. Any failure names the offending flag value.
    pub fn pacing(&self) -> Result<PacingConfig, Error> {
        Ok(PacingConfig {
            before_read: parse_duration(&self.response_interval)?,
            serial_before_write: parse_duration(&self.serial_write_delay)?,
            serial_after_write: parse_duration(&self.serial_write_settle)?,
            tcp_before_write: parse_duration(&self.tcp_write_delay)?,
            tcp_after_write: parse_duration(&self.tcp_write_settle)?,
        })
    }

    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings {
            baud_rate: self.baud_rate,
            parity: self.parity,
            stop_bits: self.stop_bits,
            data_bits: self.data_bits,
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.tcp_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_shipped_values() {
        let cli = Cli::try_parse_from(["portlink", "--serial-port", "/dev/ttyUSB0"]).unwrap();
        assert_eq!(cli.serial_port, "/dev/ttyUSB0");
        assert_eq!(cli.baud_rate, 9600);
        assert_eq!(cli.parity, Parity::Even);
        assert_eq!(cli.stop_bits, StopBitsArg::One);
        assert_eq!(cli.data_bits, 8);
        assert_eq!(cli.tcp_port, 9000);
        assert_eq!(cli.listen_addr(), "0.0.0.0:9000");
        assert_eq!(cli.serial_buffer_size, 64);
        assert_eq!(cli.tcp_buffer_size, 64);

        let pacing = cli.pacing().unwrap();
        assert_eq!(pacing.before_read, Duration::from_millis(1000));
        assert_eq!(pacing.serial_after_write, Duration::from_millis(100));
        assert_eq!(pacing.tcp_before_write, Duration::ZERO);
    }

    #[test]
    fn test_serial_port_is_required() {
        assert!(Cli::try_parse_from(["portlink"]).is_err());
    }

    #[test]
    fn test_parity_letters_any_case() {
        let cli =
            Cli::try_parse_from(["portlink", "--serial-port", "COM2", "--parity", "n"]).unwrap();
        assert_eq!(cli.parity, Parity::None);
        let cli =
            Cli::try_parse_from(["portlink", "--serial-port", "COM2", "--parity", "M"]).unwrap();
        assert_eq!(cli.parity, Parity::Mark);
    }

    #[test]
    fn test_bad_duration_is_deferred_to_pacing() {
        // clap accepts the string; the duration parse reports the failure.
        let cli = Cli::try_parse_from([
            "portlink",
            "--serial-port",
            "COM2",
            "--response-interval",
            "banana",
        ])
        .unwrap();
        assert!(cli.pacing().is_err());
    }
}
