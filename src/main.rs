// src/main.rs
//
// Entry point: flag parsing, logging, device and listener setup, then the
// bridge until it fails. Startup failures map to distinct exit codes so
// supervisors can tell a bad flag from a missing device.

use std::process;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use portlink::bridge::{spawn_acceptor, spawn_serial_worker, Bridge};
use portlink::cli::Cli;
use portlink::config::BridgeConfig;
use portlink::error::Error;
use portlink::{logging, serial};

const EXIT_RUNTIME: i32 = 1;
const EXIT_SERIAL_OPEN: i32 = 3;
const EXIT_BAD_DURATION: i32 = 4;
const EXIT_BIND: i32 = 5;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    info!("portlink {} starting", env!("CARGO_PKG_VERSION"));
    info!("Serial port: {}", cli.serial_port);
    info!("Serial settings: {}", serial::describe_settings(&cli.serial_settings()));
    info!("Listen address: {}", cli.listen_addr());
    info!(
        "Pacing: read {}, serial write {}+{}, tcp write {}+{}",
        cli.response_interval,
        cli.serial_write_delay,
        cli.serial_write_settle,
        cli.tcp_write_delay,
        cli.tcp_write_settle
    );
    info!(
        "Buffers: serial {} bytes, tcp {} bytes",
        cli.serial_buffer_size, cli.tcp_buffer_size
    );

    let pacing = match cli.pacing() {
        Ok(pacing) => pacing,
        Err(err) => {
            error!("{}", err);
            process::exit(EXIT_BAD_DURATION);
        }
    };

    let port = match serial::open_port(&cli.serial_port, &cli.serial_settings()) {
        Ok(port) => port,
        Err(err) => {
            error!("{}", err);
            log_available_ports();
            process::exit(EXIT_SERIAL_OPEN);
        }
    };
    info!("Opened {}", cli.serial_port);

    let addr = cli.listen_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("{}", Error::bind(&addr, err));
            process::exit(EXIT_BIND);
        }
    };
    info!("Listening on {}", addr);

    let config = BridgeConfig {
        pacing,
        serial_buffer_size: cli.serial_buffer_size,
        tcp_buffer_size: cli.tcp_buffer_size,
    };
    let serial_link = spawn_serial_worker(port, config.serial_buffer_size, pacing.before_read);
    let acceptor = spawn_acceptor(listener);

    if let Err(err) = Bridge::new(serial_link, acceptor, config).run().await {
        error!("Bridge terminated: {}", err);
        process::exit(EXIT_RUNTIME);
    }
}

fn log_available_ports() {
    if let Ok(ports) = serialport::available_ports() {
        if ports.is_empty() {
            info!("No serial ports detected on this system");
        }
        for port in ports {
            info!("Available serial port: {}", port.port_name);
        }
    }
}
