//! AHU Multisensor CLI
//!
//! A command-line interface (CLI) application for polling an air handling
//! unit multisensor over Modbus RTU (serial).
//!
//! This tool allows users to:
//! - Read the current fan speed, multisensor temperature and occupancy state.
//! - Run in a continuous daemon mode to poll all readings and either print
//!   them to the console or publish them to an MQTT broker.
//!
//! The CLI leverages the `airunit_lib` crate for protocol definitions and
//! client operations.

use airunit_lib::{
    client::AirUnit,
    poller::{Poller, ReadingOutcome},
    transport::SerialTransport,
};
use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::panic;

mod commandline;
mod mqtt;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0)); // Provide defaults

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic", // Optional target for filtering
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Installs a Ctrl-C handler that clears the returned flag.
fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        r.store(false, Ordering::SeqCst);
    })
    .with_context(|| "Cannot set Ctrl-C handler")?;
    Ok(running)
}

fn print_outcome(outcome: &ReadingOutcome) {
    match outcome {
        Ok(observation) => {
            println!(
                "{} {}: {}",
                humantime::format_rfc3339_seconds(observation.timestamp),
                observation.reading,
                observation.value
            );
        }
        Err(diagnostic) => {
            println!(
                "{}: read failed ({})",
                diagnostic.reading, diagnostic.kind
            );
        }
    }
}

fn print_cycle(poller: &mut Poller<SerialTransport>) {
    for outcome in poller.poll_cycle() {
        print_outcome(&outcome);
    }
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // 1. Initialize logging as early as possible
    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "AHU Multisensor CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    // 2. Open the serial port and build the client
    info!(
        "Attempting to connect via RTU to device {} (Address: {}, Baud: {})...",
        args.device, args.address, args.baud_rate
    );
    let transport = SerialTransport::open(
        &args.device,
        args.baud_rate,
        args.parity,
        args.stop_bits,
        args.timeout,
    )
    .with_context(|| format!("Cannot open serial port {}", args.device))?;
    let mut client = AirUnit::new(transport, args.address);

    // 3. Execute the command
    match &args.command {
        commandline::CliCommands::Daemon {
            poll_interval,
            output,
        } => {
            info!("Starting daemon mode: output={output:?}, interval={poll_interval:?}");
            let mut poller = Poller::new(client);
            let running = shutdown_flag()?;
            match output {
                commandline::DaemonOutput::Console => {
                    while running.load(Ordering::SeqCst) {
                        debug!("Daemon: Polling readings for stdout...");
                        print_cycle(&mut poller);
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        std::thread::sleep(*poll_interval);
                    }
                }
                commandline::DaemonOutput::Mqtt { config_file } => {
                    mqtt::run_daemon(&mut poller, poll_interval, config_file, &running)?;
                }
            }
            info!("Daemon stopped");
        }
        commandline::CliCommands::Read => {
            info!("Executing: Read All Readings");
            let mut poller = Poller::new(client);
            print_cycle(&mut poller);
        }
        commandline::CliCommands::ReadFanSpeed => {
            info!("Executing: Read Fan Speed");
            let fan_speed = client
                .read_fan_speed()
                .with_context(|| "Cannot read fan speed")?;
            println!("FAN_SPEED: {fan_speed}");
        }
        commandline::CliCommands::ReadTemperature => {
            info!("Executing: Read Multisensor Temperature");
            let temperature = client
                .read_multisensor_temperature()
                .with_context(|| "Cannot read multisensor temperature")?;
            println!("Multisensor_temp: {temperature}");
        }
        commandline::CliCommands::ReadState => {
            info!("Executing: Read Occupancy State");
            let state = client
                .read_occupancy_state()
                .with_context(|| "Cannot read occupancy state")?;
            println!("state: {state}");
        }
    }

    Ok(())
}
