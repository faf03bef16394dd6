use crate::mqtt::MqttConfig;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::time::Duration;

fn default_device_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn parse_address(s: &str) -> Result<u8, String> {
    let address =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid address format: {e}"))?;
    if !(1..=247).contains(&address) {
        return Err(format!("Address {address} out of range (1-247)"));
    }
    Ok(address)
}

fn parse_parity(s: &str) -> Result<serialport::Parity, String> {
    match s {
        "N" | "n" | "none" => Ok(serialport::Parity::None),
        "E" | "e" | "even" => Ok(serialport::Parity::Even),
        "O" | "o" | "odd" => Ok(serialport::Parity::Odd),
        _ => Err(format!("Invalid parity: '{s}' (expected N, E or O)")),
    }
}

fn parse_stop_bits(s: &str) -> Result<serialport::StopBits, String> {
    match s {
        "1" => Ok(serialport::StopBits::One),
        "2" => Ok(serialport::StopBits::Two),
        _ => Err(format!("Invalid stop bits: '{s}' (expected 1 or 2)")),
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum DaemonOutput {
    /// Continuously poll the readings and print them to the standard output (console).
    Console,
    /// Continuously poll the readings and publish them to an MQTT broker.
    Mqtt {
        /// The configuration file for the MQTT broker
        #[arg(long, default_value_t = MqttConfig::DEFAULT_CONFIG_FILE.to_string())]
        config_file: String,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Run in daemon mode: continuously poll all readings at a specified interval.
    /// Output can be directed to stdout or an MQTT broker.
    #[clap(verbatim_doc_comment)]
    Daemon {
        /// Interval between poll cycles (e.g., "10s", "1m")
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "2sec", verbatim_doc_comment)]
        poll_interval: Duration,

        /// Specifies the output.
        #[command(subcommand)]
        output: DaemonOutput,
    },

    /// Read and display all readings once: fan speed, multisensor temperature and occupancy state.
    Read,

    /// Read and display the current fan speed.
    ReadFanSpeed,

    /// Read and display the current multisensor temperature word.
    ReadTemperature,

    /// Read and display the current occupancy state ("home"/"away").
    ReadState,
}

const fn about_text() -> &'static str {
    "AHU Multisensor CLI - Poll an air handling unit multisensor via Modbus RTU."
}

#[derive(Parser, Debug)]
#[command(name="airmon", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// Serial port device name.
    /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
    #[arg(short, long, default_value_t = default_device_name())]
    pub device: String,

    /// Baud rate for serial communication.
    /// Must match the device's configured baud rate.
    #[arg(long, default_value_t = 9600)]
    pub baud_rate: u32,

    /// Parity for serial communication: N (none), E (even) or O (odd).
    #[arg(long, default_value = "N", value_parser = parse_parity)]
    pub parity: serialport::Parity,

    /// Number of stop bits: 1 or 2.
    #[arg(long, default_value = "1", value_parser = parse_stop_bits)]
    pub stop_bits: serialport::StopBits,

    /// The Modbus RTU device address.
    /// Must be unique on the RS485 bus, ranging from 1 to 247.
    /// Can be specified in decimal or hexadecimal (e.g., "0x01").
    #[arg(short, long, default_value = "1", value_parser = parse_address)]
    pub address: u8,

    /// Modbus I/O timeout for one read/write exchange.
    /// Examples: "1s", "500ms".
    #[arg(long, default_value = "200ms", value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Duration,

    /// The command to execute.
    #[command(subcommand)]
    pub command: CliCommands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_address_accepts_decimal_and_hex() {
        assert_eq!(parse_address("1").unwrap(), 1);
        assert_eq!(parse_address("0xF7").unwrap(), 247);
        assert!(parse_address("0").is_err());
        assert!(parse_address("248").is_err());
    }

    #[test]
    fn parse_parity_rejects_unknown_values() {
        assert_eq!(parse_parity("N").unwrap(), serialport::Parity::None);
        assert_eq!(parse_parity("even").unwrap(), serialport::Parity::Even);
        assert_eq!(parse_parity("O").unwrap(), serialport::Parity::Odd);
        assert!(parse_parity("X").is_err());
    }

    #[test]
    fn parse_stop_bits_rejects_unknown_values() {
        assert_eq!(parse_stop_bits("1").unwrap(), serialport::StopBits::One);
        assert_eq!(parse_stop_bits("2").unwrap(), serialport::StopBits::Two);
        assert!(parse_stop_bits("3").is_err());
    }
}
