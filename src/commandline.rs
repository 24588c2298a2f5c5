use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use iolink_master_lib::protocol as proto;
use std::path::PathBuf;
use std::time::Duration;

fn parse_port(s: &str) -> Result<proto::Port, String> {
    let port_num =
        clap_num::maybe_hex::<u16>(s).map_err(|e| format!("Invalid port number format: {e}"))?;
    proto::Port::try_from(port_num).map_err(|e| e.to_string())
}

fn parse_cid(s: &str) -> Result<u32, String> {
    clap_num::maybe_hex::<u32>(s).map_err(|e| format!("Invalid correlation id format: {e}"))
}

fn parse_degree_celsius(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .map_err(|e| format!("Invalid temperature value format: {e}"))
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Scan all ports and show the connected devices with their process data.
    Scan {
        /// Print the scan result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Read and display the number of ports of the IO-Link master.
    PortCount,

    /// Read and display the device status of a port ("2" means connected).
    Status {
        /// Port number, starting at 1.
        #[arg(value_parser = parse_port)]
        port: proto::Port,
    },

    /// Read and display the product name of the device on a port.
    Name {
        /// Port number, starting at 1.
        #[arg(value_parser = parse_port)]
        port: proto::Port,
    },

    /// Read and display the raw process data of the device on a port.
    Data {
        /// Port number, starting at 1.
        #[arg(value_parser = parse_port)]
        port: proto::Port,
    },

    /// Read and display the temperature of a TV7105 sensor on a port.
    Temperature {
        /// Port number, starting at 1.
        #[arg(value_parser = parse_port)]
        port: proto::Port,
    },

    /// Send a raw read request for a data point address and display the answer.
    /// Unlike the other commands, failures are reported as errors.
    /// Example: "/iolinkmaster/port[1]/iolinkdevice/pdin/getdata".
    #[clap(verbatim_doc_comment)]
    Send {
        /// The data point address.
        address: String,
    },

    /// Decode TV7105 process data without contacting the IO-Link master.
    /// Example: "0x01570000" or "0157".
    #[clap(verbatim_doc_comment)]
    Decode {
        /// Hexadecimal process data, optionally prefixed with "0x".
        payload: String,
    },

    /// Continuously poll the temperature of a port and print running statistics.
    /// Stops on Ctrl-C or after the given duration and prints a summary.
    #[clap(verbatim_doc_comment)]
    Monitor {
        /// Port number, starting at 1.
        #[arg(value_parser = parse_port)]
        port: proto::Port,

        /// Interval between readings (e.g., "5s", "1m")
        #[arg(value_parser = humantime::parse_duration, short, long, default_value = "5s")]
        poll_interval: Duration,

        /// Stop after this duration (e.g., "30s"). Runs until Ctrl-C if omitted.
        #[arg(value_parser = humantime::parse_duration, short, long)]
        duration: Option<Duration>,

        /// Print an alert when the temperature rises above this value (°C).
        #[arg(long, value_parser = parse_degree_celsius, allow_negative_numbers = true)]
        high_alert: Option<f64>,

        /// Print an alert when the temperature falls below this value (°C).
        #[arg(long, value_parser = parse_degree_celsius, allow_negative_numbers = true)]
        low_alert: Option<f64>,
    },
}

const fn about_text() -> &'static str {
    "IO-Link Master CLI - Poll ports and sensors of an ifm AL1350 IO-Link master via its JSON API."
}

#[derive(Parser, Debug)]
#[command(name="iolmaster", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is warnings.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// YAML configuration file.
    /// Defaults to "iolmaster.yml" in the working directory if it exists.
    #[arg(global = true, long, verbatim_doc_comment)]
    pub config: Option<PathBuf>,

    /// Host name or IP address of the IO-Link master, optionally with port.
    /// Examples: "192.168.1.101", "169.254.178.135:80".
    #[arg(global = true, long, verbatim_doc_comment)]
    pub host: Option<String>,

    /// I/O timeout of every request.
    /// Examples: "5s", "500ms".
    #[arg(global = true, long, value_parser = humantime::parse_duration, verbatim_doc_comment)]
    pub timeout: Option<Duration>,

    /// Correlation id ("cid") sent with every request.
    /// Can be specified in decimal or hexadecimal.
    #[arg(global = true, long, value_parser = parse_cid, verbatim_doc_comment)]
    pub cid: Option<u32>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: CliCommands,
}
