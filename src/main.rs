//! IO-Link Master CLI
//!
//! A command-line interface (CLI) application for polling an ifm AL1350
//! IO-Link master through its JSON API.
//!
//! This tool allows users to:
//! - Scan all ports and list the connected devices with their process data.
//! - Read the port count, device status, product name and process data.
//! - Read the temperature of a TV7105 sensor.
//! - Send raw read requests for arbitrary data point addresses.
//! - Decode TV7105 process data offline.
//! - Monitor a temperature continuously with running statistics and alerts.
//!
//! The CLI leverages the `iolink_master_lib` crate for protocol definitions and client operations.

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use iolink_master_lib::{
    best_effort_client::{BestEffortClient, PortReport},
    monitor::{self, Alert, MonitorStats, Reading},
    protocol as proto,
    sync_client::IoLinkMaster,
};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{
    panic,
    time::{Duration, Instant},
};

mod commandline;
mod config;

/// Log specification for `loglevel`.
///
/// The HTTP stack logs every connection at debug level, so it stays at `warn`
/// unless tracing is requested.
fn log_spec(loglevel: LevelFilter) -> String {
    match loglevel {
        LevelFilter::Trace => loglevel.to_string(),
        _ => {
            let http = loglevel.min(LevelFilter::Warn);
            format!("{loglevel}, reqwest={http}, hyper_util={http}, rustls={http}")
        }
    }
}

/// Starts logging at `loglevel`, `RUST_LOG` takes precedence.
fn logging_init(loglevel: LevelFilter) -> Result<LoggerHandle> {
    let spec = log_spec(loglevel);
    let log_handle = Logger::try_with_env_or_str(&spec)
        .with_context(|| format!("Invalid log specification '{spec}'"))?
        .start()
        .context("Cannot start logging")?;

    // Panics end up in the log as well as on stderr.
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!(target: "iolmaster", "{panic_info}");
        default_hook(panic_info);
    }));
    Ok(log_handle)
}

fn print_scan(reports: &[PortReport]) {
    for report in reports {
        match &report.device {
            Some(device) => {
                println!("Port {}: {}", report.port, device.device_name);
                println!("  Raw data: {}", device.raw_data);
                match device.temperature_c {
                    Some(temperature) => println!("  Temperature: {temperature} °C"),
                    None => println!("  Temperature: unavailable"),
                }
            }
            None => println!("Port {}: no device connected (status {})", report.port, report.status),
        }
    }
    let connected = reports.iter().filter(|report| report.connected).count();
    println!("Scan complete, found {connected} connected device(s).");
}

fn handle_decode(payload: &str) -> Result<()> {
    info!("Executing: Decode process data {payload}");
    let temperature = proto::decode_pdin(payload)
        .with_context(|| format!("Cannot decode process data '{payload}'"))?;
    println!("Temperature: {temperature} °C");
    Ok(())
}

fn print_reading(reading: &Reading, stats: &MonitorStats) {
    let timestamp = humantime::format_rfc3339_seconds(reading.timestamp);
    let Some(temperature) = reading.temperature else {
        println!("[{timestamp}] #{} temperature unavailable", stats.readings());
        return;
    };
    let alert = match reading.alert {
        Some(Alert::High) => "  HIGH TEMPERATURE ALERT",
        Some(Alert::Low) => "  LOW TEMPERATURE ALERT",
        None => "",
    };
    let average = stats.average().unwrap_or(*temperature);
    println!(
        "[{timestamp}] #{} {temperature} °C (avg {average:.1} °C){alert}",
        stats.readings()
    );
}

fn print_summary(stats: &MonitorStats, elapsed: Duration) {
    let elapsed = Duration::from_secs(elapsed.as_secs());
    println!("Monitoring stopped after {}.", humantime::format_duration(elapsed));
    println!(
        "Readings: {} total, {} valid",
        stats.readings(),
        stats.valid()
    );
    if let (Some(min), Some(max), Some(average), Some(range)) =
        (stats.min(), stats.max(), stats.average(), stats.range())
    {
        println!("Min: {min:.1} °C, Max: {max:.1} °C, Avg: {average:.1} °C, Range: {range:.1} °C");
    }
}

fn handle_monitor(
    client: &BestEffortClient,
    port: proto::Port,
    options: &monitor::MonitorOptions,
) -> Result<()> {
    let status = client.device_status(port, None);
    if !proto::is_connected(&status) {
        anyhow::bail!("No device connected on port {port} (status {status})");
    }
    println!(
        "Monitoring {} on port {port} every {}. Press Ctrl-C to stop.",
        client.device_name(port, None),
        humantime::format_duration(options.poll_interval)
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
        trace!("Received Ctrl-C")
    })
    .context("Error setting Ctrl-C handler")?;

    let start = Instant::now();
    let stats = monitor::run(client, port, options, &running, print_reading);
    print_summary(&stats, start.elapsed());
    Ok(())
}

fn main() -> Result<()> {
    let args = commandline::CliArgs::parse();

    // 1. Initialize logging as early as possible
    let _log_handle = logging_init(args.verbose.log_level_filter())?;
    info!(
        "IO-Link Master CLI started. Log level: {}",
        args.verbose.log_level_filter()
    );

    // 2. Decoding works offline
    if let commandline::CliCommands::Decode { payload } = &args.command {
        return handle_decode(payload);
    }

    // 3. Connect to the IO-Link master
    let config = config::Config::load(args.config.as_deref())?.apply_overrides(&args);
    let gateway = config.gateway();
    info!("Attempting to connect to {}...", gateway.base_url());
    let master = IoLinkMaster::connect(&gateway)
        .with_context(|| format!("Cannot reach IO-Link master at {}", gateway.host))?;
    let client = BestEffortClient::new(master);

    // 4. Execute the command
    match &args.command {
        commandline::CliCommands::Scan { json } => {
            info!("Executing: Scan All Ports");
            let reports = client.scan_all_ports(None);
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&reports).context("Cannot serialize scan")?
                );
            } else {
                print_scan(&reports);
            }
        }
        commandline::CliCommands::PortCount => {
            info!("Executing: Read Port Count");
            println!("Number of ports: {}", client.port_count(None));
        }
        commandline::CliCommands::Status { port } => {
            info!("Executing: Read Device Status of Port {port}");
            let status = client.device_status(*port, None);
            let meaning = if proto::is_connected(&status) {
                "connected"
            } else {
                "not connected"
            };
            println!("Port {port} status: {status} ({meaning})");
        }
        commandline::CliCommands::Name { port } => {
            info!("Executing: Read Product Name of Port {port}");
            println!("Port {port} device: {}", client.device_name(*port, None));
        }
        commandline::CliCommands::Data { port } => {
            info!("Executing: Read Process Data of Port {port}");
            println!("Port {port} process data: {}", client.device_data(*port, None));
        }
        commandline::CliCommands::Temperature { port } => {
            info!("Executing: Read Temperature of Port {port}");
            match client.temperature(*port, None) {
                Some(temperature) => println!("Port {port} temperature: {temperature} °C"),
                None => println!("Port {port} temperature: unavailable"),
            }
        }
        commandline::CliCommands::Send { address } => {
            info!("Executing: Send Request for {address}");
            let value = client
                .strict()
                .send(address, None)
                .with_context(|| format!("Request for '{address}' failed"))?;
            println!("{value}");
        }
        commandline::CliCommands::Monitor {
            port,
            poll_interval,
            duration,
            high_alert,
            low_alert,
        } => {
            info!("Executing: Monitor Temperature of Port {port}");
            let options = monitor::MonitorOptions {
                poll_interval: *poll_interval,
                duration: *duration,
                high_alert: *high_alert,
                low_alert: *low_alert,
            };
            handle_monitor(&client, *port, &options)?;
        }
        commandline::CliCommands::Decode { .. } => {
            unreachable!("Decode should be handled earlier.")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_stack_is_quiet_below_trace() {
        assert_eq!(
            log_spec(LevelFilter::Debug),
            "DEBUG, reqwest=WARN, hyper_util=WARN, rustls=WARN"
        );
        assert_eq!(
            log_spec(LevelFilter::Error),
            "ERROR, reqwest=ERROR, hyper_util=ERROR, rustls=ERROR"
        );
        assert_eq!(log_spec(LevelFilter::Trace), "TRACE");
        for level in [LevelFilter::Off, LevelFilter::Warn, LevelFilter::Trace] {
            assert!(flexi_logger::LogSpecification::parse(log_spec(level)).is_ok());
        }
    }
}
