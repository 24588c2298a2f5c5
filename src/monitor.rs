//! Continuous temperature polling of a single port.
//!
//! [`run`] polls a port through a [`BestEffortClient`] until it is stopped or
//! the configured duration elapses, and hands every [`Reading`] together with
//! the running [`MonitorStats`] to a callback. Formatting the readings is up
//! to the caller.

use crate::{best_effort_client::BestEffortClient, protocol as proto};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};

/// Granularity at which a sleeping monitor notices that it was stopped.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorOptions {
    pub poll_interval: Duration,
    /// Runs until stopped if `None`.
    pub duration: Option<Duration>,
    pub high_alert: Option<f64>,
    pub low_alert: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    High,
    Low,
}

impl MonitorOptions {
    pub fn check_alert(&self, temperature: proto::Temperature) -> Option<Alert> {
        match (self.high_alert, self.low_alert) {
            (Some(high), _) if *temperature > high => Some(Alert::High),
            (_, Some(low)) if *temperature < low => Some(Alert::Low),
            _ => None,
        }
    }
}

/// One poll of the monitored port.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: SystemTime,
    /// `None` if the temperature could not be read or decoded.
    pub temperature: Option<proto::Temperature>,
    pub alert: Option<Alert>,
}

/// Running statistics over all readings of a monitoring session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStats {
    readings: u32,
    valid: u32,
    min: Option<f64>,
    max: Option<f64>,
    sum: f64,
}

impl MonitorStats {
    pub fn record(&mut self, temperature: Option<proto::Temperature>) {
        self.readings += 1;
        if let Some(temperature) = temperature {
            let value = *temperature;
            self.valid += 1;
            self.sum += value;
            self.min = Some(self.min.map_or(value, |min| min.min(value)));
            self.max = Some(self.max.map_or(value, |max| max.max(value)));
        }
    }

    pub fn readings(&self) -> u32 {
        self.readings
    }

    pub fn valid(&self) -> u32 {
        self.valid
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn average(&self) -> Option<f64> {
        (self.valid > 0).then(|| self.sum / self.valid as f64)
    }

    pub fn range(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }
}

/// Sleeps for `duration` unless `running` is cleared earlier.
fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(STOP_CHECK_INTERVAL.min(deadline - now));
    }
}

/// Polls the temperature of `port` until `running` is cleared or the
/// configured duration has elapsed.
///
/// Unreadable temperatures count as readings, but not as valid ones.
pub fn run<F>(
    client: &BestEffortClient,
    port: proto::Port,
    options: &MonitorOptions,
    running: &AtomicBool,
    mut on_reading: F,
) -> MonitorStats
where
    F: FnMut(&Reading, &MonitorStats),
{
    let mut stats = MonitorStats::default();
    let start = Instant::now();

    while running.load(Ordering::SeqCst) {
        if options.duration.is_some_and(|duration| start.elapsed() >= duration) {
            info!("Monitoring duration elapsed");
            break;
        }

        let temperature = client.temperature(port, None);
        stats.record(temperature);
        let reading = Reading {
            timestamp: SystemTime::now(),
            temperature,
            alert: temperature.and_then(|temperature| options.check_alert(temperature)),
        };
        on_reading(&reading, &stats);

        sleep_while_running(options.poll_interval, running);
    }
    stats
}
