//! A library for polling sensor data from an ifm AL1350 IO-Link master via its JSON API.
//!
//! The IO-Link master exposes one HTTP endpoint that answers JSON request
//! envelopes. This crate builds the data point addresses, performs the
//! exchanges and decodes the process data of a TV7105 temperature sensor.
//!
//! The client API has two tiers:
//!
//! 1.  **Strict client**: [`sync_client::IoLinkMaster`] performs one blocking
//!     exchange per call and returns every failure as an [`error::Error`].
//!
//! 2.  **Best-effort client**: [`best_effort_client::BestEffortClient`] wraps the
//!     strict client for interactive polling tools. It never fails, it logs the
//!     error and returns a documented default instead.
//!
//! ## Features
//!
//! - **Protocol Implementation**: Addresses, request/response envelopes and the TV7105 payload decoder.
//! - **Strongly-Typed API**: Utilizes Rust's type system for protocol correctness (e.g., `Port`, `Endpoint`, `Temperature`).
//! - **Range Validation**: A decoded `Temperature` is always inside the sensor range (-53.7 °C to 157.5 °C).
//! - **Monitoring**: [`monitor::run`] polls one port with running statistics and threshold alerts.
//!
//! ## Quick Start
//!
//! ```no_run
//! use iolink_master_lib::{
//!     protocol::Port,
//!     sync_client::{GatewayConfig, IoLinkMaster},
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect to the IO-Link master, this fails if it does not answer
//!     let master = IoLinkMaster::connect(&GatewayConfig::new("192.168.1.101"))?;
//!
//!     let temperature = master.read_temperature(Port::try_from(1)?, None)?;
//!     println!("Temperature on port 1: {temperature} °C");
//!
//!     Ok(())
//! }
//! ```

pub mod best_effort_client;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod sync_client;

pub use error::{Error, Result};

#[cfg(test)]
pub(crate) mod test_support;
