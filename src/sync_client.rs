//! Synchronous HTTP client for the ifm AL1350 IO-Link master.
//!
//! [`IoLinkMaster`] is the strict tier of the client API: every operation
//! performs exactly one blocking request/response exchange and returns every
//! failure to the caller. For interactive polling tools that prefer defaults
//! over errors, wrap it in a
//! [`BestEffortClient`](crate::best_effort_client::BestEffortClient).
//!
//! ## Example
//!
//! ```no_run
//! use iolink_master_lib::{
//!     protocol::Port,
//!     sync_client::{GatewayConfig, IoLinkMaster},
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let master = IoLinkMaster::connect(&GatewayConfig::new("192.168.1.101"))?;
//!
//!     let port = Port::try_from(1)?;
//!     println!("Device on port {port}: {}", master.read_product_name(port, None)?);
//!     println!("Temperature: {} °C", master.read_temperature(port, None)?);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    error::{Error, Result, UnreachableCause},
    protocol as proto,
};
use log::*;
use std::time::Duration;

/// Factory default link-local address of the AL1350.
pub const DEFAULT_HOST: &str = "169.254.178.135";
/// Default timeout of a single exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default correlation id sent as `cid`.
pub const DEFAULT_CID: u32 = 1;

/// Settings used to create an [`IoLinkMaster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Host name or IP address, optionally with port or `http://` scheme.
    pub host: String,
    /// Timeout of every exchange, including the reachability probe.
    pub timeout: Duration,
    /// Correlation id used when an operation does not override it.
    pub cid: u32,
}

impl GatewayConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// The URL of the JSON endpoint at the master's root path.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
            cid: DEFAULT_CID,
        }
    }
}

/// Handle of one IO-Link master.
///
/// The handle is immutable and holds no connection state, so it can be cloned
/// and shared between threads. Each call is a fresh exchange.
#[derive(Debug, Clone)]
pub struct IoLinkMaster {
    http: reqwest::blocking::Client,
    base_url: String,
    timeout: Duration,
    cid: u32,
}

impl IoLinkMaster {
    /// Creates a handle and verifies that the master answers on its root path.
    ///
    /// # Errors
    ///
    /// [`Error::Unreachable`] if the probe fails or answers with a status other than 200.
    pub fn connect(config: &GatewayConfig) -> Result<Self> {
        let master = Self::without_probe(config)?;
        master.probe()?;
        Ok(master)
    }

    pub(crate) fn without_probe(config: &GatewayConfig) -> Result<Self> {
        let base_url = config.base_url();
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::Unreachable {
                url: base_url.clone(),
                cause: err.into(),
            })?;
        Ok(Self {
            http,
            base_url,
            timeout: config.timeout,
            cid: config.cid,
        })
    }

    fn unreachable(&self, cause: impl Into<UnreachableCause>) -> Error {
        Error::Unreachable {
            url: self.base_url.clone(),
            cause: cause.into(),
        }
    }

    fn probe(&self) -> Result<()> {
        debug!("Probing IO-Link master at {}", self.base_url);
        let rsp = self
            .http
            .get(&self.base_url)
            .send()
            .map_err(|err| self.unreachable(err))?;
        let status = rsp.status();
        if status == reqwest::StatusCode::OK {
            info!("Connection to IO-Link master at {} established", self.base_url);
            Ok(())
        } else {
            Err(self.unreachable(UnreachableCause::ProbeRejected(status.as_u16())))
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The correlation id used when an operation gets `None`.
    pub fn cid(&self) -> u32 {
        self.cid
    }

    /// Sends one read request for `address` and returns the answered value.
    ///
    /// # Arguments
    ///
    /// * `address` - The data point address, see [`proto::Endpoint::address`].
    /// * `cid` - Correlation id for this request, the handle's default if `None`.
    ///
    /// # Returns
    ///
    /// The nested `value` of the response data as a string, or the whole data
    /// payload if there is no `value` field. A body that is not a response
    /// envelope is returned as text with surrounding whitespace trimmed.
    ///
    /// # Errors
    ///
    /// * [`Error::Unreachable`] on transport failures, including the timeout.
    /// * [`Error::GatewayError`] on a non-success HTTP status or an application
    ///   code other than 200 and 404.
    /// * [`Error::NotFound`] on application code 404.
    /// * [`Error::MalformedResponse`] on code 200 without data.
    pub fn send(&self, address: &str, cid: Option<u32>) -> Result<String> {
        let request = proto::Request::new(cid.unwrap_or(self.cid), address);
        debug!("Request to {}: {request:?}", self.base_url);
        let rsp = self
            .http
            .post(&self.base_url)
            .json(&request)
            .send()
            .map_err(|err| self.unreachable(err))?;
        let status = rsp.status();
        let body = rsp.text().map_err(|err| self.unreachable(err))?;
        trace!("Response {status} for {address}: {body}");
        if !status.is_success() {
            return Err(Error::GatewayError {
                address: address.to_string(),
                code: status.as_u16().into(),
                body,
            });
        }
        interpret_body(address, body)
    }

    /// Reads one data point, see [`IoLinkMaster::send`].
    pub fn read(&self, endpoint: proto::Endpoint, cid: Option<u32>) -> Result<String> {
        self.send(&endpoint.address(), cid)
    }

    /// Reads the number of ports of the master.
    ///
    /// Older firmware versions do not know this data point and answer
    /// with [`Error::NotFound`].
    pub fn read_port_count(&self, cid: Option<u32>) -> Result<u16> {
        let endpoint = proto::Endpoint::NumberOfPorts;
        let value = self.read(endpoint, cid)?;
        value
            .trim()
            .parse()
            .map_err(|_| Error::MalformedResponse {
                address: endpoint.address(),
                body: value,
                reason: "port count is not an unsigned integer",
            })
    }

    /// Reads the connection status of a port, `"2"` means a device is connected.
    pub fn read_device_status(&self, port: proto::Port, cid: Option<u32>) -> Result<String> {
        self.read(
            proto::Endpoint::Device(port, proto::DeviceAttribute::Status),
            cid,
        )
    }

    /// Reads the product name of the device connected to a port.
    pub fn read_product_name(&self, port: proto::Port, cid: Option<u32>) -> Result<String> {
        self.read(
            proto::Endpoint::Device(port, proto::DeviceAttribute::ProductName),
            cid,
        )
    }

    /// Reads the raw process data (hexadecimal) of the device connected to a port.
    pub fn read_process_data(&self, port: proto::Port, cid: Option<u32>) -> Result<String> {
        self.read(
            proto::Endpoint::Device(port, proto::DeviceAttribute::ProcessDataIn),
            cid,
        )
    }

    /// Reads the process data of a port and decodes it as a TV7105 temperature.
    ///
    /// # Errors
    ///
    /// All errors of [`IoLinkMaster::send`], and [`Error::ProtocolError`] if the
    /// process data cannot be decoded or is out of the sensor range.
    pub fn read_temperature(
        &self,
        port: proto::Port,
        cid: Option<u32>,
    ) -> Result<proto::Temperature> {
        let payload = self.read_process_data(port, cid)?;
        Ok(proto::decode_pdin(payload.as_str())?)
    }
}

fn interpret_body(address: &str, body: String) -> Result<String> {
    let Some(rsp) = proto::Response::parse(&body) else {
        if proto::Response::has_code(&body) {
            return Err(Error::MalformedResponse {
                address: address.to_string(),
                body,
                reason: "status code is not an integer",
            });
        }
        debug!("Answer for {address} is not a response envelope, using it as text");
        return Ok(body.trim().to_string());
    };
    match rsp.code {
        proto::CODE_OK => rsp.value().ok_or_else(|| Error::MalformedResponse {
            address: address.to_string(),
            body,
            reason: "success without data",
        }),
        proto::CODE_NOT_FOUND => Err(Error::NotFound {
            address: address.to_string(),
            body,
        }),
        code => Err(Error::GatewayError {
            address: address.to_string(),
            code,
            body,
        }),
    }
}
