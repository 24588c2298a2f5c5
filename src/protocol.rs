//! Protocol definitions for the ifm AL1350 IO-Link master JSON API.
//!
//! The master exposes a single HTTP endpoint at its root path. Every exchange
//! is one JSON request envelope naming a data point address, answered by one
//! JSON response envelope carrying an application status code and the data.
//!
//! This module holds everything that has a fixed contract:
//! - the hierarchical data point addresses ([`Endpoint`]),
//! - the request and response envelopes ([`Request`], [`Response`]),
//! - the process data decoder for the TV7105 temperature sensor ([`decode_pdin`]).
//!
//! Nothing in here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Errors raised while validating or decoding protocol values.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The process data is not a usable hexadecimal payload.
    #[error("Malformed process data '{payload}': {reason}")]
    MalformedPayload {
        payload: String,
        reason: &'static str,
    },

    /// The decoded value lies outside the sensor's physical range.
    #[error(
        "Temperature {0} °C is outside the sensor range ({min} °C to {max} °C)",
        min = Temperature::MIN,
        max = Temperature::MAX
    )]
    OutOfRange(f64),

    /// Port numbers are 1-based.
    #[error("Invalid port number {0}, ports are numbered from {min}", min = Port::MIN)]
    InvalidPort(u16),
}

impl Error {
    fn malformed(payload: &str, reason: &'static str) -> Self {
        Error::MalformedPayload {
            payload: payload.to_string(),
            reason,
        }
    }
}

/// A physical port of the IO-Link master (1-based).
///
/// No upper bound is enforced here, the number of ports depends on the
/// master model and is reported by [`Endpoint::NumberOfPorts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Port(u16);

impl Port {
    /// The first port number.
    pub const MIN: u16 = 1;

    /// Iterates over the ports `1..=count`.
    pub fn all(count: u16) -> impl Iterator<Item = Port> {
        (Self::MIN..=count).map(Port)
    }
}

impl Deref for Port {
    type Target = u16;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u16> for Port {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value < Self::MIN {
            Err(Error::InvalidPort(value))
        } else {
            Ok(Self(value))
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A per-port attribute of the connected IO-Link device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceAttribute {
    /// Connection status, `"2"` means a device is connected and operating.
    Status,
    /// Product name reported by the device.
    ProductName,
    /// Raw process data input as a hexadecimal string.
    ProcessDataIn,
}

impl DeviceAttribute {
    fn path_segment(&self) -> &'static str {
        match self {
            DeviceAttribute::Status => "status",
            DeviceAttribute::ProductName => "productname",
            DeviceAttribute::ProcessDataIn => "pdin",
        }
    }
}

/// A readable data point of the IO-Link master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The total number of ports.
    NumberOfPorts,
    /// An attribute of the device connected to a port.
    Device(Port, DeviceAttribute),
}

impl Endpoint {
    /// Builds the hierarchical address string sent as `adr`.
    pub fn address(&self) -> String {
        match self {
            Endpoint::NumberOfPorts => "/iolinkmaster/port/numberofports/getdata".to_string(),
            Endpoint::Device(port, attribute) => format!(
                "/iolinkmaster/port[{port}]/iolinkdevice/{}/getdata",
                attribute.path_segment()
            ),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// Status string of a port with a connected, operating device.
pub const STATUS_CONNECTED: &str = "2";

/// Returns `true` if a port status string reports a connected device.
pub fn is_connected(status: &str) -> bool {
    status.trim() == STATUS_CONNECTED
}

/// Operation code of every read request.
pub const REQUEST_CODE: &str = "request";

/// The request envelope: `{"code": "request", "cid": <int>, "adr": "<address>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Request<'a> {
    pub code: &'static str,
    pub cid: u32,
    pub adr: &'a str,
}

impl<'a> Request<'a> {
    pub fn new(cid: u32, adr: &'a str) -> Self {
        Self {
            code: REQUEST_CODE,
            cid,
            adr,
        }
    }
}

/// Application status code of a successful exchange.
pub const CODE_OK: i64 = 200;
/// Application status code of an address unknown to the firmware.
pub const CODE_NOT_FOUND: i64 = 404;

/// The response envelope: `{"code": <int>, "data": {"value": ...} | <scalar>}`.
///
/// `code` must be a JSON integer. A body that carries a `code` of any other
/// type (e.g. `{"code": "404"}`) is not an envelope, see [`Response::has_code`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    pub code: i64,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl Response {
    /// Parses a response body.
    ///
    /// Returns `None` if the body is not a response envelope, some endpoints
    /// answer with plain text instead.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Whether `body` is a JSON object with a `code` member of any type.
    ///
    /// Such a body was meant as an envelope even if [`Response::parse`]
    /// rejects it, so it must not be taken for plain text.
    pub fn has_code(body: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(body)
            .is_ok_and(|value| value.get("code").is_some())
    }

    /// The nested `value` field if present, otherwise the whole data payload,
    /// as a string. `None` if the response carries no data.
    pub fn value(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        Some(match data.get("value") {
            Some(value) => stringify(value),
            None => stringify(data),
        })
    }
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Marker optionally prefixing hexadecimal process data.
pub const PAYLOAD_MARKER: &str = "0x";
/// Hex digits of the 16-bit temperature field at the start of the process data.
pub const TEMPERATURE_FIELD_LEN: usize = 4;

/// A validated TV7105 temperature in degrees Celsius (°C).
///
/// A `Temperature` is always within [`Temperature::MIN`]..=[`Temperature::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    /// Lower bound of the sensor range in °C.
    pub const MIN: f64 = -53.7;
    /// Upper bound of the sensor range in °C.
    pub const MAX: f64 = 157.5;
    /// °C per digit of the measurement value (TV7105 datasheet).
    pub const SCALE: f64 = 0.1;

    /// Converts a raw 16-bit measurement value, `value = measurement * 0.1`.
    pub fn from_measurement(measurement: u16) -> Result<Self, Error> {
        Self::try_from(measurement as f64 * Self::SCALE)
    }

    pub fn as_degree_celsius(&self) -> f64 {
        self.0
    }
}

impl Deref for Temperature {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<f64> for Temperature {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::OutOfRange(value))
        }
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

fn parse_measurement(field: &str) -> Option<u16> {
    // `from_str_radix` alone would accept a leading sign.
    if field.len() == TEMPERATURE_FIELD_LEN && field.bytes().all(|b| b.is_ascii_hexdigit()) {
        u16::from_str_radix(field, 16).ok()
    } else {
        None
    }
}

/// Decodes the temperature from a TV7105 process data payload.
///
/// The payload is a hexadecimal string, optionally prefixed with `0x`. The
/// first 16 bits (4 hex digits, big-endian) carry the measurement value,
/// the remaining digits are auxiliary data and ignored.
///
/// # Errors
///
/// * [`Error::MalformedPayload`] if the payload is absent, has fewer than 4 hex
///   digits, an odd number of digits or a non-hex temperature field.
/// * [`Error::OutOfRange`] if the decoded value is outside the sensor range.
///
/// # Examples
///
/// ```
/// use iolink_master_lib::protocol::decode_pdin;
///
/// let temperature = decode_pdin("0x01570000").unwrap();
/// assert_eq!(temperature.to_string(), "34.3");
/// assert!(decode_pdin(None).is_err());
/// ```
pub fn decode_pdin<'a>(payload: impl Into<Option<&'a str>>) -> Result<Temperature, Error> {
    let payload = payload
        .into()
        .ok_or_else(|| Error::malformed("", "no process data"))?;
    let hex = payload.strip_prefix(PAYLOAD_MARKER).unwrap_or(payload);
    if hex.len() < TEMPERATURE_FIELD_LEN {
        return Err(Error::malformed(payload, "fewer than 4 hex digits"));
    }
    if hex.len() % 2 != 0 {
        return Err(Error::malformed(payload, "odd number of hex digits"));
    }
    let measurement = hex
        .get(..TEMPERATURE_FIELD_LEN)
        .and_then(parse_measurement)
        .ok_or_else(|| Error::malformed(payload, "temperature field is not hexadecimal"))?;
    Temperature::from_measurement(measurement)
}

/// Decodes an already isolated temperature field such as `"0x0157"`.
///
/// The field must be the `0x` marker followed by exactly 4 hex digits.
pub fn decode_temperature_field<'a>(
    field: impl Into<Option<&'a str>>,
) -> Result<Temperature, Error> {
    let field = field
        .into()
        .ok_or_else(|| Error::malformed("", "no temperature field"))?;
    let hex = field
        .strip_prefix(PAYLOAD_MARKER)
        .ok_or_else(|| Error::malformed(field, "missing 0x marker"))?;
    let measurement = parse_measurement(hex)
        .ok_or_else(|| Error::malformed(field, "expected exactly 4 hex digits"))?;
    Temperature::from_measurement(measurement)
}

/// Like [`decode_temperature_field`], but reports any failure as `None`.
pub fn hex_to_temperature(hex: Option<&str>) -> Option<Temperature> {
    match decode_temperature_field(hex) {
        Ok(temperature) => Some(temperature),
        Err(error) => {
            log::debug!("Cannot convert {hex:?} to a temperature: {error}");
            None
        }
    }
}
