//! Best-effort accessors for interactive polling tools.
//!
//! [`BestEffortClient`] sits on top of the strict [`IoLinkMaster`] and never
//! fails: when an exchange fails it logs the error and returns a documented
//! default instead. Callers that need to see failures use
//! [`BestEffortClient::strict`] or the [`IoLinkMaster`] directly.
//!
//! Temperatures are the exception to the defaults: a reading that cannot be
//! obtained or decoded is reported as `None`, never as a made-up number.
//!
//! ## Example
//!
//! ```no_run
//! use iolink_master_lib::{
//!     best_effort_client::BestEffortClient,
//!     sync_client::{GatewayConfig, IoLinkMaster},
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let master = IoLinkMaster::connect(&GatewayConfig::default())?;
//!     let client = BestEffortClient::new(master);
//!
//!     for report in client.scan_all_ports(None) {
//!         println!("{report:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```

use crate::{error::Result, protocol as proto, sync_client::IoLinkMaster};
use log::*;
use serde::Serialize;

/// Port count assumed when the master cannot report it (the AL1350 has 4 ports).
pub const FALLBACK_PORT_COUNT: u16 = 4;
/// Status assumed when it cannot be read: disconnected.
pub const DEFAULT_DEVICE_STATUS: &str = "0";
/// Product name assumed when it cannot be read.
pub const DEFAULT_DEVICE_NAME: &str = "Unknown";
/// Process data assumed when it cannot be read.
pub const DEFAULT_PROCESS_DATA: &str = "0x0000";

/// Scan result of one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortReport {
    pub port: proto::Port,
    pub status: String,
    pub connected: bool,
    /// Only present for connected ports.
    #[serde(flatten)]
    pub device: Option<DeviceReport>,
}

/// What was read from a connected device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceReport {
    pub device_name: String,
    pub raw_data: String,
    pub temperature_c: Option<proto::Temperature>,
}

/// Never-failing wrapper around an [`IoLinkMaster`].
#[derive(Debug, Clone)]
pub struct BestEffortClient {
    master: IoLinkMaster,
}

fn or_default<T>(result: Result<T>, what: &str, default: T) -> T {
    result.unwrap_or_else(|error| {
        warn!("Cannot read {what}, using default: {error}");
        default
    })
}

impl BestEffortClient {
    pub fn new(master: IoLinkMaster) -> Self {
        Self { master }
    }

    /// The strict client underneath.
    pub fn strict(&self) -> &IoLinkMaster {
        &self.master
    }

    pub fn into_inner(self) -> IoLinkMaster {
        self.master
    }

    /// Number of ports, [`FALLBACK_PORT_COUNT`] if it cannot be read.
    pub fn port_count(&self, cid: Option<u32>) -> u16 {
        or_default(
            self.master.read_port_count(cid),
            "port count",
            FALLBACK_PORT_COUNT,
        )
    }

    /// Device status of a port, [`DEFAULT_DEVICE_STATUS`] if it cannot be read.
    pub fn device_status(&self, port: proto::Port, cid: Option<u32>) -> String {
        or_default(
            self.master.read_device_status(port, cid),
            &format!("status of port {port}"),
            DEFAULT_DEVICE_STATUS.to_string(),
        )
    }

    /// Product name of a port's device, [`DEFAULT_DEVICE_NAME`] if it cannot be read.
    pub fn device_name(&self, port: proto::Port, cid: Option<u32>) -> String {
        or_default(
            self.master.read_product_name(port, cid),
            &format!("product name of port {port}"),
            DEFAULT_DEVICE_NAME.to_string(),
        )
    }

    /// Raw process data of a port, [`DEFAULT_PROCESS_DATA`] if it cannot be read.
    pub fn device_data(&self, port: proto::Port, cid: Option<u32>) -> String {
        or_default(
            self.master.read_process_data(port, cid),
            &format!("process data of port {port}"),
            DEFAULT_PROCESS_DATA.to_string(),
        )
    }

    /// Temperature of a port's TV7105 sensor, `None` if it cannot be read or decoded.
    pub fn temperature(&self, port: proto::Port, cid: Option<u32>) -> Option<proto::Temperature> {
        match self.master.read_temperature(port, cid) {
            Ok(temperature) => Some(temperature),
            Err(error) => {
                warn!("No temperature for port {port}: {error}");
                None
            }
        }
    }

    fn read_device(&self, port: proto::Port, cid: Option<u32>) -> DeviceReport {
        let device_name = self.device_name(port, cid);
        // The raw data and the temperature come from the same exchange.
        let (raw_data, temperature_c) = match self.master.read_process_data(port, cid) {
            Ok(raw_data) => {
                let temperature = match proto::decode_pdin(raw_data.as_str()) {
                    Ok(temperature) => Some(temperature),
                    Err(error) => {
                        warn!("No temperature for port {port}: {error}");
                        None
                    }
                };
                (raw_data, temperature)
            }
            Err(error) => {
                warn!("Cannot read process data of port {port}, using default: {error}");
                (DEFAULT_PROCESS_DATA.to_string(), None)
            }
        };
        DeviceReport {
            device_name,
            raw_data,
            temperature_c,
        }
    }

    /// Reads every port `1..=N`, where `N` is [`BestEffortClient::port_count`].
    ///
    /// Connected ports (status `"2"`) additionally report product name,
    /// process data and temperature. Never fails, an unreachable master
    /// yields [`FALLBACK_PORT_COUNT`] disconnected ports.
    pub fn scan_all_ports(&self, cid: Option<u32>) -> Vec<PortReport> {
        let port_count = self.port_count(cid);
        info!("Scanning {port_count} ports");
        proto::Port::all(port_count)
            .map(|port| {
                let status = self.device_status(port, cid);
                let connected = proto::is_connected(&status);
                debug!("Port {port}: status {status}");
                let device = connected.then(|| self.read_device(port, cid));
                PortReport {
                    port,
                    status,
                    connected,
                    device,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync_client::GatewayConfig;
    use crate::test_support::{unused_host, StubGateway, StubResponse};

    fn port(n: u16) -> proto::Port {
        proto::Port::try_from(n).unwrap()
    }

    fn client(stub: &StubGateway) -> BestEffortClient {
        BestEffortClient::new(IoLinkMaster::connect(&stub.config()).unwrap())
    }

    fn unreachable_client() -> BestEffortClient {
        BestEffortClient::new(
            IoLinkMaster::without_probe(&GatewayConfig::new(unused_host())).unwrap(),
        )
    }

    fn assert_defaults(client: &BestEffortClient) {
        assert_eq!(client.port_count(None), FALLBACK_PORT_COUNT);
        assert_eq!(client.device_status(port(1), None), "0");
        assert_eq!(client.device_name(port(1), None), "Unknown");
        assert_eq!(client.device_data(port(1), None), "0x0000");
        assert_eq!(client.temperature(port(1), None), None);
    }

    #[test]
    fn defaults_when_unreachable() {
        assert_defaults(&unreachable_client());
    }

    #[test]
    fn defaults_when_not_found() {
        let stub = StubGateway::start(|_| StubResponse::ok(r#"{"cid":1,"code":404}"#));
        assert_defaults(&client(&stub));
    }

    #[test]
    fn defaults_on_gateway_errors() {
        let stub = StubGateway::start(|_| StubResponse::ok(r#"{"cid":1,"code":500}"#));
        assert_defaults(&client(&stub));

        let stub = StubGateway::start(|_| StubResponse::status(503, "busy"));
        assert_defaults(&client(&stub));
    }

    #[test]
    fn fallback_port_count_on_garbage() {
        let stub = StubGateway::start(|_| StubResponse::envelope("invalid"));
        assert_eq!(client(&stub).port_count(None), FALLBACK_PORT_COUNT);
    }

    #[test]
    fn values_when_answered() {
        let stub = StubGateway::start(|adr| match adr {
            "/iolinkmaster/port/numberofports/getdata" => StubResponse::envelope("8"),
            "/iolinkmaster/port[1]/iolinkdevice/status/getdata" => StubResponse::envelope("2"),
            "/iolinkmaster/port[1]/iolinkdevice/productname/getdata" => {
                StubResponse::envelope("TV7105")
            }
            _ => StubResponse::envelope("0x00FF0000"),
        });
        let client = client(&stub);
        assert_eq!(client.port_count(None), 8);
        assert_eq!(client.device_status(port(1), None), "2");
        assert_eq!(client.device_name(port(1), None), "TV7105");
        assert_eq!(client.device_data(port(1), None), "0x00FF0000");
        assert_eq!(client.temperature(port(1), None).unwrap().to_string(), "25.5");
    }

    #[test]
    fn temperature_is_absent_when_out_of_range() {
        let stub = StubGateway::start(|_| StubResponse::envelope("0xFFFF0000"));
        assert_eq!(client(&stub).temperature(port(1), None), None);
    }

    #[test]
    fn scan_without_connected_devices() {
        let stub = StubGateway::start(|adr| match adr {
            "/iolinkmaster/port/numberofports/getdata" => StubResponse::envelope("4"),
            _ => StubResponse::envelope("1"),
        });
        let reports = client(&stub).scan_all_ports(None);
        assert_eq!(reports.len(), 4);
        for (report, n) in reports.iter().zip(1..) {
            assert_eq!(*report.port, n);
            assert_eq!(report.status, "1");
            assert!(!report.connected);
            assert_eq!(report.device, None);
        }
        // Only port count and status were asked for.
        assert_eq!(stub.requests().len(), 5);
    }

    #[test]
    fn scan_reports_connected_devices() {
        let stub = StubGateway::start(|adr| match adr {
            "/iolinkmaster/port/numberofports/getdata" => StubResponse::envelope("3"),
            "/iolinkmaster/port[2]/iolinkdevice/status/getdata" => StubResponse::envelope("2"),
            "/iolinkmaster/port[3]/iolinkdevice/status/getdata" => StubResponse::envelope("2"),
            "/iolinkmaster/port[2]/iolinkdevice/productname/getdata" => {
                StubResponse::envelope("TV7105")
            }
            "/iolinkmaster/port[2]/iolinkdevice/pdin/getdata" => {
                StubResponse::envelope("0x01570000")
            }
            "/iolinkmaster/port[3]/iolinkdevice/pdin/getdata" => StubResponse::envelope("0xZZ"),
            adr if adr.ends_with("/status/getdata") => StubResponse::envelope("0"),
            _ => StubResponse::ok(r#"{"cid":1,"code":404}"#),
        });
        let reports = client(&stub).scan_all_ports(None);
        assert_eq!(reports.len(), 3);

        assert!(!reports[0].connected);
        assert_eq!(reports[0].device, None);

        let device = reports[1].device.as_ref().unwrap();
        assert!(reports[1].connected);
        assert_eq!(device.device_name, "TV7105");
        assert_eq!(device.raw_data, "0x01570000");
        assert_eq!(device.temperature_c.unwrap().to_string(), "34.3");

        let device = reports[2].device.as_ref().unwrap();
        assert_eq!(device.device_name, "Unknown");
        assert_eq!(device.raw_data, "0xZZ");
        assert_eq!(device.temperature_c, None);
    }

    #[test]
    fn scan_never_fails_when_unreachable() {
        let reports = unreachable_client().scan_all_ports(None);
        assert_eq!(reports.len(), FALLBACK_PORT_COUNT as usize);
        assert!(reports.iter().all(|report| !report.connected && report.device.is_none()));
    }

    #[test]
    fn report_json() {
        let report = PortReport {
            port: port(2),
            status: "2".to_string(),
            connected: true,
            device: Some(DeviceReport {
                device_name: "TV7105".to_string(),
                raw_data: "0x00FF0000".to_string(),
                temperature_c: proto::decode_pdin("0x00FF0000").ok(),
            }),
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "port": 2,
                "status": "2",
                "connected": true,
                "device_name": "TV7105",
                "raw_data": "0x00FF0000",
                "temperature_c": 25.5,
            })
        );

        let report = PortReport {
            port: port(1),
            status: "0".to_string(),
            connected: false,
            device: None,
        };
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({"port": 1, "status": "0", "connected": false})
        );
    }
}
