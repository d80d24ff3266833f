//! Data carried between the otcoap components

use crate::error::AddressError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr, SocketAddrV6};

/// A resolved DNS-SD service instance.
///
/// Produced by discovery for each newly added instance and consumed once by
/// whoever asked for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAnnouncement {
    /// Full instance name (e.g., "ot-service._example._udp.local.")
    pub name: String,

    /// Service type (e.g., "_example._udp.local.")
    pub service_type: String,

    /// Advertised host name (e.g., "ot-example.local.")
    pub server: String,

    /// IP address, optionally followed by `%<scope id>` for link-local IPv6
    pub address: String,

    /// Service port
    pub port: u16,

    /// When the instance was resolved
    pub discovered_at: DateTime<Utc>,
}

impl ServiceAnnouncement {
    pub fn new(
        name: impl Into<String>,
        service_type: impl Into<String>,
        server: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
            server: server.into(),
            address: address.into(),
            port,
            discovered_at: Utc::now(),
        }
    }

    /// Picks the address to announce from a resolved address set.
    ///
    /// IPv6 wins over IPv4. Among IPv6 addresses routable ones win over
    /// link-local ones, and ties are broken by ordering so the choice is
    /// stable across resolutions.
    pub fn preferred_address<'a, I>(addresses: I) -> Option<IpAddr>
    where
        I: IntoIterator<Item = &'a IpAddr>,
    {
        addresses.into_iter().copied().min_by_key(|addr| {
            let rank = match addr {
                IpAddr::V6(v6) if (v6.segments()[0] & 0xffc0) == 0xfe80 => 1,
                IpAddr::V6(_) => 0,
                IpAddr::V4(_) => 2,
            };
            (rank, *addr)
        })
    }

    /// Returns the socket address to reach this instance.
    ///
    /// Accepts `fe80::1%3` style scoped addresses. The scope must be a
    /// numeric interface index.
    pub fn socket_addr(&self) -> Result<SocketAddr, AddressError> {
        let (host, scope) = match self.address.split_once('%') {
            Some((host, scope)) => (host, Some(scope)),
            None => (self.address.as_str(), None),
        };

        let ip: IpAddr = host
            .parse()
            .map_err(|e: std::net::AddrParseError| AddressError::new(&self.address, e.to_string()))?;

        match (ip, scope) {
            (IpAddr::V6(v6), Some(scope)) => {
                let scope_id: u32 = scope.parse().map_err(|_| {
                    AddressError::new(&self.address, "scope must be a numeric interface index")
                })?;
                Ok(SocketAddr::V6(SocketAddrV6::new(v6, self.port, 0, scope_id)))
            }
            (IpAddr::V4(_), Some(_)) => Err(AddressError::new(
                &self.address,
                "IPv4 addresses cannot carry a scope",
            )),
            (ip, None) => Ok(SocketAddr::new(ip, self.port)),
        }
    }

    /// Lines printed by the browse tool.
    pub fn lines(&self) -> [String; 4] {
        [
            format!("  Name    : {}", self.name),
            format!("  Server  : {}", self.server),
            format!("  Address : {}", self.address),
            format!("  Port    : {}", self.port),
        ]
    }
}

/// One environmental sensor reading.
///
/// On the wire this is a JSON object with keys `id`, `temp`, `press` and
/// `hum`, all required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Sensor identifier (the firmware sends its EUI-64)
    pub id: String,

    /// Temperature in °C
    #[serde(rename = "temp")]
    pub temperature: f64,

    /// Pressure in hPa
    #[serde(rename = "press")]
    pub pressure: f64,

    /// Relative humidity in %
    #[serde(rename = "hum")]
    pub humidity: f64,
}

impl Measurement {
    /// Parses a measurement from a JSON payload.
    pub fn from_json(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }

    /// Encodes the measurement as JSON with two decimals per value.
    pub fn to_json(&self) -> String {
        let id = serde_json::Value::String(self.id.clone());
        format!(
            r#"{{"id":{},"temp":{:.2},"press":{:.2},"hum":{:.2}}}"#,
            id, self.temperature, self.pressure, self.humidity
        )
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "- Temperature : {} °C", self.temperature)?;
        writeln!(f, "- Pressure    : {} hPa", self.pressure)?;
        write!(f, "- Humidity    : {} %", self.humidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_socket_addr_plain() {
        let service = ServiceAnnouncement::new(
            "ot-service._example._udp.local.",
            "_example._udp.local.",
            "ot-example.local.",
            "fd00::1",
            5683,
        );
        assert_eq!(
            service.socket_addr().unwrap(),
            "[fd00::1]:5683".parse().unwrap()
        );
    }

    #[test]
    fn test_socket_addr_scoped() {
        let service = ServiceAnnouncement::new("a", "b", "c", "fe80::1%3", 5683);
        match service.socket_addr().unwrap() {
            SocketAddr::V6(v6) => {
                assert_eq!(*v6.ip(), "fe80::1".parse::<Ipv6Addr>().unwrap());
                assert_eq!(v6.scope_id(), 3);
                assert_eq!(v6.port(), 5683);
            }
            other => panic!("expected IPv6, got {other}"),
        }
    }

    #[test]
    fn test_socket_addr_rejects_named_scope() {
        let service = ServiceAnnouncement::new("a", "b", "c", "fe80::1%eth0", 5683);
        assert!(service.socket_addr().is_err());

        let service = ServiceAnnouncement::new("a", "b", "c", "not-an-ip", 5683);
        assert!(service.socket_addr().is_err());
    }

    #[test]
    fn test_preferred_address() {
        let v4 = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10));
        let link_local: IpAddr = "fe80::1".parse().unwrap();
        let mesh_local: IpAddr = "fd11:22::1".parse().unwrap();

        let picked = ServiceAnnouncement::preferred_address(&[v4, link_local, mesh_local]);
        assert_eq!(picked, Some(mesh_local));

        let picked = ServiceAnnouncement::preferred_address(&[v4, link_local]);
        assert_eq!(picked, Some(link_local));

        let picked = ServiceAnnouncement::preferred_address(&[v4]);
        assert_eq!(picked, Some(v4));

        assert_eq!(ServiceAnnouncement::preferred_address(&Vec::<IpAddr>::new()), None);
    }

    #[test]
    fn test_measurement_parse() {
        let payload = br#"{"id":"f4ce3600aabbccdd","temp":21.5,"press":1013.25,"hum":45.0}"#;
        let measurement = Measurement::from_json(payload).unwrap();
        assert_eq!(measurement.id, "f4ce3600aabbccdd");
        assert_eq!(measurement.temperature, 21.5);
        assert_eq!(measurement.pressure, 1013.25);
        assert_eq!(measurement.humidity, 45.0);
    }

    #[test]
    fn test_measurement_missing_field() {
        let payload = br#"{"id":"x","temp":21.5,"press":1013.25}"#;
        assert!(Measurement::from_json(payload).is_err());
        assert!(Measurement::from_json(b"not json").is_err());
    }

    #[test]
    fn test_measurement_json_two_decimals() {
        let measurement = Measurement {
            id: "sensor-1".to_string(),
            temperature: 21.456,
            pressure: 1013.0,
            humidity: 40.1,
        };
        assert_eq!(
            measurement.to_json(),
            r#"{"id":"sensor-1","temp":21.46,"press":1013.00,"hum":40.10}"#
        );

        let parsed = Measurement::from_json(measurement.to_json().as_bytes()).unwrap();
        assert_eq!(parsed.id, "sensor-1");
    }

    #[test]
    fn test_measurement_display() {
        let measurement = Measurement {
            id: "sensor-1".to_string(),
            temperature: 21.5,
            pressure: 1013.25,
            humidity: 45.0,
        };
        let text = measurement.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sensor-1");
        assert_eq!(lines[1], "- Temperature : 21.5 °C");
        assert_eq!(lines[2], "- Pressure    : 1013.25 hPa");
        assert_eq!(lines[3], "- Humidity    : 45 %");
    }
}
