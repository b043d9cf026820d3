//! Resolution of endpoint strings into TCP or RTU connection targets.
//!
//! Accepted forms:
//!
//! - `hostname` - bare hostname, TCP with default port
//! - `tcp:hostname[:port]` - TCP with optional port
//! - `tcp://hostname[:port]` - TCP URI form
//! - `rtu:/dev/ttyUSB0`, `rtu:COM3` - RTU with serial port path or name
//! - `rtu:///dev/ttyUSB0` - RTU URI form

use crate::error::{Error, Result};
use crate::util::{is_digits, str};

use std::fmt::Display;
use url::{Host, Url};

/// The default Modbus TCP port.
pub const DEFAULT_TCP_PORT: u16 = 502;

const TCP_URI: &str = "tcp://";
const RTU_URI: &str = "rtu://";
const TCP_SCHEME: &str = "tcp:";
const RTU_SCHEME: &str = "rtu:";

/// A resolved endpoint ready for session creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Tcp { hostname: String, port: u16 },
    Rtu { serial_port: String },
}

impl Endpoint {
    pub fn tcp(hostname: &str, port: u16) -> Self {
        Self::Tcp {
            hostname: str!(hostname),
            port,
        }
    }

    pub fn rtu(serial_port: &str) -> Self {
        Self::Rtu {
            serial_port: str!(serial_port),
        }
    }

    /// Parse `raw` and resolve the TCP port against the optional `--port` override.
    pub fn parse(raw: &str, port_override: Option<u16>) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("endpoint must not be blank"));
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with(TCP_URI) {
            resolve_tcp(parse_tcp_uri(trimmed)?, port_override)
        } else if lower.starts_with(RTU_URI) {
            resolve_rtu(parse_serial_port(&trimmed[RTU_URI.len()..])?, port_override)
        } else if lower.starts_with(TCP_SCHEME) {
            resolve_tcp(parse_tcp_scheme(&trimmed[TCP_SCHEME.len()..])?, port_override)
        } else if lower.starts_with(RTU_SCHEME) {
            resolve_rtu(parse_serial_port(&trimmed[RTU_SCHEME.len()..])?, port_override)
        } else if lower.contains("://") {
            Err(Error::UnsupportedScheme(str!(trimmed)))
        } else {
            resolve_tcp(ParsedTcp::new(trimmed, None)?, port_override)
        }
    }
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp { hostname, port } if hostname.contains(':') => {
                write!(f, "tcp://[{hostname}]:{port}")
            }
            Self::Tcp { hostname, port } => write!(f, "tcp://{hostname}:{port}"),
            Self::Rtu { serial_port } => write!(f, "rtu:{serial_port}"),
        }
    }
}

/// Host and optional port of a TCP endpoint before the port is resolved.
#[derive(Debug, PartialEq, Eq)]
struct ParsedTcp {
    hostname: String,
    port: Option<u16>,
}

impl ParsedTcp {
    fn new(hostname: &str, port: Option<u16>) -> Result<Self> {
        if hostname.trim().is_empty() {
            return Err(Error::validation("tcp endpoint must include a hostname"));
        }
        Ok(Self {
            hostname: str!(hostname),
            port,
        })
    }
}

fn resolve_tcp(parsed: ParsedTcp, port_override: Option<u16>) -> Result<Endpoint> {
    let port = match (parsed.port, port_override) {
        (Some(endpoint), Some(flag)) if endpoint != flag => {
            return Err(Error::PortConflict { endpoint, flag });
        }
        (Some(port), _) | (None, Some(port)) => port,
        (None, None) => DEFAULT_TCP_PORT,
    };
    Ok(Endpoint::Tcp {
        hostname: parsed.hostname,
        port,
    })
}

fn resolve_rtu(serial_port: &str, port_override: Option<u16>) -> Result<Endpoint> {
    if port_override.is_some() {
        return Err(Error::PortNotAllowed);
    }
    Ok(Endpoint::rtu(serial_port))
}

fn parse_serial_port(s: &str) -> Result<&str> {
    if s.trim().is_empty() {
        Err(Error::validation("rtu endpoint must include a serial port"))
    } else {
        Ok(s)
    }
}

fn parse_tcp_uri(raw: &str) -> Result<ParsedTcp> {
    let url = Url::parse(raw).map_err(|e| Error::validation(format!("invalid tcp endpoint: {e}")))?;

    let hostname = match url.host() {
        Some(Host::Domain(d)) => str!(d),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => String::new(),
    };

    let path = url.path();
    if !path.is_empty() && path != "/" {
        return Err(Error::validation("tcp endpoint must not include a path"));
    }

    ParsedTcp::new(&hostname, url.port())
}

fn parse_tcp_scheme(s: &str) -> Result<ParsedTcp> {
    if s.trim().is_empty() {
        return Err(Error::validation("tcp endpoint must include a hostname"));
    }
    if s.starts_with('/') {
        return Err(Error::validation("tcp endpoint must not start with '/'"));
    }
    parse_host_port(s)
}

fn parse_port(s: &str) -> Result<u16> {
    s.parse::<u16>()
        .map_err(|_| Error::validation(format!("tcp endpoint port out of range: {s}")))
}

/// Split `host[:port]` or `[v6-literal][:port]`.
fn parse_host_port(s: &str) -> Result<ParsedTcp> {
    if let Some(bracketed) = s.strip_prefix('[') {
        let Some(closing) = bracketed.find(']') else {
            return Err(Error::validation("tcp endpoint has an invalid IPv6 host"));
        };
        let host = &bracketed[..closing];
        let remainder = &bracketed[closing + 1..];
        if remainder.is_empty() {
            return ParsedTcp::new(host, None);
        }
        let Some(port) = remainder.strip_prefix(':') else {
            return Err(Error::validation(
                "tcp endpoint has unexpected characters after host",
            ));
        };
        if port.is_empty() {
            return Err(Error::validation("tcp endpoint port is missing"));
        }
        if !is_digits(port) {
            return Err(Error::validation("tcp endpoint port must be numeric"));
        }
        return ParsedTcp::new(host, Some(parse_port(port)?));
    }

    // Only a single colon with a numeric suffix is a port, anything else (e.g. bare IPv6
    // text) is kept as the hostname.
    if let Some((host, port)) = s.split_once(':') {
        if !host.is_empty() && !port.contains(':') && is_digits(port) {
            return ParsedTcp::new(host, Some(parse_port(port)?));
        }
    }

    ParsedTcp::new(s, None)
}
