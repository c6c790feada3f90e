use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MultiaddrError {
    #[error("invalid multiaddr: empty")]
    Empty,
    #[error("invalid multiaddr '{0}': must start with '/'")]
    MissingLeadingSlash(String),
    #[error("invalid multiaddr: unknown protocol '{0}'")]
    UnknownProtocol(String),
    #[error("invalid multiaddr: protocol '{0}' requires a value")]
    MissingValue(&'static str),
    #[error("invalid multiaddr: '{value}' is not a valid {protocol} value")]
    InvalidValue {
        protocol: &'static str,
        value: String,
    },
}

/// One `/protocol[/value]` component of a [`Multiaddr`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    Ip4(Ipv4Addr),
    Ip6(Ipv6Addr),
    Dns(String),
    Dns4(String),
    Dns6(String),
    Dnsaddr(String),
    Tcp(u16),
    Udp(u16),
    P2p(String),
    Quic,
    QuicV1,
    Tls,
    Ws,
    Wss,
    WebTransport,
    P2pCircuit,
}

impl Protocol {
    fn name(&self) -> &'static str {
        match self {
            Protocol::Ip4(_) => "ip4",
            Protocol::Ip6(_) => "ip6",
            Protocol::Dns(_) => "dns",
            Protocol::Dns4(_) => "dns4",
            Protocol::Dns6(_) => "dns6",
            Protocol::Dnsaddr(_) => "dnsaddr",
            Protocol::Tcp(_) => "tcp",
            Protocol::Udp(_) => "udp",
            Protocol::P2p(_) => "p2p",
            Protocol::Quic => "quic",
            Protocol::QuicV1 => "quic-v1",
            Protocol::Tls => "tls",
            Protocol::Ws => "ws",
            Protocol::Wss => "wss",
            Protocol::WebTransport => "webtransport",
            Protocol::P2pCircuit => "p2p-circuit",
        }
    }

    /// Parse a component, pulling its value from `parts` when it has one.
    fn parse<'a>(
        name: &str,
        parts: &mut impl Iterator<Item = &'a str>,
    ) -> Result<Self, MultiaddrError> {
        let protocol = match name {
            "ip4" => Protocol::Ip4(parse_value("ip4", parts, |v| v.parse().ok())?),
            "ip6" => Protocol::Ip6(parse_value("ip6", parts, |v| v.parse().ok())?),
            "dns" => Protocol::Dns(parse_value("dns", parts, valid_host)?),
            "dns4" => Protocol::Dns4(parse_value("dns4", parts, valid_host)?),
            "dns6" => Protocol::Dns6(parse_value("dns6", parts, valid_host)?),
            "dnsaddr" => Protocol::Dnsaddr(parse_value("dnsaddr", parts, valid_host)?),
            "tcp" => Protocol::Tcp(parse_value("tcp", parts, |v| v.parse().ok())?),
            "udp" => Protocol::Udp(parse_value("udp", parts, |v| v.parse().ok())?),
            "p2p" | "ipfs" => Protocol::P2p(parse_value("p2p", parts, valid_peer_id)?),
            "quic" => Protocol::Quic,
            "quic-v1" => Protocol::QuicV1,
            "tls" => Protocol::Tls,
            "ws" => Protocol::Ws,
            "wss" => Protocol::Wss,
            "webtransport" => Protocol::WebTransport,
            "p2p-circuit" => Protocol::P2pCircuit,
            other => return Err(MultiaddrError::UnknownProtocol(other.to_string())),
        };
        Ok(protocol)
    }
}

fn parse_value<'a, T>(
    protocol: &'static str,
    parts: &mut impl Iterator<Item = &'a str>,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, MultiaddrError> {
    let value = parts.next().ok_or(MultiaddrError::MissingValue(protocol))?;
    parse(value).ok_or_else(|| MultiaddrError::InvalidValue {
        protocol,
        value: value.to_string(),
    })
}

fn valid_host(value: &str) -> Option<String> {
    hostname_validator::is_valid(value).then(|| value.to_string())
}

fn valid_peer_id(value: &str) -> Option<String> {
    let valid = !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| value.to_string())
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())?;
        match self {
            Protocol::Ip4(addr) => write!(f, "/{addr}"),
            Protocol::Ip6(addr) => write!(f, "/{addr}"),
            Protocol::Dns(host)
            | Protocol::Dns4(host)
            | Protocol::Dns6(host)
            | Protocol::Dnsaddr(host)
            | Protocol::P2p(host) => write!(f, "/{host}"),
            Protocol::Tcp(port) | Protocol::Udp(port) => write!(f, "/{port}"),
            _ => Ok(()),
        }
    }
}

/// A self-describing network address, e.g. `/dns4/router.bittorrent.com/udp/6881`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multiaddr {
    protocols: Vec<Protocol>,
}

impl Multiaddr {
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    /// `host:port` of the first host component directly followed by a udp port.
    pub fn udp_host_port(&self) -> Option<String> {
        self.protocols.windows(2).find_map(|pair| {
            let Protocol::Udp(port) = &pair[1] else {
                return None;
            };
            match &pair[0] {
                Protocol::Ip4(addr) => Some(format!("{addr}:{port}")),
                Protocol::Ip6(addr) => Some(format!("[{addr}]:{port}")),
                Protocol::Dns(host) | Protocol::Dns4(host) | Protocol::Dns6(host) => {
                    Some(format!("{host}:{port}"))
                }
                _ => None,
            }
        })
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for protocol in &self.protocols {
            write!(f, "{protocol}")?;
        }
        Ok(())
    }
}

impl FromStr for Multiaddr {
    type Err = MultiaddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MultiaddrError::Empty);
        }
        if !s.starts_with('/') {
            return Err(MultiaddrError::MissingLeadingSlash(s.to_string()));
        }

        let mut parts = s.split('/').filter(|part| !part.is_empty());
        let mut protocols = vec![];
        while let Some(name) = parts.next() {
            protocols.push(Protocol::parse(name, &mut parts)?);
        }
        if protocols.is_empty() {
            return Err(MultiaddrError::Empty);
        }
        Ok(Self { protocols })
    }
}

impl TryFrom<&str> for Multiaddr {
    type Error = MultiaddrError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::from_str(s)
    }
}

impl Serialize for Multiaddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Multiaddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}
