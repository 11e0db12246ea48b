use std::fmt;
use std::net::IpAddr;

/// An opaque reachable endpoint identifier, either a literal IP or a hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        self.0.parse().ok()
    }

    pub fn is_ipv6(&self) -> bool {
        matches!(self.as_ip(), Some(IpAddr::V6(_)))
    }

    /// The host as it must appear in a URL authority.
    pub fn authority(&self) -> String {
        if self.is_ipv6() {
            format!("[{}]", self.0)
        } else {
            self.0.clone()
        }
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for Address {
    fn from(host: &str) -> Self {
        Self(host.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One concrete URL variant at which a peer may answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub scheme: String,
    pub host: Address,
    pub port: u16,
    pub path: String,
}

impl Endpoint {
    pub fn new(scheme: impl Into<String>, host: Address, port: u16, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host,
            port,
            path: path.into().trim_start_matches('/').to_string(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}:{}/{}",
            self.scheme,
            self.host.authority(),
            self.port,
            self.path
        )
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
