//! # Line-Protocol Backend
//!
//! A plain TCP backend speaking one request line and one reply line at a time:
//!
//! | request                          | replies                                       |
//! |----------------------------------|-----------------------------------------------|
//! | `LOGIN <version> <user> <pass>`  | `OK <token>` or `FAULT ...`                   |
//! | `ABOUT`                          | `ABOUT <version> <type>`                      |
//! | `CALL <method>`                  | `DATA <payload>` or `FAULT ...`               |
//! | `LOGOUT`                         | none expected                                 |
//!
//! Faults come as `FAULT AUTH <msg>`, `FAULT PRIV <privilege> <msg>` or
//! `FAULT SERVER <msg>`. Anything else is a malformed reply.

use std::sync::Arc;
use std::time::Duration;

use accord_common::attempt::ConnectionAttempt;
use accord_common::credentials::{CredentialStore, keys};
use accord_common::error::Fault;
use accord_common::network::address::Endpoint;
use accord_common::session::{ClientBackend, PeerDescription, ProtocolVersion, Session};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Longest reply line accepted, newline included.
pub const MAX_REPLY_LINE: u64 = 64 * 1024;

/// One parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok(String),
    About { version: String, peer_type: String },
    Data(String),
}

impl Reply {
    /// Parses a reply line; `FAULT` lines come back as the matching [`Fault`].
    pub fn parse(line: &str) -> Result<Reply, Fault> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (head, rest) = line.split_once(' ').unwrap_or((line, ""));

        match head {
            "OK" => Ok(Reply::Ok(rest.to_string())),
            "DATA" => Ok(Reply::Data(rest.to_string())),
            "ABOUT" => match rest.split_once(' ') {
                Some((version, peer_type)) if !version.is_empty() && !peer_type.is_empty() => {
                    Ok(Reply::About {
                        version: version.to_string(),
                        peer_type: peer_type.to_string(),
                    })
                }
                _ => Err(Fault::Malformed(format!("incomplete ABOUT reply '{line}'"))),
            },
            "FAULT" => Err(parse_fault(rest, line)),
            _ => Err(Fault::Malformed(format!("unexpected reply '{line}'"))),
        }
    }
}

fn parse_fault(body: &str, line: &str) -> Fault {
    let (class, message) = body.split_once(' ').unwrap_or((body, ""));
    match class {
        "AUTH" => Fault::Authentication(message.to_string()),
        "PRIV" => {
            let (privilege, message) = message.split_once(' ').unwrap_or((message, ""));
            Fault::Authorization {
                privilege: (!privilege.is_empty()).then(|| privilege.to_string()),
                message: message.to_string(),
            }
        }
        "SERVER" => Fault::Remote(message.to_string()),
        _ => Fault::Malformed(format!("unknown fault class in '{line}'")),
    }
}

/// Opens [`TcpSession`]s, logging in with the credential's username and password.
pub struct TcpBackend {
    store: Arc<dyn CredentialStore>,
    connect_timeout: Duration,
}

impl TcpBackend {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl ClientBackend for TcpBackend {
    async fn open(
        &self,
        attempt: &ConnectionAttempt,
        version: &ProtocolVersion,
    ) -> Result<Box<dyn Session>, Fault> {
        let username = self
            .store
            .credential_property(&attempt.credential, keys::USERNAME)
            .ok_or_else(|| Fault::Other(format!("credential {} has no username", attempt.credential)))?;
        let password = self
            .store
            .credential_property(&attempt.credential, keys::PASSWORD)
            .unwrap_or_default();

        let endpoint = &attempt.endpoint;
        let socket = format!("{}:{}", endpoint.host.authority(), endpoint.port);
        let stream = timeout(self.connect_timeout, TcpStream::connect(&socket))
            .await
            .map_err(|_| Fault::Timeout(self.connect_timeout))??;
        debug!("connected to {socket}");

        let mut session = TcpSession::new(stream, endpoint.clone(), version.clone());
        match session.request(&format!("LOGIN {version} {username} {password}")).await? {
            Reply::Ok(token) => {
                trace!(%token, "logged in");
                Ok(Box::new(session))
            }
            other => Err(Fault::Malformed(format!("expected OK after LOGIN, got {other:?}"))),
        }
    }
}

pub struct TcpSession {
    stream: BufReader<TcpStream>,
    endpoint: Endpoint,
    version: ProtocolVersion,
}

impl TcpSession {
    fn new(stream: TcpStream, endpoint: Endpoint, version: ProtocolVersion) -> Self {
        Self {
            stream: BufReader::new(stream),
            endpoint,
            version,
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), Fault> {
        let writer = self.stream.get_mut();
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn request(&mut self, line: &str) -> Result<Reply, Fault> {
        self.send_line(line).await?;

        let mut reply = String::new();
        let read = (&mut self.stream).take(MAX_REPLY_LINE).read_line(&mut reply).await?;
        if read == 0 {
            return Err(Fault::Transport(format!("{} closed the connection", self.endpoint)));
        }
        if read as u64 == MAX_REPLY_LINE && !reply.ends_with('\n') {
            return Err(Fault::Malformed(format!(
                "reply from {} exceeds {MAX_REPLY_LINE} bytes",
                self.endpoint
            )));
        }
        Reply::parse(&reply)
    }
}

#[async_trait]
impl Session for TcpSession {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn protocol_version(&self) -> &ProtocolVersion {
        &self.version
    }

    async fn describe_self(&mut self) -> Result<PeerDescription, Fault> {
        match self.request("ABOUT").await? {
            Reply::About { version, peer_type } => Ok(PeerDescription::new(version, peer_type)),
            other => Err(Fault::Malformed(format!("expected ABOUT, got {other:?}"))),
        }
    }

    async fn call(&mut self, method: &str) -> Result<String, Fault> {
        match self.request(&format!("CALL {method}")).await? {
            Reply::Data(payload) => Ok(payload),
            other => Err(Fault::Malformed(format!("expected DATA, got {other:?}"))),
        }
    }

    async fn close(&mut self) -> Result<(), Fault> {
        self.send_line("LOGOUT").await?;
        self.stream.get_mut().shutdown().await?;
        Ok(())
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
