use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub enum Account {
    Valid { password: String },
    Unprivileged { password: String, privilege: String },
}

/// How the loopback peer answers.
#[derive(Clone)]
pub struct PeerBehavior {
    pub accepted_versions: Vec<String>,
    pub version: String,
    pub peer_type: String,
    pub accounts: HashMap<String, Account>,
}

impl PeerBehavior {
    pub fn host(version: &str) -> Self {
        Self {
            accepted_versions: vec!["urn:vim25".into(), "urn:vim2".into()],
            version: version.into(),
            peer_type: "HostAgent".into(),
            accounts: HashMap::new(),
        }
    }

    pub fn accepting_only(mut self, version: &str) -> Self {
        self.accepted_versions = vec![version.into()];
        self
    }

    pub fn manager(mut self) -> Self {
        self.peer_type = "VirtualCenter".into();
        self
    }

    pub fn account(mut self, username: &str, password: &str) -> Self {
        self.accounts.insert(
            username.into(),
            Account::Valid {
                password: password.into(),
            },
        );
        self
    }

    pub fn unprivileged(mut self, username: &str, password: &str, privilege: &str) -> Self {
        self.accounts.insert(
            username.into(),
            Account::Unprivileged {
                password: password.into(),
                privilege: privilege.into(),
            },
        );
        self
    }
}

pub struct FakePeer {
    pub addr: SocketAddr,
    transcript: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FakePeer {
    pub async fn start(behavior: PeerBehavior) -> FakePeer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let transcript = Arc::new(Mutex::new(Vec::new()));

        let log = transcript.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, behavior.clone(), log.clone()));
            }
        });

        FakePeer {
            addr,
            transcript,
            handle,
        }
    }

    /// Every request line received, across all connections.
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().unwrap().clone()
    }

    pub fn count(&self, verb: &str) -> usize {
        self.transcript()
            .iter()
            .filter(|line| line.split(' ').next() == Some(verb))
            .count()
    }

    /// Polls until `expected` lines starting with `verb` arrived, or two seconds pass.
    pub async fn wait_for(&self, verb: &str, expected: usize) -> usize {
        for _ in 0..100 {
            if self.count(verb) >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.count(verb)
    }
}

impl Drop for FakePeer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(stream: TcpStream, behavior: PeerBehavior, log: Arc<Mutex<Vec<String>>>) {
    let mut stream = BufReader::new(stream);
    let mut token = 0;

    loop {
        let mut line = String::new();
        match stream.read_line(&mut line).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let line = line.trim_end().to_string();
        log.lock().unwrap().push(line.clone());

        let reply = match line.split(' ').next().unwrap_or_default() {
            "LOGIN" => {
                token += 1;
                login(&behavior, &line, token)
            }
            "ABOUT" => format!("ABOUT {} {}", behavior.version, behavior.peer_type),
            "CALL" => match line.strip_prefix("CALL ").unwrap_or_default() {
                "inventory" => "DATA vms=3 datastores=1".to_string(),
                "hosts" => "DATA esx01,esx02".to_string(),
                other => format!("FAULT SERVER unknown method {other}"),
            },
            "LOGOUT" => return,
            _ => "GARBAGE".to_string(),
        };

        if stream.get_mut().write_all(format!("{reply}\n").as_bytes()).await.is_err() {
            return;
        }
    }
}

fn login(behavior: &PeerBehavior, line: &str, token: u32) -> String {
    let mut parts = line.splitn(4, ' ').skip(1);
    let version = parts.next().unwrap_or_default();
    let username = parts.next().unwrap_or_default();
    let password = parts.next().unwrap_or_default();

    if !behavior.accepted_versions.iter().any(|v| v == version) {
        return format!("FAULT SERVER Unsupported namespace \"{version}\"");
    }
    match behavior.accounts.get(username) {
        Some(Account::Valid { password: expected }) if expected == password => format!("OK session-{token}"),
        Some(Account::Unprivileged {
            password: expected,
            privilege,
        }) if expected == password => format!("FAULT PRIV {privilege} NoPermission"),
        _ => "FAULT AUTH incorrect user name or password".to_string(),
    }
}
