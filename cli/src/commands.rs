pub mod classify;
pub mod plan;
pub mod probe;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use accord_common::config::{
    Config, DEFAULT_FALLBACK_VERSION, DEFAULT_PREFERRED_VERSION, DEFAULT_PROTOCOL_TAG,
};
use accord_common::credentials::CredentialRef;
use accord_common::network::target::Target;
use accord_common::session::ProtocolVersion;
use accord_core::credentials::StaticCredentialStore;
use accord_core::engine::EngineConfig;
use accord_core::planner::urls::{CredentialUrlGenerator, FixedUrlGenerator};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "accord")]
#[command(about = "Negotiates authenticated sessions with remote management endpoints.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the attempts a probe would make, without connecting
    #[command(alias = "p")]
    Plan {
        target: Target,
        #[command(flatten)]
        options: NegotiationArgs,
    },
    /// Resolve a reported version and peer type to a capability module
    #[command(alias = "c")]
    Classify {
        version: String,
        /// Type string the peer reports, e.g. HostAgent or VirtualCenter
        #[arg(default_value = "HostAgent")]
        peer_type: String,
    },
    /// Negotiate with every address in the target and collect an inventory
    #[command(alias = "pr")]
    Probe {
        target: Target,
        #[command(flatten)]
        options: NegotiationArgs,
    },
}

#[derive(Args, Clone)]
pub struct NegotiationArgs {
    /// TOML file holding the credential store
    #[arg(short = 'C', long, default_value = "credentials.toml")]
    pub credentials: PathBuf,
    /// Use only this credential id for every address
    #[arg(long)]
    pub credential: Option<String>,
    /// Protocol tag credentials are filtered by
    #[arg(long, default_value = DEFAULT_PROTOCOL_TAG)]
    pub protocol: String,
    /// Per-step timeout in seconds
    #[arg(short, long, default_value_t = 20)]
    pub timeout: u64,
    #[arg(long, default_value = DEFAULT_PREFERRED_VERSION)]
    pub prefer: String,
    #[arg(long, default_value = DEFAULT_FALLBACK_VERSION)]
    pub fallback: String,
    /// Keep going after the first success
    #[arg(short, long)]
    pub exhaustive: bool,
    /// Also try https:443 and http:80 for every credential
    #[arg(long)]
    pub web_defaults: bool,
}

impl NegotiationArgs {
    pub fn settings(&self) -> Config {
        Config {
            stop_on_first_success: !self.exhaustive,
            explicit_credential: self.credential.as_deref().map(CredentialRef::from),
            protocol_tag: self.protocol.clone(),
            per_attempt_timeout: Duration::from_secs(self.timeout.max(1)),
            preferred_version: ProtocolVersion::new(self.prefer.clone()),
            fallback_version: ProtocolVersion::new(self.fallback.clone()),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(self.settings());
        config.url_generators = vec![Arc::new(CredentialUrlGenerator::default())];
        if self.web_defaults {
            config.url_generators.push(Arc::new(FixedUrlGenerator::web_defaults()));
        }
        config
    }

    pub fn load_store(&self) -> anyhow::Result<StaticCredentialStore> {
        StaticCredentialStore::load(&self.credentials)
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn options(args: &[&str]) -> NegotiationArgs {
        let argv = ["accord", "probe", "10.0.0.1"].iter().chain(args);
        match CommandLine::try_parse_from(argv).unwrap().command {
            Commands::Probe { options, .. } => options,
            _ => panic!("expected the probe subcommand"),
        }
    }

    #[test]
    fn defaults_stop_at_first_success() {
        let settings = options(&[]).settings();
        assert!(settings.stop_on_first_success);
        assert!(settings.explicit_credential.is_none());
        assert_eq!(settings.protocol_tag, "vim");
        assert_eq!(settings.per_attempt_timeout, Duration::from_secs(20));
        assert_eq!(settings.preferred_version.as_str(), "urn:vim25");
        assert_eq!(settings.fallback_version.as_str(), "urn:vim2");
    }

    #[test]
    fn flags_map_onto_engine_settings() {
        let args = options(&["--exhaustive", "--credential", "lab-root", "-t", "3", "--web-defaults"]);
        let settings = args.settings();
        assert!(!settings.stop_on_first_success);
        assert_eq!(settings.explicit_credential, Some(CredentialRef::from("lab-root")));
        assert_eq!(settings.per_attempt_timeout, Duration::from_secs(3));
        assert_eq!(args.engine_config().url_generators.len(), 2);
    }
}
