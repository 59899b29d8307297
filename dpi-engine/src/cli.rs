use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Parser, Debug, Serialize, Deserialize)]
#[command(name = "dpi_engine", version, about, long_about = None)]
pub struct Cli {
    /// Input capture file (classic pcap, Ethernet link type).
    pub input: PathBuf,

    /// Output capture file for forwarded packets.
    pub output: PathBuf,

    /// Block an application by label (repeatable), e.g. "YouTube".
    #[arg(long = "block-app", value_name = "NAME")]
    #[serde(default)]
    pub block_app: Vec<String>,

    /// Block flows whose SNI/Host ends with this domain suffix (repeatable).
    #[arg(long = "block-domain", value_name = "SUFFIX")]
    #[serde(default)]
    pub block_domain: Vec<String>,

    /// Block flows with this IPv4 address on either side (repeatable).
    #[arg(long = "block-ip", value_name = "ADDR")]
    #[serde(default)]
    pub block_ip: Vec<Ipv4Addr>,

    /// Exempt an application from all block rules (repeatable).
    #[arg(long = "allow-app", value_name = "NAME")]
    #[serde(default)]
    pub allow_app: Vec<String>,

    /// Balancer thread count (1-8).
    #[arg(long, value_name = "N", env = "DPI_ENGINE_LBS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lbs: Option<usize>,

    /// Fast-path worker count (default: hardware parallelism - 2).
    #[arg(long, value_name = "N", env = "DPI_ENGINE_FPS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<usize>,

    /// Per-shard flow table soft cap.
    #[arg(long = "max-flows", value_name = "N", env = "DPI_ENGINE_MAX_FLOWS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_flows: Option<usize>,

    /// Idle flow eviction horizon in seconds of capture time.
    #[arg(long, value_name = "SECONDS", env = "DPI_ENGINE_IDLE")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle: Option<u64>,

    /// Write output packets in exact input order.
    #[arg(long)]
    #[serde(default)]
    pub ordered: bool,

    /// Set the application's log level (e.g. "debug", "warn").
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        env = "DPI_ENGINE_LOG_LEVEL",
        default_value = "info"
    )]
    #[serde(with = "level_serde")]
    pub log_level: Level,
}

mod level_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(level.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<Level>().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use clap::Parser as _;
    use serial_test::serial;
    use tracing::Level;

    use super::Cli;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("DPI_ENGINE_LBS");
            env::remove_var("DPI_ENGINE_FPS");
            env::remove_var("DPI_ENGINE_MAX_FLOWS");
            env::remove_var("DPI_ENGINE_IDLE");
            env::remove_var("DPI_ENGINE_LOG_LEVEL");
        }
    }

    #[test]
    #[serial]
    fn parses_positional_and_repeatable_flags() {
        clear_env_vars();
        let cli = Cli::parse_from([
            "dpi_engine",
            "in.pcap",
            "out.pcap",
            "--block-app",
            "YouTube",
            "--block-app",
            "Netflix",
            "--block-domain",
            "facebook.com",
            "--block-ip",
            "10.1.2.3",
            "--ordered",
        ]);
        assert_eq!(cli.input.to_str(), Some("in.pcap"));
        assert_eq!(cli.output.to_str(), Some("out.pcap"));
        assert_eq!(cli.block_app, vec!["YouTube", "Netflix"]);
        assert_eq!(cli.block_domain, vec!["facebook.com"]);
        assert_eq!(cli.block_ip, vec!["10.1.2.3".parse::<std::net::Ipv4Addr>().unwrap()]);
        assert!(cli.ordered);
        assert_eq!(cli.lbs, None);
    }

    #[test]
    #[serial]
    fn args_override_env() {
        clear_env_vars();
        unsafe {
            env::set_var("DPI_ENGINE_LBS", "4");
            env::set_var("DPI_ENGINE_LOG_LEVEL", "debug");
        }
        let cli = Cli::parse_from(["dpi_engine", "a.pcap", "b.pcap", "--lbs", "2"]);
        assert_eq!(cli.lbs, Some(2));
        assert_eq!(cli.log_level, Level::DEBUG);
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn missing_positionals_is_an_error() {
        clear_env_vars();
        assert!(Cli::try_parse_from(["dpi_engine", "only-one.pcap"]).is_err());
    }

    #[test]
    #[serial]
    fn default_log_level_is_info() {
        clear_env_vars();
        let cli = Cli::parse_from(["dpi_engine", "a.pcap", "b.pcap"]);
        assert_eq!(cli.log_level, Level::INFO);
        assert!(!cli.ordered);
    }

    #[test]
    #[serial]
    fn bad_block_ip_is_an_error() {
        clear_env_vars();
        assert!(
            Cli::try_parse_from(["dpi_engine", "a.pcap", "b.pcap", "--block-ip", "not-an-ip"])
                .is_err()
        );
    }
}
