//! Resolved runtime configuration.
//!
//! The CLI is serialized into a figment and extracted into [`Config`];
//! anything the user left unset falls back to the `defaults` functions.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{Figment, providers::Serialized};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::AppLabel;
use crate::cli::Cli;
use crate::flow_table::{FlowTableConf, defaults as table_defaults};
use crate::rules::{Rule, RuleSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,

    #[serde(default)]
    pub block_app: Vec<String>,
    #[serde(default)]
    pub block_domain: Vec<String>,
    #[serde(default)]
    pub block_ip: Vec<Ipv4Addr>,
    #[serde(default)]
    pub allow_app: Vec<String>,

    /// Balancer thread count.
    #[serde(default = "defaults::lbs")]
    pub lbs: usize,
    /// Fast-path worker count.
    #[serde(default = "defaults::fps")]
    pub fps: usize,
    /// Per-shard flow cap.
    #[serde(default = "defaults::max_flows")]
    pub max_flows: usize,
    /// Idle eviction horizon in seconds of capture time.
    #[serde(default = "defaults::idle_secs")]
    pub idle: u64,
    #[serde(default)]
    pub ordered: bool,

    /// Reader -> balancer queue capacity.
    #[serde(default = "defaults::balancer_capacity")]
    pub balancer_capacity: usize,
    /// Balancer -> worker queue capacity, per shard.
    #[serde(default = "defaults::worker_capacity")]
    pub worker_capacity: usize,
    /// Worker -> writer queue capacity.
    #[serde(default = "defaults::writer_capacity")]
    pub writer_capacity: usize,
}

mod defaults {
    pub fn lbs() -> usize {
        1
    }

    /// Leave a couple of cores for the reader and writer.
    pub fn fps() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(2))
            .unwrap_or(1)
            .max(1)
    }

    pub fn max_flows() -> usize {
        super::table_defaults::max_flows()
    }

    pub fn idle_secs() -> u64 {
        super::table_defaults::idle().as_secs()
    }

    pub fn balancer_capacity() -> usize {
        8192
    }

    pub fn worker_capacity() -> usize {
        4096
    }

    pub fn writer_capacity() -> usize {
        16_384
    }
}

/// Maximum accepted balancer thread count.
const MAX_LBS: usize = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown application label '{0}'")]
    UnknownApp(String),
    #[error("balancer count must be between 1 and 8, got {0}")]
    BalancerCount(usize),
    #[error("worker count must be at least 1")]
    WorkerCount,
    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
    #[error("input and output paths must differ")]
    SamePath,
    #[error("configuration error: {0}")]
    Extraction(#[from] figment::Error),
}

impl Config {
    /// Merges the parsed CLI over the defaults and validates the result.
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(&cli))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lbs == 0 || self.lbs > MAX_LBS {
            return Err(ConfigError::BalancerCount(self.lbs));
        }
        if self.fps == 0 {
            return Err(ConfigError::WorkerCount);
        }
        if self.max_flows == 0 {
            return Err(ConfigError::ZeroValue("max-flows"));
        }
        if self.idle == 0 {
            return Err(ConfigError::ZeroValue("idle"));
        }
        if self.balancer_capacity == 0 || self.worker_capacity == 0 || self.writer_capacity == 0 {
            return Err(ConfigError::ZeroValue("queue capacity"));
        }
        if self.input == self.output {
            return Err(ConfigError::SamePath);
        }
        for name in self.block_app.iter().chain(&self.allow_app) {
            if AppLabel::from_name(name).is_none() {
                return Err(ConfigError::UnknownApp(name.clone()));
            }
        }
        Ok(())
    }

    /// Compiles the policy rules in evaluation order: allows first, then the
    /// block rules in CLI-surface order.
    pub fn build_rules(&self) -> Result<RuleSet, ConfigError> {
        let mut rules = Vec::new();
        for name in &self.allow_app {
            let app =
                AppLabel::from_name(name).ok_or_else(|| ConfigError::UnknownApp(name.clone()))?;
            rules.push(Rule::AllowApp(app));
        }
        for name in &self.block_app {
            let app =
                AppLabel::from_name(name).ok_or_else(|| ConfigError::UnknownApp(name.clone()))?;
            rules.push(Rule::BlockApp(app));
        }
        for suffix in &self.block_domain {
            rules.push(Rule::BlockDomainSuffix(suffix.clone()));
        }
        for ip in &self.block_ip {
            rules.push(Rule::BlockIp(*ip));
        }
        Ok(RuleSet::new(rules))
    }

    /// Flow-table tuning derived from the CLI knobs. The teardown horizons
    /// never exceed the main idle horizon.
    pub fn flow_table_conf(&self) -> FlowTableConf {
        let idle = Duration::from_secs(self.idle);
        FlowTableConf {
            max_flows: self.max_flows,
            idle,
            idle_fin: table_defaults::idle_fin().min(idle),
            idle_rst: table_defaults::idle_rst().min(idle),
            expiry_interval: table_defaults::expiry_interval().min(idle),
        }
    }
}
