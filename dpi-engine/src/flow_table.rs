//! Per-worker flow table.
//!
//! Each fast-path worker owns one table; no other thread ever touches it, so
//! lookups take no locks. The hasher is the process-wide seeded
//! `ahash::RandomState`, shared (cloned) so shard selection and table hashing
//! agree and collision patterns cannot be precomputed offline.
//!
//! Eviction is two-fold: a soft entry cap evicts the least-recently-touched
//! flow on insert, and an idle sweep driven by the capture clock releases
//! flows past their horizon. Flows that saw FIN or RST age out on the
//! shorter teardown horizons.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::flow::{FlowKey, FlowState};

/// Flow-table tuning. All horizons are measured against capture timestamps,
/// which keeps offline replays deterministic.
#[derive(Debug, Clone)]
pub struct FlowTableConf {
    /// Soft cap on tracked flows per shard.
    pub max_flows: usize,
    /// Idle horizon for established flows.
    pub idle: Duration,
    /// Accelerated horizon once FIN has been seen.
    pub idle_fin: Duration,
    /// Accelerated horizon once RST has been seen.
    pub idle_rst: Duration,
    /// How often the idle sweep runs, in capture time.
    pub expiry_interval: Duration,
}

impl Default for FlowTableConf {
    fn default() -> Self {
        Self {
            max_flows: defaults::max_flows(),
            idle: defaults::idle(),
            idle_fin: defaults::idle_fin(),
            idle_rst: defaults::idle_rst(),
            expiry_interval: defaults::expiry_interval(),
        }
    }
}

pub mod defaults {
    use std::time::Duration;

    pub fn max_flows() -> usize {
        65_536
    }
    pub fn idle() -> Duration {
        Duration::from_secs(300)
    }
    pub fn idle_fin() -> Duration {
        Duration::from_secs(10)
    }
    pub fn idle_rst() -> Duration {
        Duration::from_secs(5)
    }
    pub fn expiry_interval() -> Duration {
        Duration::from_secs(10)
    }
}

/// Eviction and lifecycle counters for one shard.
#[derive(Debug, Default, Clone, Copy)]
pub struct TableStats {
    pub flows_created: u64,
    pub evicted_lru: u64,
    pub evicted_idle: u64,
    /// Keys seen again after eviction (lower bound: the evicted-key memory
    /// is bounded).
    pub flows_reappeared: u64,
}

impl TableStats {
    pub fn merge(&mut self, other: &TableStats) {
        self.flows_created += other.flows_created;
        self.evicted_lru += other.evicted_lru;
        self.evicted_idle += other.evicted_idle;
        self.flows_reappeared += other.flows_reappeared;
    }
}

pub struct FlowTable {
    flows: HashMap<FlowKey, FlowState, ahash::RandomState>,
    conf: FlowTableConf,
    /// Keys evicted earlier, kept to surface reappearing flows. Cleared when
    /// it outgrows a multiple of the cap so memory stays bounded.
    evicted_keys: HashSet<FlowKey, ahash::RandomState>,
    last_sweep: u64,
    pub stats: TableStats,
}

impl FlowTable {
    pub fn new(conf: FlowTableConf, hasher: ahash::RandomState) -> Self {
        Self {
            flows: HashMap::with_hasher(hasher.clone()),
            conf,
            evicted_keys: HashSet::with_hasher(hasher),
            last_sweep: 0,
            stats: TableStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn get_mut(&mut self, key: &FlowKey) -> Option<&mut FlowState> {
        self.flows.get_mut(key)
    }

    /// Evicts the least-recently-touched flow if inserting `key` would
    /// exceed the cap. Returns the evicted flow for stats folding.
    pub fn make_room(&mut self, key: &FlowKey) -> Option<FlowState> {
        if self.flows.len() < self.conf.max_flows || self.flows.contains_key(key) {
            return None;
        }
        let lru = self
            .flows
            .iter()
            .min_by_key(|(_, f)| f.last_seen)
            .map(|(k, _)| *k)?;
        let state = self.flows.remove(&lru)?;
        self.remember_evicted(lru);
        self.stats.evicted_lru += 1;
        Some(state)
    }

    /// Looks up or creates the flow for `key`. Callers run [`Self::make_room`]
    /// first; an insert past the cap is still honored (soft cap).
    pub fn get_or_insert(&mut self, key: FlowKey, ts: u64) -> (&mut FlowState, bool) {
        match self.flows.entry(key) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                self.stats.flows_created += 1;
                if self.evicted_keys.contains(&key) {
                    self.stats.flows_reappeared += 1;
                }
                (entry.insert(FlowState::new(key, ts)), true)
            }
        }
    }

    /// Releases flows idle past their horizon. Rate-limited by
    /// `expiry_interval` of capture time; returns the released flows.
    pub fn sweep(&mut self, now: u64) -> Vec<FlowState> {
        let interval = self.conf.expiry_interval.as_micros() as u64;
        if now < self.last_sweep.saturating_add(interval) {
            return Vec::new();
        }
        self.last_sweep = now;

        let idle = self.conf.idle.as_micros() as u64;
        let idle_fin = self.conf.idle_fin.as_micros() as u64;
        let idle_rst = self.conf.idle_rst.as_micros() as u64;

        let mut released = Vec::new();
        self.flows.retain(|_, flow| {
            let horizon = if flow.tcp_flags & wire_types::tcp::TCP_FLAG_RST != 0 {
                idle_rst
            } else if flow.tcp_flags & wire_types::tcp::TCP_FLAG_FIN != 0 {
                idle_fin
            } else {
                idle
            };
            if now.saturating_sub(flow.last_seen) > horizon {
                released.push(flow.clone());
                false
            } else {
                true
            }
        });

        for flow in &released {
            self.remember_evicted(flow.key);
        }
        self.stats.evicted_idle += released.len() as u64;
        released
    }

    /// Tears the table down, returning every remaining flow.
    pub fn drain(&mut self) -> Vec<FlowState> {
        self.flows.drain().map(|(_, f)| f).collect()
    }

    fn remember_evicted(&mut self, key: FlowKey) {
        // Bound the memory: beyond 4x the cap the reappearance counter
        // degrades to a lower bound.
        if self.evicted_keys.len() >= self.conf.max_flows.saturating_mul(4) {
            self.evicted_keys.clear();
        }
        self.evicted_keys.insert(key);
    }
}
