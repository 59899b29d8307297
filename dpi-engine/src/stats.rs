//! Counters and the final stdout report.
//!
//! Every stage owns its counters privately and hands them back when its
//! thread joins; nothing here is shared or atomic. The merged result renders
//! as the end-of-run report.

use std::fmt;

use crate::classify::AppLabel;
use crate::flow_table::TableStats;
use crate::packet::types::ParseError;

/// Per-kind dissection error counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParseErrorStats {
    pub truncated: u64,
    pub malformed_header: u64,
    pub fragmented: u64,
    pub unsupported_ethertype: u64,
    pub unsupported_l3: u64,
    pub unsupported_l4: u64,
}

impl ParseErrorStats {
    pub fn record(&mut self, err: ParseError) {
        match err {
            ParseError::Truncated => self.truncated += 1,
            ParseError::MalformedHeader => self.malformed_header += 1,
            ParseError::FragmentedUnsupported => self.fragmented += 1,
            ParseError::UnsupportedEthertype(_) => self.unsupported_ethertype += 1,
            ParseError::UnsupportedL3 => self.unsupported_l3 += 1,
            ParseError::UnsupportedL4(_) => self.unsupported_l4 += 1,
        }
    }

    pub fn merge(&mut self, other: &ParseErrorStats) {
        self.truncated += other.truncated;
        self.malformed_header += other.malformed_header;
        self.fragmented += other.fragmented;
        self.unsupported_ethertype += other.unsupported_ethertype;
        self.unsupported_l3 += other.unsupported_l3;
        self.unsupported_l4 += other.unsupported_l4;
    }

    pub fn total(&self) -> u64 {
        self.truncated
            + self.malformed_header
            + self.fragmented
            + self.unsupported_ethertype
            + self.unsupported_l3
            + self.unsupported_l4
    }
}

/// L7 extraction counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct L7Stats {
    pub sni_extracted: u64,
    pub host_extracted: u64,
    pub malformed_tls: u64,
    pub malformed_http: u64,
}

impl L7Stats {
    pub fn merge(&mut self, other: &L7Stats) {
        self.sni_extracted += other.sni_extracted;
        self.host_extracted += other.host_extracted;
        self.malformed_tls += other.malformed_tls;
        self.malformed_http += other.malformed_http;
    }
}

/// Merged end-of-run totals.
#[derive(Debug, Default, Clone)]
pub struct Report {
    pub total_packets: u64,
    pub forwarded: u64,
    pub dropped: u64,
    pub pass_through: u64,
    /// Packets attributed per application, tallied when a flow is released
    /// (eviction or teardown) under its final label.
    pub app_packets: [u64; AppLabel::ALL.len()],
    pub parse_errors: ParseErrorStats,
    pub l7: L7Stats,
    pub table: TableStats,
    /// Applications named by a block rule, annotated in the breakdown.
    pub blocked_apps: Vec<AppLabel>,
}

impl Report {
    pub fn add_flow_packets(&mut self, app: AppLabel, packets: u64) {
        self.app_packets[app.index()] += packets;
    }

    /// Application counts, largest first, zero buckets omitted. Ties keep
    /// the declaration order of [`AppLabel::ALL`].
    fn breakdown(&self) -> Vec<(AppLabel, u64)> {
        let mut rows: Vec<(AppLabel, u64)> = AppLabel::ALL
            .iter()
            .map(|&l| (l, self.app_packets[l.index()]))
            .filter(|&(_, n)| n > 0)
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Packets: {}", self.total_packets)?;
        writeln!(f, "Forwarded: {}", self.forwarded)?;
        writeln!(f, "Dropped: {}", self.dropped)?;
        writeln!(f, "Application Breakdown:")?;
        for (app, count) in self.breakdown() {
            if self.blocked_apps.contains(&app) {
                writeln!(f, "  {app}  {count} (BLOCKED)")?;
            } else {
                writeln!(f, "  {app}  {count}")?;
            }
        }
        Ok(())
    }
}
