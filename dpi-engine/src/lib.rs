//! Offline deep-packet-inspection engine.
//!
//! Reads a classic-pcap capture, reconstructs bidirectional flows, labels
//! them by application (TLS SNI, HTTP Host, port heuristics), applies
//! block/allow policy and writes the surviving packets to an output capture.

pub mod capture;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod flow_table;
pub mod l7;
pub mod packet;
pub mod pipeline;
pub mod rules;
pub mod stats;
