//! Application-layer extractors run on the first client-to-server payload of
//! a flow: TLS ClientHello -> SNI, HTTP request -> Host.

pub mod http;
pub mod tls;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum L7Error {
    #[error("malformed TLS ClientHello")]
    MalformedTls,
    #[error("malformed HTTP request")]
    MalformedHttp,
}
