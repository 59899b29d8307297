//! HTTP/1.x request parsing for Host extraction.
//!
//! Only the request line and headers are inspected, capped at 8 KiB. The
//! caller invokes this on the first client-to-server payload of a port-80
//! flow when it begins with a known method token.

use crate::l7::L7Error;

/// Maximum number of payload bytes scanned for the Host header.
const SCAN_LIMIT: usize = 8 * 1024;

/// Known request method tokens, including the trailing space.
const METHOD_TOKENS: &[&[u8]] = &[
    b"GET ", b"POST ", b"HEAD ", b"PUT ", b"DELETE ", b"OPTIONS ",
];

/// Returns true if the payload begins with a known HTTP method token.
pub fn looks_like_request(payload: &[u8]) -> bool {
    METHOD_TOKENS.iter().any(|m| payload.starts_with(m))
}

/// Scans the header block for `Host:` and returns the trimmed, lowercased
/// value. Multiple Host headers are malformed. `Ok(None)` means the header
/// block carried no Host line.
pub fn extract_host(payload: &[u8]) -> Result<Option<String>, L7Error> {
    let scan = &payload[..payload.len().min(SCAN_LIMIT)];

    let mut host: Option<String> = None;
    // First line is the request line; the caller already validated it.
    for line in scan.split(|&b| b == b'\n').skip(1) {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            break; // end of headers
        }

        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        if !line[..colon].eq_ignore_ascii_case(b"host") {
            continue;
        }
        if host.is_some() {
            return Err(L7Error::MalformedHttp);
        }

        let value = trim_ascii(&line[colon + 1..]);
        if value.is_empty() || !value.iter().all(|b| b.is_ascii_graphic()) {
            return Err(L7Error::MalformedHttp);
        }
        let mut s = String::with_capacity(value.len());
        s.extend(value.iter().map(|b| b.to_ascii_lowercase() as char));
        host = Some(s);
    }

    Ok(host)
}

fn trim_ascii(mut bytes: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = bytes {
        bytes = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = bytes {
        bytes = rest;
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_token_detection() {
        assert!(looks_like_request(b"GET / HTTP/1.1\r\n"));
        assert!(looks_like_request(b"OPTIONS * HTTP/1.1\r\n"));
        assert!(!looks_like_request(b"PATCH / HTTP/1.1\r\n"));
        assert!(!looks_like_request(b"\x16\x03\x01"));
        assert!(!looks_like_request(b""));
    }

    #[test]
    fn extracts_host() {
        let req = b"GET /watch HTTP/1.1\r\nUser-Agent: curl\r\nHost: Example.COM\r\nAccept: */*\r\n\r\n";
        assert_eq!(extract_host(req).unwrap(), Some("example.com".to_string()));
    }

    #[test]
    fn host_value_is_trimmed() {
        let req = b"GET / HTTP/1.1\r\nhost:\t  cdn.example.net  \r\n\r\n";
        assert_eq!(
            extract_host(req).unwrap(),
            Some("cdn.example.net".to_string())
        );
    }

    #[test]
    fn missing_host_is_none() {
        let req = b"GET / HTTP/1.0\r\nAccept: */*\r\n\r\n";
        assert_eq!(extract_host(req).unwrap(), None);
    }

    #[test]
    fn duplicate_host_is_malformed() {
        let req = b"GET / HTTP/1.1\r\nHost: a.com\r\nHost: b.com\r\n\r\n";
        assert_eq!(extract_host(req), Err(L7Error::MalformedHttp));
    }

    #[test]
    fn empty_host_is_malformed() {
        let req = b"GET / HTTP/1.1\r\nHost:   \r\n\r\n";
        assert_eq!(extract_host(req), Err(L7Error::MalformedHttp));
    }

    #[test]
    fn host_after_body_separator_is_ignored() {
        let req = b"POST /u HTTP/1.1\r\nContent-Length: 20\r\n\r\nHost: smuggled.com\r\n";
        assert_eq!(extract_host(req).unwrap(), None);
    }

    #[test]
    fn scan_stops_at_limit() {
        let mut req = b"GET / HTTP/1.1\r\n".to_vec();
        req.extend(std::iter::repeat_n(b'X', SCAN_LIMIT));
        req.extend_from_slice(b"\r\nHost: late.com\r\n\r\n");
        assert_eq!(extract_host(&req).unwrap(), None);
    }
}
