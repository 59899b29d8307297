//! TLS ClientHello parsing for SNI extraction.
//!
//! Wire format reference:
//!
//! ```text
//! TLS Record:
//!   Content Type (1 byte): 22 = Handshake
//!   Version (2 bytes): major must be 3
//!   Length (2 bytes)
//!
//! Handshake:
//!   Type (1 byte): 1 = ClientHello
//!   Length (3 bytes)
//!   legacy_version (2) | random (32)
//!   session_id        (u8  length-prefixed)
//!   cipher_suites     (u16 length-prefixed)
//!   compression       (u8  length-prefixed)
//!   extensions        (u16 length-prefixed): type (2) | length (2) | data
//! ```
//!
//! Every length-prefixed field is consumed through the bounded cursor; a
//! shortfall or a length that exceeds its container is [`L7Error::MalformedTls`].
//! The first ClientHello seen on a flow is authoritative: the caller never
//! retries, so a crafted retry cannot repoint classification.

use crate::l7::L7Error;
use crate::packet::cursor::Cursor;

/// TLS content type for Handshake messages.
const TLS_HANDSHAKE: u8 = 22;

/// Handshake type: ClientHello.
const CLIENT_HELLO: u8 = 1;

/// Extension type: server_name.
const EXT_SERVER_NAME: u16 = 0x0000;

/// SNI entry type: host_name.
const NAME_TYPE_HOST: u8 = 0;

/// Parses a TLS ClientHello and returns the SNI host name, lowercased.
///
/// Returns `Ok(None)` for a well-formed ClientHello that carries no
/// server_name extension.
pub fn extract_sni(payload: &[u8]) -> Result<Option<String>, L7Error> {
    parse(payload).map_err(|_| L7Error::MalformedTls)
}

/// Internal parse over the strict cursor; any `CursorError` bubbles up and is
/// mapped to `MalformedTls` at the boundary.
fn parse(payload: &[u8]) -> Result<Option<String>, crate::packet::cursor::CursorError> {
    use crate::packet::cursor::CursorError::TruncatedInput;

    let mut rec = Cursor::new(payload);

    // Record header.
    if rec.read_u8()? != TLS_HANDSHAKE {
        return Err(TruncatedInput);
    }
    if rec.read_u8()? != 3 {
        return Err(TruncatedInput);
    }
    rec.skip(1)?; // version minor, any 3.x
    let record_len = rec.read_u16_be()? as usize;
    let mut hs = Cursor::new(rec.take(record_len)?);

    // Handshake header.
    if hs.read_u8()? != CLIENT_HELLO {
        return Err(TruncatedInput);
    }
    let hs_len = hs.read_u24_be()? as usize;
    let mut body = Cursor::new(hs.take(hs_len)?);

    body.skip(2)?; // legacy_version
    body.skip(32)?; // random
    let session_id_len = body.read_u8()? as usize;
    body.skip(session_id_len)?;
    let cipher_suites_len = body.read_u16_be()? as usize;
    body.skip(cipher_suites_len)?;
    let compression_len = body.read_u8()? as usize;
    body.skip(compression_len)?;

    if body.remaining() == 0 {
        // Legal: ClientHello without extensions.
        return Ok(None);
    }

    let ext_total_len = body.read_u16_be()? as usize;
    let mut exts = Cursor::new(body.take(ext_total_len)?);

    while exts.remaining() > 0 {
        let ext_type = exts.read_u16_be()?;
        let ext_len = exts.read_u16_be()? as usize;
        let ext_data = exts.take(ext_len)?;

        if ext_type == EXT_SERVER_NAME {
            return parse_server_name_list(ext_data).map(Some);
        }
    }

    Ok(None)
}

/// Walks the server_name_list and returns the first host_name entry.
fn parse_server_name_list(data: &[u8]) -> Result<String, crate::packet::cursor::CursorError> {
    use crate::packet::cursor::CursorError::TruncatedInput;

    let mut cur = Cursor::new(data);
    let list_len = cur.read_u16_be()? as usize;
    let mut list = Cursor::new(cur.take(list_len)?);

    while list.remaining() > 0 {
        let name_type = list.read_u8()?;
        let name_len = list.read_u16_be()? as usize;
        let name = list.take(name_len)?;

        if name_type == NAME_TYPE_HOST {
            if name.is_empty() || !name.iter().all(|b| b.is_ascii_graphic()) {
                return Err(TruncatedInput);
            }
            let mut host = String::with_capacity(name.len());
            host.extend(name.iter().map(|b| b.to_ascii_lowercase() as char));
            return Ok(host);
        }
    }

    // A server_name extension with no host_name entry.
    Err(TruncatedInput)
}
