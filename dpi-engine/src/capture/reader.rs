//! Pcap file reader.
//!
//! Global header layout (24 bytes):
//!
//! ```text
//! magic_number (4) | version_major (2) | version_minor (2)
//! thiszone (4) | sigfigs (4) | snaplen (4) | network (4)
//! ```
//!
//! followed by records of `ts_sec (4) | ts_usec (4) | incl_len (4) |
//! orig_len (4) | data[incl_len]`. The magic decides the byte order of every
//! later field.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::capture::{CaptureError, PacketTs, Record};

/// The pcap magic in its big-endian byte sequence.
const MAGIC_BE: [u8; 4] = [0xA1, 0xB2, 0xC3, 0xD4];
/// The same magic written by a little-endian producer.
const MAGIC_LE: [u8; 4] = [0xD4, 0xC3, 0xB2, 0xA1];

/// Ethernet link type.
const LINKTYPE_ETHERNET: u32 = 1;

/// Upper bound on a single record, past any plausible snaplen. A length
/// beyond this means the stream is corrupt and framing is lost.
const RECORD_SANITY_CAP: u32 = 256 * 1024;

#[derive(Debug)]
pub struct CaptureReader<R> {
    inner: R,
    big_endian: bool,
    pub snaplen: u32,
    pub link_type: u32,
}

impl CaptureReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> CaptureReader<R> {
    pub fn new(mut inner: R) -> Result<Self, CaptureError> {
        let mut header = [0u8; 24];
        inner
            .read_exact(&mut header)
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => CaptureError::TruncatedHeader,
                _ => CaptureError::Io(e),
            })?;

        let magic = [header[0], header[1], header[2], header[3]];
        let big_endian = if magic == MAGIC_BE {
            true
        } else if magic == MAGIC_LE {
            false
        } else {
            return Err(CaptureError::BadMagic(u32::from_be_bytes(magic)));
        };

        let field_u16 = |bytes: [u8; 2]| {
            if big_endian {
                u16::from_be_bytes(bytes)
            } else {
                u16::from_le_bytes(bytes)
            }
        };
        let field_u32 = |bytes: [u8; 4]| {
            if big_endian {
                u32::from_be_bytes(bytes)
            } else {
                u32::from_le_bytes(bytes)
            }
        };

        let version_major = field_u16([header[4], header[5]]);
        let version_minor = field_u16([header[6], header[7]]);
        if (version_major, version_minor) != (2, 4) {
            debug!(
                event.name = "capture.reader.unusual_version",
                version_major, version_minor, "pcap version is not 2.4, reading anyway"
            );
        }

        let snaplen = field_u32([header[16], header[17], header[18], header[19]]);
        let link_type = field_u32([header[20], header[21], header[22], header[23]]);
        if link_type != LINKTYPE_ETHERNET {
            return Err(CaptureError::BadLinkType(link_type));
        }

        Ok(Self {
            inner,
            big_endian,
            snaplen,
            link_type,
        })
    }

    #[inline]
    fn field_u32(&self, bytes: [u8; 4]) -> u32 {
        if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        }
    }

    /// Reads the next record. `Ok(None)` is clean end-of-file; a record cut
    /// short mid-header or mid-body is [`CaptureError::TruncatedRecord`].
    pub fn next_record(&mut self) -> Result<Option<Record>, CaptureError> {
        let mut header = [0u8; 16];
        match read_exact_or_eof(&mut self.inner, &mut header)? {
            ReadOutcome::Eof => return Ok(None),
            ReadOutcome::Partial => return Err(CaptureError::TruncatedRecord),
            ReadOutcome::Full => {}
        }

        let ts_sec = self.field_u32([header[0], header[1], header[2], header[3]]);
        let ts_usec = self.field_u32([header[4], header[5], header[6], header[7]]);
        let incl_len = self.field_u32([header[8], header[9], header[10], header[11]]);
        let orig_len = self.field_u32([header[12], header[13], header[14], header[15]]);

        let cap = RECORD_SANITY_CAP.max(self.snaplen);
        if incl_len > cap {
            warn!(
                event.name = "capture.reader.oversized_record",
                incl_len, cap, "record length fails sanity check"
            );
            return Err(CaptureError::OversizedRecord(incl_len));
        }

        let mut data = vec![0u8; incl_len as usize];
        self.inner.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => CaptureError::TruncatedRecord,
            _ => CaptureError::Io(e),
        })?;

        Ok(Some(Record {
            ts: PacketTs {
                sec: ts_sec,
                usec: ts_usec,
            },
            orig_len,
            data,
        }))
    }
}

enum ReadOutcome {
    Full,
    Partial,
    Eof,
}

/// Like `read_exact`, but distinguishes "no bytes at all" (EOF) from "some
/// bytes then EOF" (torn record).
fn read_exact_or_eof<R: Read>(inner: &mut R, buf: &mut [u8]) -> Result<ReadOutcome, CaptureError> {
    let mut filled = 0;
    while filled < buf.len() {
        match inner.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    ReadOutcome::Eof
                } else {
                    ReadOutcome::Partial
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CaptureError::Io(e)),
        }
    }
    Ok(ReadOutcome::Full)
}
