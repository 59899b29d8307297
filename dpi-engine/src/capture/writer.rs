//! Pcap file writer.
//!
//! Emits the host's native byte order. The snaplen and link type are copied
//! from the input capture so the output stays a faithful subset.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::capture::{CaptureError, PacketTs};

const MAGIC: u32 = 0xA1B2_C3D4;
const VERSION_MAJOR: u16 = 2;
const VERSION_MINOR: u16 = 4;

pub struct CaptureWriter<W: Write> {
    inner: W,
}

impl CaptureWriter<BufWriter<File>> {
    pub fn create(path: &Path, snaplen: u32, link_type: u32) -> Result<Self, CaptureError> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), snaplen, link_type)
    }
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(mut inner: W, snaplen: u32, link_type: u32) -> Result<Self, CaptureError> {
        inner.write_all(&MAGIC.to_ne_bytes())?;
        inner.write_all(&VERSION_MAJOR.to_ne_bytes())?;
        inner.write_all(&VERSION_MINOR.to_ne_bytes())?;
        inner.write_all(&0i32.to_ne_bytes())?; // thiszone
        inner.write_all(&0u32.to_ne_bytes())?; // sigfigs
        inner.write_all(&snaplen.to_ne_bytes())?;
        inner.write_all(&link_type.to_ne_bytes())?;
        Ok(Self { inner })
    }

    /// Writes one record, preserving the original timestamp and length.
    pub fn write_record(
        &mut self,
        ts: PacketTs,
        orig_len: u32,
        data: &[u8],
    ) -> Result<(), CaptureError> {
        self.inner.write_all(&ts.sec.to_ne_bytes())?;
        self.inner.write_all(&ts.usec.to_ne_bytes())?;
        self.inner.write_all(&(data.len() as u32).to_ne_bytes())?;
        self.inner.write_all(&orig_len.to_ne_bytes())?;
        self.inner.write_all(data)?;
        Ok(())
    }

    pub fn finalize(mut self) -> Result<(), CaptureError> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::reader::CaptureReader;

    #[test]
    fn round_trips_through_the_reader() {
        let mut buf = Vec::new();
        {
            let mut writer = CaptureWriter::new(&mut buf, 65535, 1).unwrap();
            writer
                .write_record(PacketTs { sec: 7, usec: 9 }, 100, b"payload")
                .unwrap();
            writer
                .write_record(PacketTs { sec: 8, usec: 0 }, 4, b"tiny")
                .unwrap();
            writer.finalize().unwrap();
        }

        let mut reader = CaptureReader::new(buf.as_slice()).unwrap();
        assert_eq!(reader.snaplen, 65535);
        assert_eq!(reader.link_type, 1);

        let r1 = reader.next_record().unwrap().unwrap();
        assert_eq!((r1.ts.sec, r1.ts.usec), (7, 9));
        assert_eq!(r1.orig_len, 100);
        assert_eq!(r1.data, b"payload");

        let r2 = reader.next_record().unwrap().unwrap();
        assert_eq!(r2.data, b"tiny");
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn header_is_native_endian() {
        let mut buf = Vec::new();
        CaptureWriter::new(&mut buf, 1500, 1).unwrap();
        assert_eq!(&buf[0..4], &MAGIC.to_ne_bytes());
        assert_eq!(buf.len(), 24);
    }
}
