//! Bounds-checked cursor over untrusted packet bytes.
//!
//! Every dissection layer (link/network/transport headers, TLS, HTTP, pcap
//! record framing) reads through this type; nothing else indexes raw packet
//! slices. An operation that would run past the end of the buffer fails with
//! [`CursorError::TruncatedInput`] and does not advance the position.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("truncated input")]
    TruncatedInput,
}

/// A read-only cursor over a byte slice.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current offset from the start of the underlying buffer.
    #[inline]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline]
    fn check(&self, n: usize) -> Result<(), CursorError> {
        if self.remaining() < n {
            return Err(CursorError::TruncatedInput);
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        self.check(1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, CursorError> {
        self.check(2)?;
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u24_be(&mut self) -> Result<u32, CursorError> {
        self.check(3)?;
        let v = u32::from_be_bytes([
            0,
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
        ]);
        self.pos += 3;
        Ok(v)
    }

    pub fn read_u32_be(&mut self) -> Result<u32, CursorError> {
        self.check(4)?;
        let v = u32::from_be_bytes([
            self.buf[self.pos],
            self.buf[self.pos + 1],
            self.buf[self.pos + 2],
            self.buf[self.pos + 3],
        ]);
        self.pos += 4;
        Ok(v)
    }

    /// Reads `n` bytes and returns them as a sub-slice of the buffer.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        self.check(n)?;
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), CursorError> {
        self.check(n)?;
        self.pos += n;
        Ok(())
    }

    /// Reads a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CursorError> {
        let s = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(s);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_in_order() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u8().unwrap(), 0x01);
        assert_eq!(cur.read_u16_be().unwrap(), 0x0203);
        assert_eq!(cur.read_u24_be().unwrap(), 0x040506);
        assert_eq!(cur.remaining(), 1);
        assert_eq!(cur.offset(), 6);
    }

    #[test]
    fn shortfall_does_not_advance() {
        let buf = [0xAA, 0xBB];
        let mut cur = Cursor::new(&buf);
        assert_eq!(cur.read_u32_be(), Err(CursorError::TruncatedInput));
        // Position unchanged, smaller reads still succeed.
        assert_eq!(cur.offset(), 0);
        assert_eq!(cur.read_u16_be().unwrap(), 0xAABB);
    }

    #[test]
    fn take_yields_subslice() {
        let buf = [1, 2, 3, 4];
        let mut cur = Cursor::new(&buf);
        cur.skip(1).unwrap();
        assert_eq!(cur.take(2).unwrap(), &[2, 3]);
        assert_eq!(cur.take(2), Err(CursorError::TruncatedInput));
        assert_eq!(cur.take(1).unwrap(), &[4]);
    }

    #[test]
    fn empty_buffer() {
        let mut cur = Cursor::new(&[]);
        assert_eq!(cur.remaining(), 0);
        assert_eq!(cur.read_u8(), Err(CursorError::TruncatedInput));
        assert_eq!(cur.skip(0), Ok(()));
    }
}
