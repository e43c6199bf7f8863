//! In-memory random-access byte cursor.
//!
//! All nested box parsing reads through a [`ByteCursor`]. Every multi-byte
//! read names its byte order: the sefd vendor box mixes a little-endian
//! record length with big-endian sizes everywhere else, so there is no
//! "default" endianness to get wrong.

use bytes::Bytes;

use crate::{Error, Result};

/// A seekable read cursor over an owned byte buffer.
///
/// Invariant: `0 <= position <= len` at all times.
#[derive(Debug, Clone)]
pub struct ByteCursor {
    data: Bytes,
    pos: usize,
}

impl ByteCursor {
    /// Create a cursor that takes ownership of `data`.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }

    /// Create a cursor over a private copy of `data`.
    pub fn copy_from_slice(data: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(data))
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.pos as u64
    }

    /// Total buffer length.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Move the position to `pos`. Fails without side effect outside `[0, len]`.
    pub fn seek(&mut self, pos: u64) -> Result<()> {
        if pos > self.len() {
            return Err(Error::SeekOutOfRange {
                pos,
                len: self.len(),
            });
        }
        self.pos = pos as usize;
        Ok(())
    }

    /// Read exactly `n` bytes.
    ///
    /// A short read fails with [`Error::BufferUnderflow`] and leaves the
    /// cursor at the end of the buffer: the bytes are treated as consumed.
    pub fn read(&mut self, n: usize) -> Result<Bytes> {
        let have = self.remaining();
        if n > have {
            self.pos = self.data.len();
            return Err(Error::BufferUnderflow { need: n, have });
        }
        let out = self.data.slice(self.pos..self.pos + n);
        self.pos += n;
        Ok(out)
    }

    /// Read a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&bytes);
        Ok(out)
    }

    /// Advance the position by `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a 24-bit big-endian value (full-box flags).
    pub fn read_u24_be(&mut self) -> Result<u32> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Read a 32-bit little-endian value. Only the sefd record name length
    /// uses this byte order.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read bytes up to and including a NUL terminator, returning them
    /// without the terminator.
    pub fn read_nul_terminated(&mut self) -> Result<Bytes> {
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(idx) => {
                let value = self.data.slice(self.pos..self.pos + idx);
                self.pos += idx + 1;
                Ok(value)
            }
            None => {
                let have = rest.len();
                self.pos = self.data.len();
                Err(Error::BufferUnderflow {
                    need: have + 1,
                    have,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_advances_position() {
        let mut cursor = ByteCursor::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(&cursor.read(2).unwrap()[..], &[1, 2]);
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.remaining(), 3);
    }

    #[test]
    fn test_short_read_clamps_to_end() {
        let mut cursor = ByteCursor::new(vec![1, 2, 3]);
        cursor.seek(1).unwrap();
        let err = cursor.read(4).unwrap_err();
        assert!(matches!(err, Error::BufferUnderflow { need: 4, have: 2 }));
        assert_eq!(cursor.position(), cursor.len());
    }

    #[test]
    fn test_seek_bounds() {
        let mut cursor = ByteCursor::new(vec![0u8; 8]);
        assert!(cursor.seek(8).is_ok());
        assert_eq!(cursor.position(), 8);

        cursor.seek(3).unwrap();
        assert!(matches!(
            cursor.seek(9),
            Err(Error::SeekOutOfRange { pos: 9, len: 8 })
        ));
        // Failed seek leaves the position untouched
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_mixed_endianness() {
        let mut cursor = ByteCursor::new(vec![0x00, 0x00, 0x00, 0x10, 0x10, 0x00, 0x00, 0x00]);
        assert_eq!(cursor.read_u32_be().unwrap(), 16);
        assert_eq!(cursor.read_u32_le().unwrap(), 16);
    }

    #[test]
    fn test_u24_and_u64() {
        let mut cursor = ByteCursor::new(vec![
            0x01, 0x02, 0x03, // flags
            0, 0, 0, 1, 0, 0, 0, 0, // 2^32
        ]);
        assert_eq!(cursor.read_u24_be().unwrap(), 0x010203);
        assert_eq!(cursor.read_u64_be().unwrap(), 1 << 32);
        assert!(cursor.read_u8().is_err());
    }

    #[test]
    fn test_nul_terminated() {
        let mut cursor = ByteCursor::copy_from_slice(b"XYZ\0rest");
        assert_eq!(&cursor.read_nul_terminated().unwrap()[..], b"XYZ");
        assert_eq!(cursor.position(), 4);

        let mut unterminated = ByteCursor::copy_from_slice(b"abc");
        assert!(unterminated.read_nul_terminated().is_err());
        assert_eq!(unterminated.position(), 3);
    }
}
