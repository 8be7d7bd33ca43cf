use crate::error::{Error, Result};

/// Bounds-checked big-endian reader over an immutable byte buffer.
///
/// Every read either returns exactly the bytes asked for or fails with
/// [`Error::OutOfBounds`]; the offset only moves on success.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start reading at `pos`. Positions past the end are clamped so that
    /// the cursor simply reports zero remaining bytes.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self {
            buf,
            pos: pos.min(buf.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn check(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::OutOfBounds {
                offset: self.pos,
                wanted: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    /// Return a view of the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u16_be(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Look at the next `n` bytes without advancing.
    pub fn peek_bytes(&self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        Ok(&self.buf[self.pos..self.pos + n])
    }

    /// Next `n` bytes as text, one char per byte (ASCII / Latin-1).
    pub fn peek_ascii(&self, n: usize) -> Result<String> {
        Ok(latin1(self.peek_bytes(n)?))
    }

    /// Next `n` bytes as lowercase hex, e.g. `89504e470d0a1a0a`.
    pub fn peek_hex(&self, n: usize) -> Result<String> {
        Ok(self
            .peek_bytes(n)?
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    }
}

/// Decode bytes as Latin-1: every byte maps to the code point of the same value.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
