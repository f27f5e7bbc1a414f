//! Bit-level I/O over byte streams.
//!
//! The arithmetic coder produces and consumes single bits, most significant
//! bit of each byte first. The writer batches completed bytes through a
//! 32 KiB buffer before touching the underlying stream; the reader pulls one
//! byte at a time and turns end-of-input into a sticky flag instead of an
//! error, because the coder is expected to run a few bits past the payload
//! into the trailing fluff.
//!
//! Neither side owns the underlying stream: both are generic over
//! `Write`/`Read` and are normally handed a `&mut` borrow by the driver.

use std::io::{self, Read, Write};

use crate::error::Result;

/// Batch size for completed output bytes.
const WRITE_BUF_SIZE: usize = 32768;

/// Accumulates single bits into bytes and batches them out.
pub struct BitWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    /// Partial byte being filled, high bits first.
    byte: u8,
    /// Bits currently in `byte`.
    bit_count: u8,
    /// Completed bytes handed to the underlying stream or buffered.
    written: u64,
}

impl<W: Write> BitWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(WRITE_BUF_SIZE),
            byte: 0,
            bit_count: 0,
            written: 0,
        }
    }

    /// Append a single bit.
    #[inline(always)]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.byte = (self.byte << 1) | (bit as u8);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.push_byte()?;
        }
        Ok(())
    }

    /// Append a whole byte. Only valid on a byte boundary.
    #[inline]
    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        debug_assert_eq!(self.bit_count, 0, "write_byte off byte boundary");
        self.byte = b;
        self.bit_count = 8;
        self.push_byte()
    }

    /// Pad the current byte with zero bits and drain the buffer.
    ///
    /// Leaves the underlying stream open and unflushed; the caller decides
    /// when the stream itself is done.
    pub fn finish(&mut self) -> Result<()> {
        if self.bit_count != 0 {
            self.byte <<= 8 - self.bit_count;
            self.bit_count = 8;
            self.push_byte()?;
        }
        self.drain()
    }

    /// Completed bytes produced so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    #[inline(always)]
    fn push_byte(&mut self) -> Result<()> {
        self.buf.push(self.byte);
        self.byte = 0;
        self.bit_count = 0;
        self.written += 1;
        if self.buf.len() == WRITE_BUF_SIZE {
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

/// Serves single bits from a byte stream.
pub struct BitReader<R: Read> {
    inner: R,
    byte: u8,
    /// Unread bits remaining in `byte`.
    bits_left: u8,
    /// Set once a read past end-of-input has happened.
    eof: bool,
}

impl<R: Read> BitReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            byte: 0,
            bits_left: 0,
            eof: false,
        }
    }

    /// Read the next bit. Past end-of-input this keeps returning zero bits
    /// with [`eof`](Self::eof) raised.
    #[inline(always)]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.bits_left == 0 {
            self.byte = self.next_byte()?;
            self.bits_left = 8;
        }
        self.bits_left -= 1;
        Ok((self.byte >> self.bits_left) & 1 != 0)
    }

    /// Read a whole byte. Only valid on a byte boundary.
    #[inline]
    pub fn read_byte(&mut self) -> Result<u8> {
        debug_assert_eq!(self.bits_left, 0, "read_byte off byte boundary");
        self.next_byte()
    }

    /// Whether a read has gone past end-of-input.
    pub fn eof(&self) -> bool {
        self.eof
    }

    /// Give the underlying stream back, abandoning any partial byte.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_byte(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        loop {
            match self.inner.read(&mut b) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(0);
                }
                Ok(_) => return Ok(b[0]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}
