//! Arithmetic encoder.

use std::io::Write;

use crate::bitio::BitWriter;
use crate::config::{CODE_BITS, DIST_LEN, EOS, FIRST_QTR, HALF, TOP_VALUE};
use crate::error::Result;

/// Narrows a code range over cumulative frequency tables, emitting bits
/// through a [`BitWriter`] as the range renormalises.
pub struct Encoder<W: Write> {
    bits: BitWriter<W>,
    /// Low end of the current code region.
    low: u64,
    /// High end of the current code region.
    high: u64,
    /// Opposite bits owed after the next emitted bit.
    bits_to_follow: u64,
}

impl<W: Write> Encoder<W> {
    pub fn new(inner: W) -> Self {
        Self {
            bits: BitWriter::new(inner),
            low: 0,
            high: TOP_VALUE,
            bits_to_follow: 0,
        }
    }

    /// Encode one symbol against a cumulative distribution.
    pub fn encode(&mut self, sym: u16, dist: &[u32; DIST_LEN]) -> Result<()> {
        debug_assert!(sym <= EOS, "symbol {} not in code range", sym);
        let s = sym as usize;

        // Narrow the code region to the slice allotted to this symbol
        let range = self.high - self.low + 1;
        let total = dist[EOS as usize + 1] as u64;
        self.high = self.low + range * dist[s + 1] as u64 / total - 1;
        self.low += range * dist[s] as u64 / total;

        loop {
            if (self.high & HALF) == (self.low & HALF) {
                // Top bits agree and can be shifted out
                self.bit_plus_follow(self.high & HALF != 0)?;
            } else if (self.low & FIRST_QTR) != 0 && (self.high & FIRST_QTR) == 0 {
                // Straddling the middle: defer the bit, expand the middle half
                self.bits_to_follow += 1;
                self.low &= FIRST_QTR - 1;
                self.high |= FIRST_QTR;
            } else {
                break;
            }
            self.low = (self.low << 1) & TOP_VALUE;
            self.high = ((self.high << 1) | 1) & TOP_VALUE;
        }
        Ok(())
    }

    /// Flush the coder state: one bit selecting the quarter containing the
    /// final range, byte padding, and `CODE_BITS / 8` zero bytes so decoder
    /// priming and renormalisation never run into the stream trailer.
    ///
    /// Returns the total number of code bytes produced.
    pub fn finish(mut self) -> Result<u64> {
        self.bits_to_follow += 1;
        let bit = self.low >= FIRST_QTR;
        self.bit_plus_follow(bit)?;
        self.bits.finish()?;
        for _ in 0..CODE_BITS / 8 {
            self.bits.write_byte(0)?;
        }
        Ok(self.bits.bytes_written())
    }

    /// Emit a bit plus any opposite bits owed from straddling states.
    #[inline]
    fn bit_plus_follow(&mut self, bit: bool) -> Result<()> {
        self.bits.write_bit(bit)?;
        while self.bits_to_follow > 0 {
            self.bits.write_bit(!bit)?;
            self.bits_to_follow -= 1;
        }
        Ok(())
    }
}
