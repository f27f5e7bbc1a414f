//! Arithmetic decoder.

use std::io::Read;

use crate::bitio::BitReader;
use crate::config::{CODE_BITS, DIST_LEN, EOS, ESCAPE, FIRST_QTR, HALF, TOP_VALUE};
use crate::error::Result;

/// Mirrors the encoder's range narrowing, sliding a `CODE_BITS`-wide window
/// of the stream through `value` to pick each symbol.
pub struct Decoder<R: Read> {
    bits: BitReader<R>,
    /// Low end of the current code region.
    low: u64,
    /// High end of the current code region.
    high: u64,
    /// Code word currently being decoded.
    value: u64,
}

impl<R: Read> Decoder<R> {
    /// Prime the code window with the first `CODE_BITS / 8` stream bytes.
    pub fn new(inner: R) -> Result<Self> {
        let mut bits = BitReader::new(inner);
        let mut value = 0u64;
        for _ in 0..CODE_BITS / 8 {
            value = (value << 8) | bits.read_byte()? as u64;
        }
        Ok(Self {
            bits,
            low: 0,
            high: TOP_VALUE,
            value,
        })
    }

    /// Decode one symbol against a cumulative distribution.
    ///
    /// `dist_check` marks which byte symbols hold a slice of `dist`; entries
    /// outside it (and outside escape/EOS) are stale and never consulted.
    /// Once the input is exhausted this returns EOS without consuming.
    pub fn decode(&mut self, dist: &[u32; DIST_LEN], dist_check: &[u64; 4]) -> Result<u16> {
        if self.eof() {
            return Ok(EOS);
        }

        let range = self.high - self.low + 1;
        let total = dist[EOS as usize + 1] as u64;
        let freq = (((self.value - self.low + 1) * total - 1) / range) as u32;

        let sym = seek_symbol(dist, dist_check, freq);
        if sym == EOS {
            // Don't consume input after end of stream
            return Ok(sym);
        }

        // Narrow the code region to the slice allotted to this symbol
        let s = sym as usize;
        self.high = self.low + range * dist[s + 1] as u64 / total - 1;
        self.low += range * dist[s] as u64 / total;

        loop {
            if (self.high & HALF) == (self.low & HALF) {
                // Matching top bits shift out with the value window
            } else if (self.low & FIRST_QTR) != 0 && (self.high & FIRST_QTR) == 0 {
                // Straddling the middle: expand the middle half
                self.value ^= FIRST_QTR;
                self.low &= FIRST_QTR - 1;
                self.high |= FIRST_QTR;
            } else {
                break;
            }
            self.low = (self.low << 1) & TOP_VALUE;
            self.high = ((self.high << 1) | 1) & TOP_VALUE;
            self.value = ((self.value << 1) | self.bits.read_bit()? as u64) & TOP_VALUE;
        }
        Ok(sym)
    }

    /// Whether the underlying stream has run out.
    pub fn eof(&self) -> bool {
        self.bits.eof()
    }

    /// Give the underlying stream back, e.g. to read the trailer.
    pub fn into_inner(self) -> R {
        self.bits.into_inner()
    }

    /// Internal state probe.
    #[cfg(test)]
    pub fn debug_state(&self) -> (u64, u64, u64) {
        (self.low, self.high, self.value)
    }
}

/// Smallest marked byte whose right endpoint exceeds `freq`; escape when the
/// byte slices are exhausted first, EOS when even escape's slice is.
#[inline]
fn seek_symbol(dist: &[u32; DIST_LEN], dist_check: &[u64; 4], freq: u32) -> u16 {
    for (w, &word) in dist_check.iter().enumerate() {
        let mut bits = word;
        while bits != 0 {
            let b = bits.leading_zeros();
            bits ^= 1 << (63 - b);
            let c = (w << 6) + b as usize;
            if dist[c + 1] > freq {
                return c as u16;
            }
        }
    }
    if dist[ESCAPE as usize + 1] > freq {
        ESCAPE
    } else {
        EOS
    }
}
