//! Binary arithmetic coder.
//!
//! Encoder/decoder pair over a 32-bit code range, after Witten, Neal and
//! Cleary (CACM 1987) and Mark Nelson's DDJ rendition, widened to 64-bit
//! registers so range × frequency products never overflow. Both sides work
//! from the same cumulative frequency tables: symbol `s` owns the slice
//! `[dist[s], dist[s + 1])` of a total of `dist[EOS + 1]`.
//!
//! Renormalisation emits or consumes one bit per range doubling and handles
//! the straddling-middle case with the classical pending-bit counter.

mod decoder;
mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;
