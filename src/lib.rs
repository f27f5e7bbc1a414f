//! Fixed-order PPM compression with a binary arithmetic coder.
//!
//! Implements Prediction by Partial Matching with escape method C: byte
//! statistics are kept per context (the last 1..=6 bytes), coding starts at
//! the configured order and escapes downwards until the byte has a non-zero
//! frequency, with a uniform order −1 fallback underneath. A fixed-capacity
//! cuckoo hash holds the context counts; on saturation the model resets it
//! and optionally replays a window of recent text to warm it back up.
//!
//! ## Features
//! - Core library has **zero dependencies**
//! - Self-describing stream: parameters travel in a 9-byte header
//! - Single up-front allocation sized by a MiB budget
//! - CRC-32 integrity check over the plaintext
//!
//! ## Architecture
//!
//! ```text
//! plaintext bytes
//!       ↓
//! ┌─────────────┐
//! │ Model       │ ← per-order cumulative frequencies over a CuckooTable
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ Encoder     │ ← range narrowing + renormalisation
//! └─────────────┘
//!       ↓
//! ┌─────────────┐
//! │ BitWriter   │ ← bit packing, buffered byte output
//! └─────────────┘
//!       ↓
//! compressed stream (header · code · CRC-32)
//! ```
//!
//! Decompression runs the same model against a [`coder::Decoder`]; both
//! sides update identically, so their statistics never diverge.
//!
//! ## Example
//!
//! ```rust
//! use pompom::{compress, decompress, CodecOptions};
//!
//! let text = b"abracadabra abracadabra";
//! let mut packed = Vec::new();
//! let stats = compress(&text[..], &mut packed, &CodecOptions::default()).unwrap();
//! assert_eq!(stats.bytes_in, text.len() as u64);
//!
//! let mut unpacked = Vec::new();
//! decompress(&packed[..], &mut unpacked).unwrap();
//! assert_eq!(unpacked, text);
//! ```

mod bitio;
pub mod codec;
pub mod coder;
pub mod config;
pub mod crc32;
pub mod cuckoo;
pub mod error;
pub mod model;

#[cfg(test)]
mod tests;

pub use codec::{compress, decompress, CompressStats};
pub use config::CodecOptions;
pub use error::{PompomError, Result};
