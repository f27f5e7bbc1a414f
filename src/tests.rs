//! End-to-end codec tests.
//!
//! Round-trips over characteristic inputs, stream-format checks, and
//! corruption handling, exercising compress and decompress together the way
//! the binary drives them.

use crate::codec::{compress, decompress, HEADER_LEN};
use crate::config::CodecOptions;
use crate::error::PompomError;

/// Deterministic pseudo-random byte source (xorshift64).
struct XorShift(u64);

impl XorShift {
    fn next_byte(&mut self) -> u8 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 32) as u8
    }

    fn bytes(seed: u64, n: usize) -> Vec<u8> {
        let mut gen = XorShift(seed);
        (0..n).map(|_| gen.next_byte()).collect()
    }
}

fn opts(order: u8, mem: u16, bootsize: u8, adaptsize: u8) -> CodecOptions {
    CodecOptions {
        order,
        mem,
        bootsize,
        adaptsize,
        count: 0,
    }
}

/// Compress, decompress, compare; hand back the compressed stream.
fn roundtrip(data: &[u8], o: &CodecOptions) -> Vec<u8> {
    let mut compressed = Vec::new();
    let stats = compress(data, &mut compressed, o).unwrap();
    assert_eq!(stats.bytes_in, data.len() as u64);
    assert_eq!(stats.bytes_out, compressed.len() as u64);

    let mut plain = Vec::new();
    let len = decompress(&compressed[..], &mut plain).unwrap();
    assert_eq!(len, data.len() as u64);
    assert_eq!(plain, data, "round-trip mismatch");
    compressed
}

#[test]
fn test_empty_input() {
    let compressed = roundtrip(b"", &opts(3, 8, 0, 0));
    // Magic + parameter block, the terminal EOS chain, CRC of nothing
    assert!(compressed.len() > HEADER_LEN + 4);
    assert_eq!(&compressed[..4], b"pim\0");
    assert_eq!(&compressed[compressed.len() - 4..], &[0, 0, 0, 0]);
}

#[test]
fn test_single_byte() {
    let compressed = roundtrip(b"A", &opts(3, 8, 0, 0));
    // Header and coder padding dominate
    assert!(compressed.len() < 32);
}

#[test]
fn test_repeating_byte() {
    let data = vec![b'A'; 10000];
    let compressed = roundtrip(&data, &opts(3, 8, 0, 0));
    // An almost-deterministic source: well under 1 bpc with header included
    let bpc = compressed.len() as f64 * 8.0 / data.len() as f64;
    assert!(bpc < 1.0, "repeating byte compressed to {:.3} bpc", bpc);
}

#[test]
fn test_alternating_bytes() {
    let data: Vec<u8> = (0..10000).map(|i| if i % 2 == 0 { b'A' } else { b'B' }).collect();
    let compressed = roundtrip(&data, &opts(3, 8, 0, 0));
    // Context capture makes the alternation nearly free as well
    let bpc = compressed.len() as f64 * 8.0 / data.len() as f64;
    assert!(bpc < 1.0, "alternating bytes compressed to {:.3} bpc", bpc);
}

#[test]
fn test_structured_text_all_configurations() {
    let text: Vec<u8> = b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .cycle()
        .take(20_000)
        .copied()
        .collect();
    for order in 1..=6 {
        for (bootsize, adaptsize) in [(0, 0), (32, 0), (0, 8), (32, 8)] {
            roundtrip(&text, &opts(order, 8, bootsize, adaptsize));
        }
    }
}

#[test]
fn test_all_byte_values() {
    let data: Vec<u8> = (0u16..=255).map(|c| c as u8).cycle().take(4096).collect();
    roundtrip(&data, &opts(3, 8, 0, 0));
}

#[test]
fn test_saturation_with_bootstrap() {
    // A megabyte of noise against an 8 MiB table saturates it; the model
    // must reset, replay the retained 32 KiB, and keep the streams in sync
    let data = XorShift::bytes(0x0123_4567_89AB_CDEF, 1 << 20);
    let mut compressed = Vec::new();
    let stats = compress(&data[..], &mut compressed, &opts(3, 8, 32, 0)).unwrap();
    assert!(stats.table_resets > 0, "table never saturated");

    let mut plain = Vec::new();
    decompress(&compressed[..], &mut plain).unwrap();
    assert_eq!(plain, data);
}

#[test]
fn test_saturation_reset_only() {
    let data = XorShift::bytes(0xFEED_FACE_CAFE_BEEF, 1 << 20);
    let mut compressed = Vec::new();
    let stats = compress(&data[..], &mut compressed, &opts(3, 8, 0, 0)).unwrap();
    assert!(stats.table_resets > 0, "table never saturated");

    let mut plain = Vec::new();
    decompress(&compressed[..], &mut plain).unwrap();
    assert_eq!(plain, data);
}

#[test]
fn test_magic_tampering_fails() {
    let compressed = roundtrip(b"tamper with me", &opts(3, 8, 0, 0));
    for bit in 0..32 {
        let mut bad = compressed.clone();
        bad[bit / 8] ^= 1 << (bit % 8);
        let mut plain = Vec::new();
        assert!(
            matches!(
                decompress(&bad[..], &mut plain),
                Err(PompomError::BadMagic)
            ),
            "flipped magic bit {} not caught",
            bit
        );
    }
}

#[test]
fn test_crc_tampering_fails() {
    let compressed = roundtrip(b"checksummed payload", &opts(3, 8, 0, 0));
    let crc_start = compressed.len() - 4;
    for bit in 0..32 {
        let mut bad = compressed.clone();
        bad[crc_start + bit / 8] ^= 1 << (bit % 8);
        let mut plain = Vec::new();
        assert!(
            matches!(
                decompress(&bad[..], &mut plain),
                Err(PompomError::ChecksumMismatch { .. })
            ),
            "flipped CRC bit {} not caught",
            bit
        );
    }
}

#[test]
fn test_payload_tampering_never_silent() {
    let data = b"a body long enough that code bits actually matter 0123456789";
    let compressed = roundtrip(data, &opts(3, 8, 0, 0));
    // Flip every bit of the coder payload in turn: decode must either fail
    // or still produce the original bytes (e.g. a flipped fluff bit)
    for byte in HEADER_LEN..compressed.len() - 4 {
        for bit in 0..8 {
            let mut bad = compressed.clone();
            bad[byte] ^= 1 << bit;
            let mut plain = Vec::new();
            if decompress(&bad[..], &mut plain).is_ok() {
                assert_eq!(
                    plain, data,
                    "byte {} bit {} slipped through silently",
                    byte, bit
                );
            }
        }
    }
}

#[test]
fn test_truncation_detected() {
    let compressed = roundtrip(b"soon to be cut short, repeatedly cut short", &opts(3, 8, 0, 0));
    for keep in HEADER_LEN..compressed.len() - 5 {
        let mut plain = Vec::new();
        let result = decompress(&compressed[..keep], &mut plain);
        assert!(result.is_err(), "truncation at {} not caught", keep);
    }
}

#[test]
fn test_streams_are_deterministic() {
    let data = b"same input, same parameters, same bytes out";
    let o = opts(4, 16, 16, 4);
    let first = roundtrip(data, &o);
    let second = roundtrip(data, &o);
    assert_eq!(first, second);
}

#[test]
fn test_header_reflects_parameters() {
    let compressed = roundtrip(b"parameter check", &opts(5, 64, 48, 7));
    assert_eq!(compressed[4], 5);
    assert_eq!(u16::from_be_bytes([compressed[5], compressed[6]]), 64);
    assert_eq!(compressed[7], 48);
    assert_eq!(compressed[8], 7);
}
