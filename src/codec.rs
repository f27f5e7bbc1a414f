//! Compression and decompression drivers.
//!
//! Wires the model and the arithmetic coder together over byte streams and
//! frames the result as a self-describing stream:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic `p` `i` `m` `\0` |
//! | 4 | 1 | Model order |
//! | 5 | 2 | Memory limit in MiB, big-endian |
//! | 7 | 1 | Bootstrap buffer in KiB, 0 = reset-only |
//! | 8 | 1 | Adaptation exponent, 0 = disabled |
//! | 9 | — | Arithmetic code, EOS-terminated, byte-padded plus fluff |
//! | end−4 | 4 | CRC-32 of the plaintext, big-endian |
//!
//! Coding walks each byte down from the configured order, emitting an escape
//! at every order that has no slice for it, until order −1 guarantees one.
//! End of stream escapes through every order and codes EOS at −1.

use std::io::{Read, Write};

use crate::coder::{Decoder, Encoder};
use crate::config::{CodecOptions, DIST_LEN, EOS, ESCAPE, MAGIC};
use crate::crc32::Crc32;
use crate::error::{PompomError, Result};
use crate::model::{check_bit, Model};

/// Bytes of magic plus parameter block ahead of the arithmetic code.
pub const HEADER_LEN: usize = MAGIC.len() + 5;

/// Input and output byte counts of a compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressStats {
    /// Plaintext bytes consumed.
    pub bytes_in: u64,
    /// Compressed bytes produced, header and trailer included.
    pub bytes_out: u64,
    /// Context-table saturation resets performed by the model.
    pub table_resets: u64,
}

impl CompressStats {
    /// Compressed bits per plaintext character.
    pub fn bits_per_char(&self) -> f64 {
        if self.bytes_in == 0 {
            0.0
        } else {
            (self.bytes_out as f64 * 8.0) / self.bytes_in as f64
        }
    }
}

fn write_header<W: Write>(out: &mut W, opts: &CodecOptions) -> Result<()> {
    out.write_all(&MAGIC)?;
    out.write_all(&[opts.order])?;
    out.write_all(&opts.mem.to_be_bytes())?;
    out.write_all(&[opts.bootsize, opts.adaptsize])?;
    Ok(())
}

fn read_header<R: Read>(input: &mut R) -> Result<CodecOptions> {
    let mut magic = [0u8; MAGIC.len()];
    input.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(PompomError::BadMagic);
    }
    let mut fields = [0u8; 5];
    input.read_exact(&mut fields)?;
    let opts = CodecOptions {
        order: fields[0],
        mem: u16::from_be_bytes([fields[1], fields[2]]),
        bootsize: fields[3],
        adaptsize: fields[4],
        count: 0,
    };
    opts.validate()?;
    Ok(opts)
}

/// Compress `input` into `output` under the given parameters.
///
/// The stream is terminated by an encoded EOS and the plaintext CRC; `opts`
/// is validated (and the model allocated) before anything is written.
pub fn compress<R: Read, W: Write>(
    input: R,
    mut output: W,
    opts: &CodecOptions,
) -> Result<CompressStats> {
    let mut model = Model::new(opts)?;
    write_header(&mut output, opts)?;

    let mut crc = Crc32::new();
    let mut dist = [0u32; DIST_LEN];
    let mut exclude = [0u64; 4];
    let mut dist_check = [0u64; 4];
    let mut len: u64 = 0;

    let mut enc = Encoder::new(&mut output);
    for b in input.bytes() {
        let b = b?;
        let c = b as usize;

        // Seek the first order that has a slice for this byte
        for ord in (-1..=model.order()).rev() {
            model.dist(ord, &mut dist, &mut exclude, &mut dist_check);
            if check_bit(&dist_check, c) {
                break;
            }
            enc.encode(ESCAPE, &dist)?;
        }
        assert!(dist[c] != dist[c + 1], "zero frequency for symbol {}", c);
        enc.encode(c as u16, &dist)?;

        model.update(b);
        crc.update_byte(b);
        len += 1;

        if opts.count != 0 && len == opts.count {
            break;
        }
    }

    // Escape down to the universal order and close with EOS
    for ord in (0..=model.order()).rev() {
        model.dist(ord, &mut dist, &mut exclude, &mut dist_check);
        enc.encode(ESCAPE, &dist)?;
    }
    model.dist(-1, &mut dist, &mut exclude, &mut dist_check);
    assert!(
        dist[EOS as usize] != dist[EOS as usize + 1],
        "zero frequency for end of stream"
    );
    enc.encode(EOS, &dist)?;
    let code_len = enc.finish()?;

    output.write_all(&crc.finalize().to_be_bytes())?;
    output.flush()?;

    Ok(CompressStats {
        bytes_in: len,
        bytes_out: HEADER_LEN as u64 + code_len + 4,
        table_resets: model.saturation_resets(),
    })
}

/// Decompress `input` into `output`, verifying the trailing checksum.
///
/// Returns the number of plaintext bytes produced.
pub fn decompress<R: Read, W: Write>(mut input: R, mut output: W) -> Result<u64> {
    let opts = read_header(&mut input)?;
    let mut model = Model::new(&opts)?;

    let mut crc = Crc32::new();
    let mut dist = [0u32; DIST_LEN];
    let mut exclude = [0u64; 4];
    let mut dist_check = [0u64; 4];
    let mut len: u64 = 0;

    let mut dec = Decoder::new(&mut input)?;
    loop {
        let mut sym = ESCAPE;
        for ord in (-1..=model.order()).rev() {
            model.dist(ord, &mut dist, &mut exclude, &mut dist_check);
            sym = dec.decode(&dist, &dist_check)?;
            if sym != ESCAPE {
                break;
            }
        }
        assert!(sym != ESCAPE, "escape leaked past the universal order");
        if sym == EOS {
            break;
        }

        let b = sym as u8;
        output.write_all(&[b])?;
        model.update(b);
        crc.update_byte(b);
        len += 1;
    }
    if dec.eof() {
        // EOS came from the input running dry, not from the code
        return Err(PompomError::UnexpectedEof);
    }

    // Trailer: skip whatever fluff the coder left, keep the last 32 bits
    let reader = dec.into_inner();
    let mut stored: u32 = 0;
    for b in reader.bytes() {
        stored = (stored << 8) | b? as u32;
    }
    let computed = crc.finalize();
    if stored != computed {
        return Err(PompomError::ChecksumMismatch { stored, computed });
    }

    output.flush()?;
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let opts = CodecOptions {
            order: 5,
            mem: 1024,
            bootsize: 64,
            adaptsize: 12,
            count: 9000, // not serialized
        };
        let mut buf = Vec::new();
        write_header(&mut buf, &opts).unwrap();
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(&buf[..4], b"pim\0");
        assert_eq!(buf[4], 5);
        assert_eq!(&buf[5..7], &[0x04, 0x00]);
        assert_eq!(buf[7], 64);
        assert_eq!(buf[8], 12);

        let parsed = read_header(&mut &buf[..]).unwrap();
        assert_eq!(parsed.order, opts.order);
        assert_eq!(parsed.mem, opts.mem);
        assert_eq!(parsed.bootsize, opts.bootsize);
        assert_eq!(parsed.adaptsize, opts.adaptsize);
        assert_eq!(parsed.count, 0);
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let buf = *b"pyx\0\x03\x00\x20\x20\x00";
        assert!(matches!(
            read_header(&mut &buf[..]),
            Err(PompomError::BadMagic)
        ));
    }

    #[test]
    fn test_header_rejects_out_of_range_fields() {
        // Order 9
        let buf = *b"pim\0\x09\x00\x20\x20\x00";
        assert!(matches!(
            read_header(&mut &buf[..]),
            Err(PompomError::InvalidOrder(9))
        ));
        // Memory limit 4 MiB
        let buf = *b"pim\0\x03\x00\x04\x20\x00";
        assert!(matches!(
            read_header(&mut &buf[..]),
            Err(PompomError::InvalidMemoryLimit(4))
        ));
    }

    #[test]
    fn test_header_rejects_truncation() {
        let buf = *b"pim\0\x03";
        assert!(matches!(
            read_header(&mut &buf[..]),
            Err(PompomError::UnexpectedEof)
        ));
    }

    #[test]
    fn test_byte_count_cap() {
        let opts = CodecOptions {
            count: 5,
            ..CodecOptions::default()
        };
        let mut compressed = Vec::new();
        let stats = compress(&b"0123456789"[..], &mut compressed, &opts).unwrap();
        assert_eq!(stats.bytes_in, 5);

        let mut plain = Vec::new();
        decompress(&compressed[..], &mut plain).unwrap();
        assert_eq!(plain, b"01234");
    }

    #[test]
    fn test_stats_account_for_every_byte() {
        let opts = CodecOptions::default();
        let mut compressed = Vec::new();
        let stats = compress(&b"some plaintext"[..], &mut compressed, &opts).unwrap();
        assert_eq!(stats.bytes_out, compressed.len() as u64);
        assert!(stats.bits_per_char() > 0.0);
    }

    #[test]
    fn test_invalid_options_rejected_before_output() {
        let opts = CodecOptions {
            order: 0,
            ..CodecOptions::default()
        };
        let mut compressed = Vec::new();
        assert!(compress(&b"x"[..], &mut compressed, &opts).is_err());
        assert!(compressed.is_empty());
    }
}
