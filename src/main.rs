//! `pompom` command line front end.
//!
//! Wires stdin and stdout to the codec with 32 KiB buffers on both sides.
//! Numeric options outside their documented ranges are clamped; conflicting
//! mode flags are rejected before any I/O. Diagnostics go to stderr with a
//! `pompom:` prefix; the exit code is 0 on success and 1 on any error.

use std::io::{self, BufReader, BufWriter};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use pompom::config::{
    ADAPT_DEFAULT, ADAPT_MAX, ADAPT_MIN, BOOT_DEFAULT, BOOT_MAX, BOOT_MIN, LIMIT_DEFAULT,
    LIMIT_MAX, LIMIT_MIN, ORDER_DEFAULT, ORDER_MAX, ORDER_MIN,
};
use pompom::{compress, decompress, CodecOptions};

/// Stdio buffer size on both sides.
const BUF_SIZE: usize = 32768;

/// Compress or decompress input using fixed-order PPM compression.
///
/// Reads from standard input and writes to standard output.
#[derive(Parser)]
#[command(name = "pompom", version)]
#[command(about = "Compress or decompress input using fixed-order PPM compression.\n\
                   Reads from standard input and writes to standard output.")]
struct Cli {
    /// compress to stdout (default)
    #[arg(short = 'c', long = "stdout", conflicts_with = "decompress")]
    stdout: bool,

    /// decompress to stdout
    #[arg(short, long)]
    decompress: bool,

    /// compress: model order [1,6]
    #[arg(short, long, value_name = "N", default_value_t = ORDER_DEFAULT)]
    order: u8,

    /// compress: memory use in MiB [8,2048]
    #[arg(short, long, value_name = "N", default_value_t = LIMIT_DEFAULT)]
    mem: u16,

    /// compress: bootstrap buffer size in KiB [1,255]
    #[arg(
        short,
        long,
        value_name = "N",
        default_value_t = BOOT_DEFAULT,
        conflicts_with = "reset"
    )]
    bootsize: u8,

    /// compress: full model reset on memory limit
    #[arg(short, long)]
    reset: bool,

    /// compress: fast local adaptation
    #[arg(short, long)]
    adapt: bool,

    /// compress: adaptation threshold in bits [1,32]
    #[arg(short = 'A', long, value_name = "N", default_value_t = ADAPT_DEFAULT)]
    adaptsize: u8,

    /// compress: stop after count bytes, 0 for unlimited
    #[arg(short = 'n', long, value_name = "N", default_value_t = 0)]
    count: u64,
}

impl Cli {
    fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            order: self.order.clamp(ORDER_MIN, ORDER_MAX),
            mem: self.mem.clamp(LIMIT_MIN, LIMIT_MAX),
            bootsize: if self.reset {
                0
            } else {
                self.bootsize.clamp(BOOT_MIN, BOOT_MAX)
            },
            adaptsize: if self.adapt {
                self.adaptsize.clamp(ADAPT_MIN, ADAPT_MAX)
            } else {
                0
            },
            count: self.count,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    let input = BufReader::with_capacity(BUF_SIZE, io::stdin().lock());
    let mut output = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());

    let result = if cli.decompress {
        decompress(input, &mut output).map(|_| ())
    } else {
        compress(input, &mut output, &cli.codec_options()).map(|stats| {
            eprintln!(
                "pompom: in {} -> out {} at {:.3} bpc",
                stats.bytes_in,
                stats.bytes_out,
                stats.bits_per_char()
            );
        })
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pompom: {}", e);
            ExitCode::FAILURE
        }
    }
}
