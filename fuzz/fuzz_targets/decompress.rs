#![no_main]
use libfuzzer_sys::fuzz_target;

// Fuzz the decoder with arbitrary bytes: errors are fine, panics are not.
fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }

    // Cap the memory limit field to keep the model allocation small
    let mem = u16::from_be_bytes([data[5], data[6]]);
    if mem > 32 {
        return;
    }

    let mut out = Vec::new();
    let _ = pompom::decompress(data, &mut out);
});
