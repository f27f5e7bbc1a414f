#![no_main]
use libfuzzer_sys::fuzz_target;
use pompom::CodecOptions;

// Compress then decompress arbitrary plaintext: the output must match.
fuzz_target!(|data: &[u8]| {
    // Cap input size to prevent timeouts
    if data.len() > 1 << 20 {
        return;
    }

    let opts = CodecOptions {
        order: 1 + (data.len() % 6) as u8,
        mem: 8,
        bootsize: if data.len() % 2 == 0 { 0 } else { 4 },
        adaptsize: (data.len() % 9) as u8,
        count: 0,
    };

    let mut compressed = Vec::new();
    pompom::compress(data, &mut compressed, &opts).expect("compression failed");

    let mut plain = Vec::new();
    pompom::decompress(&compressed[..], &mut plain).expect("decompression failed");
    assert_eq!(plain, data);
});
