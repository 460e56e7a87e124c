#![no_main]

use inflow::{decompress_stream, DecodeConfig, DecoderKind, Format, WindowKind};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the strategies; arbitrary input must only ever error
    let Some((&selector, input)) = data.split_first() else {
        return;
    };
    let decoder = DecoderKind::ALL[selector as usize % DecoderKind::ALL.len()];
    let window = WindowKind::ALL[(selector as usize / 8) % WindowKind::ALL.len()];

    for format in [Format::Raw, Format::Zlib, Format::Gzip, Format::Auto] {
        let config = DecodeConfig { format, decoder, window, ..Default::default() };
        let mut output = Vec::new();
        let _ = decompress_stream(input, &mut output, &config);
    }
});
