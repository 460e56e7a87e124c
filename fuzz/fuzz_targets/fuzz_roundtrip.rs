#![no_main]

use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
use flate2::Compression;
use inflow::{decompress, Format};
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Limit data size to avoid slowdowns
    let data = if data.len() > 64 * 1024 { &data[..64 * 1024] } else { data };

    let mut raw = DeflateEncoder::new(Vec::new(), Compression::fast());
    raw.write_all(data).unwrap();
    let raw = raw.finish().unwrap();
    assert_eq!(decompress(&raw, Format::Raw).unwrap(), data, "raw round-trip mismatch");

    let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
    zlib.write_all(data).unwrap();
    let zlib = zlib.finish().unwrap();
    assert_eq!(decompress(&zlib, Format::Zlib).unwrap(), data, "zlib round-trip mismatch");

    let mut gzip = GzEncoder::new(Vec::new(), Compression::best());
    gzip.write_all(data).unwrap();
    let gzip = gzip.finish().unwrap();
    assert_eq!(decompress(&gzip, Format::Auto).unwrap(), data, "gzip round-trip mismatch");
});
