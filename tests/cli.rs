//! Tests for the `inflow` command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;

fn inflow() -> Command {
    Command::new(env!("CARGO_BIN_EXE_inflow"))
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn text(lines: usize) -> Vec<u8> {
    (0..lines).flat_map(|i| format!("line {} of the test input\n", i % 97).into_bytes()).collect()
}

fn write_file(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn run_with_stdin(args: &[&str], input: &[u8]) -> Output {
    let mut child = inflow()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run CLI");
    child.stdin.take().unwrap().write_all(input).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn test_cli_decodes_file_to_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let data = text(2_000);
    let path = write_file(dir.path(), "input.gz", &gzip(&data));

    let output = inflow().arg(&path).output().expect("Failed to run CLI");
    assert!(output.status.success());
    assert_eq!(output.stdout, data);
}

#[test]
fn test_cli_stdin_and_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = text(500);
    let out_path = dir.path().join("out.txt");

    let output = run_with_stdin(&["-o", out_path.to_str().unwrap(), "-"], &zlib(&data));
    assert!(output.status.success());
    assert_eq!(std::fs::read(&out_path).unwrap(), data);
}

#[test]
fn test_cli_every_window_and_decoder() {
    let dir = tempfile::tempdir().unwrap();
    let data = text(3_000);
    let path = write_file(dir.path(), "input.gz", &gzip(&data));

    for window in ["linear", "ring", "block-chain", "pooled-strict", "pooled-fast"] {
        for decoder in ["trie", "packed", "packed-code-major", "table", "range"] {
            let output = inflow()
                .args(["--window", window, "--decoder", decoder])
                .arg(&path)
                .output()
                .expect("Failed to run CLI");
            assert!(output.status.success(), "{} / {}", window, decoder);
            assert_eq!(output.stdout, data, "{} / {}", window, decoder);
        }
    }
}

#[test]
fn test_cli_parallel_keeps_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    let mut expected = Vec::new();
    for i in 0..6 {
        let data = text(100 * (i + 1));
        paths.push(write_file(dir.path(), &format!("part{}.gz", i), &gzip(&data)));
        expected.extend(data);
    }

    for threads in ["1", "3", "0"] {
        let output =
            inflow().args(["-t", threads]).args(&paths).output().expect("Failed to run CLI");
        assert!(output.status.success(), "threads {}", threads);
        assert_eq!(output.stdout, expected, "threads {}", threads);
    }
}

#[test]
fn test_cli_trailing_file() {
    let dir = tempfile::tempdir().unwrap();
    let data = text(200);
    let mut input = gzip(&data);
    input.extend_from_slice(b"appended secret");
    let path = write_file(dir.path(), "input.gz", &input);
    let trailing = dir.path().join("trailing.bin");

    let output = inflow()
        .arg("--trailing")
        .arg(&trailing)
        .arg("--verbose")
        .arg(&path)
        .output()
        .expect("Failed to run CLI");
    assert!(output.status.success());
    assert_eq!(output.stdout, data);
    assert_eq!(std::fs::read(&trailing).unwrap(), b"appended secret");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Trailing bytes:   15"), "{}", stderr);
}

#[test]
fn test_cli_corrupt_input_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = gzip(&text(100));
    let len = input.len();
    input[len - 5] ^= 0x10;
    let path = write_file(dir.path(), "corrupt.gz", &input);

    let output = inflow().arg(&path).output().expect("Failed to run CLI");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("CRC32 mismatch"));
}

#[test]
fn test_cli_missing_file_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = inflow().arg(dir.path().join("absent.gz")).output().expect("Failed to run CLI");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_raw_format() {
    let output = run_with_stdin(
        &["--format", "raw"],
        &[0x01, 0x05, 0x00, 0xFA, 0xFF, 0x68, 0x65, 0x6C, 0x6C, 0x6F],
    );
    assert!(output.status.success());
    assert_eq!(output.stdout, b"hello");
}

#[test]
fn test_cli_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "empty.gz", &[]);
    let output = inflow().arg(&path).output().expect("Failed to run CLI");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_cli_mmap_matches_buffered_read() {
    let dir = tempfile::tempdir().unwrap();
    let data = text(3_000);
    let gz = write_file(dir.path(), "input.gz", &gzip(&data));
    let zz = write_file(dir.path(), "input.zz", &zlib(&data));

    for path in [&gz, &zz] {
        let mapped = inflow().arg("--mmap").arg(path).output().expect("Failed to run CLI");
        assert!(mapped.status.success());
        assert_eq!(mapped.stdout, data);

        let buffered = inflow().arg(path).output().expect("Failed to run CLI");
        assert_eq!(buffered.stdout, mapped.stdout);
    }

    let empty = write_file(dir.path(), "empty.gz", &[]);
    let output = inflow().arg("--mmap").arg(&empty).output().expect("Failed to run CLI");
    assert_eq!(output.status.code(), Some(1));
}
