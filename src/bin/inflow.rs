use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use inflow::{
    decompress_stream_with_trailing, BufferPool, DecodeConfig, DecodeStats, DecoderKind, Error,
    ErrorKind, Format, WindowKind, DEFLATE_MAX_DISTANCE,
};
use memmap2::Mmap;

#[derive(Parser, Debug)]
#[command(name = "inflow")]
#[command(about = "Decompress raw DEFLATE, zlib and gzip streams")]
#[command(version)]
struct Args {
    /// Input files (use - for stdin)
    #[arg(default_value = "-")]
    inputs: Vec<PathBuf>,

    /// Output file (default: stdout); outputs are concatenated in input order
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: FormatArg,

    /// Sliding window implementation
    #[arg(short, long, value_enum, default_value = "ring")]
    window: WindowArg,

    /// Huffman symbol decoder
    #[arg(short, long, value_enum, default_value = "table")]
    decoder: DecoderArg,

    /// Window size for raw DEFLATE input
    #[arg(long, default_value_t = DEFLATE_MAX_DISTANCE)]
    raw_window: usize,

    /// Stop after the first gzip member
    #[arg(long)]
    single_member: bool,

    /// Number of threads (0 = auto, 1 = single-threaded)
    #[arg(short = 't', long, default_value = "1")]
    threads: usize,

    /// Write bytes found after the compressed stream to this file
    #[arg(long)]
    trailing: Option<PathBuf>,

    /// Memory-map input files instead of reading them; inputs must not change
    /// while being decoded
    #[arg(long)]
    mmap: bool,

    /// Show verbose statistics
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Auto,
    Raw,
    Zlib,
    Gzip,
}

impl From<FormatArg> for Format {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Auto => Format::Auto,
            FormatArg::Raw => Format::Raw,
            FormatArg::Zlib => Format::Zlib,
            FormatArg::Gzip => Format::Gzip,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum WindowArg {
    Linear,
    Ring,
    BlockChain,
    PooledStrict,
    PooledFast,
}

impl From<WindowArg> for WindowKind {
    fn from(arg: WindowArg) -> Self {
        match arg {
            WindowArg::Linear => WindowKind::Linear,
            WindowArg::Ring => WindowKind::Ring,
            WindowArg::BlockChain => WindowKind::BlockChain,
            WindowArg::PooledStrict => WindowKind::PooledStrict,
            WindowArg::PooledFast => WindowKind::PooledFast,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DecoderArg {
    Trie,
    Packed,
    PackedCodeMajor,
    Table,
    Range,
}

impl From<DecoderArg> for DecoderKind {
    fn from(arg: DecoderArg) -> Self {
        match arg {
            DecoderArg::Trie => DecoderKind::Trie,
            DecoderArg::Packed => DecoderKind::PackedLengthMajor,
            DecoderArg::PackedCodeMajor => DecoderKind::PackedCodeMajor,
            DecoderArg::Table => DecoderKind::Table,
            DecoderArg::Range => DecoderKind::Range,
        }
    }
}

const EXIT_OK: u8 = 0;
const EXIT_DECODE_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run() -> Result<u8, Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.trailing.is_some() && args.inputs.len() > 1 {
        return Err("--trailing takes a single input".into());
    }
    if args.inputs.iter().filter(|p| is_stdin(p)).count() > 1 {
        return Err("stdin can only be read once".into());
    }

    let threads = match args.threads {
        0 => num_cpus::get(),
        n => n,
    }
    .min(args.inputs.len())
    .max(1);

    let window: WindowKind = args.window.into();
    let pool = matches!(window, WindowKind::PooledStrict | WindowKind::PooledFast)
        .then(|| BufferPool::new(DEFLATE_MAX_DISTANCE, threads));

    let config = DecodeConfig {
        format: args.format.into(),
        window,
        decoder: args.decoder.into(),
        max_distance: args.raw_window,
        // Residue is only reachable when the decoder stops after one member
        multi_member: !args.single_member && args.trailing.is_none(),
        pool,
        ..Default::default()
    };

    let mut output: Box<dyn Write> = match &args.output {
        Some(path) if !is_stdin(path) => Box::new(BufWriter::new(File::create(path)?)),
        _ => Box::new(io::stdout().lock()),
    };

    let start = Instant::now();
    let results = if threads == 1 {
        decode_sequential(&args, &config, &mut output)?
    } else {
        decode_parallel(&args, &config, threads, &mut output)?
    };
    output.flush()?;
    let elapsed = start.elapsed();

    let mut code = EXIT_OK;
    for (path, result) in args.inputs.iter().zip(&results) {
        match result {
            Ok(stats) => {
                if args.verbose {
                    report(path, stats, &config, elapsed);
                }
            }
            Err(e) => {
                eprintln!("Error: {}: {}", path.display(), e);
                code = code.max(exit_code(e));
            }
        }
    }
    Ok(code)
}

fn is_stdin(path: &Path) -> bool {
    path.to_str() == Some("-")
}

fn exit_code(error: &Error) -> u8 {
    match error.kind() {
        ErrorKind::Io | ErrorKind::Usage => EXIT_ERROR,
        _ => EXIT_DECODE_FAILED,
    }
}

/// Whole input, memory-mapped for files
enum Input {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for Input {
    fn as_ref(&self) -> &[u8] {
        match self {
            Input::Mapped(map) => map,
            Input::Owned(data) => data,
        }
    }
}

fn open_input(path: &Path, mmap: bool) -> io::Result<Input> {
    if is_stdin(path) {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        return Ok(Input::Owned(data));
    }
    if !mmap {
        return Ok(Input::Owned(std::fs::read(path)?));
    }
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(Input::Owned(Vec::new()));
    }
    // SAFETY: Read-only mapping; --mmap asks the caller to keep the file stable
    let map = unsafe { Mmap::map(&file)? };
    Ok(Input::Mapped(map))
}

fn decode_one<W: Write>(
    path: &Path,
    config: &DecodeConfig,
    trailing: Option<&Path>,
    mmap: bool,
    writer: W,
) -> Result<DecodeStats, Error> {
    let input = open_input(path, mmap)?;
    match trailing {
        Some(trailing_path) => {
            let mut sink = BufWriter::new(File::create(trailing_path)?);
            let stats = decompress_stream_with_trailing(input.as_ref(), writer, &mut sink, config)?;
            sink.flush()?;
            Ok(stats)
        }
        None => decompress_stream_with_trailing(input.as_ref(), writer, io::sink(), config),
    }
}

/// Stream each input to the output in turn
fn decode_sequential(
    args: &Args,
    config: &DecodeConfig,
    output: &mut dyn Write,
) -> io::Result<Vec<Result<DecodeStats, Error>>> {
    Ok(args
        .inputs
        .iter()
        .map(|path| decode_one(path, config, args.trailing.as_deref(), args.mmap, &mut *output))
        .collect())
}

/// Decode inputs on a scoped worker pool, then write outputs in input order
fn decode_parallel(
    args: &Args,
    config: &DecodeConfig,
    threads: usize,
    output: &mut dyn Write,
) -> io::Result<Vec<Result<DecodeStats, Error>>> {
    let next = AtomicUsize::new(0);
    let (tx, rx) = crossbeam::channel::unbounded();

    crossbeam::scope(|s| {
        for _ in 0..threads {
            let tx = tx.clone();
            let next = &next;
            s.spawn(move |_| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(path) = args.inputs.get(index) else {
                    break;
                };
                let mut buf = Vec::new();
                let result = decode_one(path, config, None, args.mmap, &mut buf);
                if tx.send((index, result, buf)).is_err() {
                    break;
                }
            });
        }
    })
    .map_err(|_| io::Error::new(io::ErrorKind::Other, "decode worker panicked"))?;
    drop(tx);

    let mut slots: Vec<Option<(Result<DecodeStats, Error>, Vec<u8>)>> =
        (0..args.inputs.len()).map(|_| None).collect();
    for (index, result, buf) in rx {
        slots[index] = Some((result, buf));
    }

    let mut results = Vec::with_capacity(slots.len());
    for slot in slots {
        let (result, buf) = slot.ok_or_else(|| io::Error::new(io::ErrorKind::Other, "missing result"))?;
        output.write_all(&buf)?;
        results.push(result);
    }
    Ok(results)
}

fn report(path: &Path, stats: &DecodeStats, config: &DecodeConfig, elapsed: Duration) {
    eprintln!("{}:", path.display());
    eprintln!("  Format:           {}", stats.format);
    eprintln!("  Decoder:          {}", config.decoder);
    eprintln!("  Window:           {}", config.window);
    eprintln!("  Input bytes:      {}", stats.input_bytes);
    eprintln!("  Output bytes:     {}", stats.output_bytes);
    eprintln!("  Members:          {}", stats.members);
    eprintln!(
        "  Blocks:           {} (stored {}, fixed {}, dynamic {})",
        stats.blocks.blocks(),
        stats.blocks.stored_blocks,
        stats.blocks.fixed_blocks,
        stats.blocks.dynamic_blocks
    );
    eprintln!("  Trailing bytes:   {}", stats.trailing_bytes);
    eprintln!("  Time:             {:.2?}", elapsed);
    eprintln!(
        "  Throughput:       {:.1} MB/s",
        stats.output_bytes as f64 / elapsed.as_secs_f64() / 1_000_000.0
    );
}
