//! wiredog - Decode schema-less Protocol Buffer messages
//!
//! Reads message payloads from a file, a directory of files, or stdin,
//! unwraps the input encoding (raw, hex, or base64), and prints each
//! message as readable nested text keyed by field number.

use anyhow::{Context, Result};
use clap::{Args, Parser, ValueEnum};
use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;
use wiredog_core::{Codec, CodecRegistry, DecoderConfig, ProtobufCodec};

/// Decode schema-less Protocol Buffer messages
#[derive(Parser, Debug)]
#[command(name = "wiredog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Encoding of the input payloads
    #[arg(short, long, value_enum, default_value = "raw")]
    format: InputFormat,

    /// Maximum number of messages to process (0 = unlimited)
    #[arg(short = 'c', long, default_value = "0")]
    max_messages: usize,

    /// Maximum message nesting depth before a decode fails
    #[arg(long, default_value = "100")]
    max_depth: usize,

    /// Payload bytes shown in opaque hex previews
    #[arg(long, default_value = "20")]
    preview_bytes: usize,

    /// Skip payloads byte-identical to one already processed
    #[arg(long)]
    dedupe: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
#[group(required = false, multiple = false)]
struct InputMode {
    /// Path to a file of message payloads (stdin when omitted)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Path to a directory of payload files to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// How the input bytes are encoded
#[derive(Debug, Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Payloads are raw bytes, one message per file or stream
    Raw,
    /// Hexadecimal text, one message per line
    Hex,
    /// Base64 text, one message per line
    Base64,
}

impl InputFormat {
    fn codec_name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Hex => "hex",
            Self::Base64 => "base64",
        }
    }

    /// Text encodings carry one message per line; raw input is a single
    /// message per source
    fn line_delimited(self) -> bool {
        !matches!(self, Self::Raw)
    }
}

#[derive(Default)]
struct SessionStats {
    decoded: usize,
    failed: usize,
    skipped: usize,
}

/// Decoding session: owns the codecs, the dedupe set, and the counters
struct Session {
    input_codec: Box<dyn Codec>,
    output_codec: Box<dyn Codec>,
    line_delimited: bool,
    dedupe: bool,
    max_messages: usize,
    seen: HashSet<blake3::Hash>,
    stats: SessionStats,
}

impl Session {
    fn new(
        input_codec: Box<dyn Codec>,
        output_codec: Box<dyn Codec>,
        line_delimited: bool,
        dedupe: bool,
        max_messages: usize,
    ) -> Self {
        Self {
            input_codec,
            output_codec,
            line_delimited,
            dedupe,
            max_messages,
            seen: HashSet::new(),
            stats: SessionStats::default(),
        }
    }

    fn limit_reached(&self) -> bool {
        self.max_messages > 0 && self.stats.decoded + self.stats.failed >= self.max_messages
    }

    /// Feed one input source (a file or the whole stdin stream) into the
    /// session, splitting it into messages according to the input format
    fn process_source(&mut self, label: &str, data: &[u8]) {
        if self.line_delimited {
            for line in data.split(|&b| b == b'\n') {
                if self.limit_reached() {
                    return;
                }
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                self.handle_message(label, line);
            }
        } else if !self.limit_reached() {
            self.handle_message(label, data);
        }
    }

    /// Decode one message and write its text block to stdout. Failures
    /// produce one line on stderr and processing continues.
    fn handle_message(&mut self, label: &str, encoded: &[u8]) {
        let raw = match self.input_codec.decode(encoded) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("{label}: {e}");
                self.stats.failed += 1;
                return;
            }
        };

        if self.dedupe {
            let hash = blake3::hash(&raw);
            if !self.seen.insert(hash) {
                trace!("skipping duplicate payload ({} bytes)", raw.len());
                self.stats.skipped += 1;
                return;
            }
        }

        match self.output_codec.encode(&raw) {
            Ok(text) => {
                println!("{}", String::from_utf8_lossy(&text));
                self.stats.decoded += 1;
            }
            Err(e) => {
                eprintln!("{label}: {e}");
                self.stats.failed += 1;
            }
        }
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} decoded, {} failed, {} duplicates skipped",
            self.stats.decoded, self.stats.failed, self.stats.skipped
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = DecoderConfig::new()
        .max_depth(cli.max_depth)
        .preview_bytes(cli.preview_bytes);

    let mut registry = CodecRegistry::with_builtins();
    {
        let config = config.clone();
        registry.register("protobuf", move || {
            Box::new(ProtobufCodec::with_config(config.clone()))
        });
    }

    let input_codec = registry
        .get(cli.format.codec_name())
        .context("failed to create input codec")?;
    let output_codec = registry
        .get("protobuf")
        .context("failed to create output codec")?;

    let mut session = Session::new(
        input_codec,
        output_codec,
        cli.format.line_delimited(),
        cli.dedupe,
        cli.max_messages,
    );

    if let Some(ref file) = cli.input.file {
        process_file(&mut session, file)?;
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&mut session, directory)?;
    } else {
        process_stdin(&mut session)?;
    }

    session.print_summary();
    Ok(())
}

/// Process a single payload file
fn process_file(session: &mut Session, file: &Path) -> Result<()> {
    trace!("Reading {}", file.display());
    let data = fs::read(file)
        .with_context(|| format!("Failed to read input file: {}", file.display()))?;

    debug!("Read {} bytes from {}", data.len(), file.display());
    session.process_source(&file.display().to_string(), &data);
    Ok(())
}

/// Process a directory of payload files recursively
fn process_directory(session: &mut Session, directory: &Path) -> Result<()> {
    if !directory.is_dir() {
        anyhow::bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());
    let mut files_processed = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || is_hidden(path) {
            continue;
        }
        if session.limit_reached() {
            break;
        }

        debug!("Processing {}", path.display());
        if let Err(e) = process_file(session, path) {
            // Log error but continue with other files
            warn!("Error processing {}: {}", path.display(), e);
        }
        files_processed += 1;
    }

    info!("Processed {} files", files_processed);
    Ok(())
}

/// Process message payloads from stdin
fn process_stdin(session: &mut Session) -> Result<()> {
    let mut data = Vec::new();
    std::io::stdin()
        .lock()
        .read_to_end(&mut data)
        .context("Failed to read from stdin")?;

    debug!("Read {} bytes from stdin", data.len());
    session.process_source("stdin", &data);
    Ok(())
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
