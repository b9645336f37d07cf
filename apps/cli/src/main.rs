use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scd_core::{DecodeSession, DecoderConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "Smart card probe trace and log decoder", long_about = None)]
struct Args {
    /// Decoder configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump BER-TLV data given as hex
    Tlv {
        /// Hex-encoded TLV object
        hex: String,

        /// Show only the node with this tag (searched at any depth)
        #[arg(long, conflicts_with = "path")]
        find: Option<String>,

        /// Show only the node at this tag path, e.g. A5/5F2D
        #[arg(long)]
        path: Option<String>,
    },
    /// Report the transactions of a trace (Intel-Hex or plain hex)
    Trace {
        /// Trace file
        file: PathBuf,
    },
    /// Report the event log of an EEPROM dump (Intel-Hex)
    Log {
        /// EEPROM dump file
        file: PathBuf,

        /// Print payloads without decoding them
        #[arg(long)]
        raw: bool,
    },
}

fn read_input(path: &PathBuf) -> Result<String> {
    info!(path = %path.display(), "Reading input");
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => DecoderConfig::load_from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => DecoderConfig::default(),
    };

    let output = match args.command {
        Command::Tlv { hex, find, path } => {
            let session = DecodeSession::new(config);
            if let Some(tag) = find {
                session
                    .find_tlv(&hex, &tag)?
                    .unwrap_or_else(|| format!("Tag {} not found", tag))
            } else if let Some(path) = path {
                session
                    .lookup_tlv(&hex, &path)?
                    .unwrap_or_else(|| format!("Path {} not found", path))
            } else {
                session.decode_tlv(&hex)?
            }
        }
        Command::Trace { file } => {
            let text = read_input(&file)?;
            DecodeSession::new(config).decode_trace(&text)?
        }
        Command::Log { file, raw } => {
            let text = read_input(&file)?;
            DecodeSession::new(config)
                .with_raw_log(raw)
                .decode_log(&text)?
        }
    };

    println!("{}", output.trim_end());
    Ok(())
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
