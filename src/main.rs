use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use framewright_codec::{
    Bitstream, BitstreamDecoder, BitstreamGenerator, BitstreamProfile, DecodeEvent, FrameChain,
};
use framewright_db::{ingest_harness, load_chain, read_address_list, ChipDatabase};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// framewright - configuration frame assembler and bitstream inspector
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a bitstream from a harness and feature assignments
    Assemble {
        /// Database directory (frames.txt, tiles.txt, <TYPE>.bits)
        db: PathBuf,

        /// Region-of-interest frame list
        roi_frames: PathBuf,

        /// Harness bit list (F<frame>W<word>B<bit> lines)
        harness: PathBuf,

        /// Feature assignments (tile.feature lines)
        features: PathBuf,

        /// Output bitstream
        output: PathBuf,

        /// Bitstream profile (TOML)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Also write a .rpt summary next to the output
        #[arg(long)]
        report: bool,
    },

    /// Decode a bitstream into set configuration bits
    Dump {
        /// Bitstream file
        bitstream: PathBuf,

        /// Frame list used to follow multi-frame writes
        #[arg(short, long)]
        frames: Option<PathBuf>,

        /// Interleave '# ' comment lines for packets and integrity checks
        #[arg(short, long)]
        comments: bool,

        /// Print a hex dump instead of decoding
        #[arg(long)]
        hex: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::Assemble {
            db,
            roi_frames,
            harness,
            features,
            output,
            profile,
            report,
        } => {
            let profile = match profile {
                Some(path) => BitstreamProfile::from_path(&path)
                    .with_context(|| format!("Failed to load profile {:?}", path))?,
                None => BitstreamProfile::default(),
            };
            let inputs = AssembleInputs {
                db: &db,
                roi_frames: &roi_frames,
                harness: &harness,
                features: &features,
            };
            let bitstream = assemble(&inputs, profile)?;
            let written = if report {
                bitstream.write_with_report(&output)
            } else {
                bitstream.write_to_file(&output)
            };
            written.with_context(|| format!("Failed to write {:?}", output))?;
            info!("Wrote {} bytes to {:?}", bitstream.data.len(), output);
        }

        Commands::Dump {
            bitstream,
            frames,
            comments,
            hex,
        } => {
            dump(&bitstream, frames.as_deref(), comments, hex)?;
        }
    }

    Ok(())
}

struct AssembleInputs<'a> {
    db: &'a Path,
    roi_frames: &'a Path,
    harness: &'a Path,
    features: &'a Path,
}

fn assemble(inputs: &AssembleInputs, profile: BitstreamProfile) -> Result<Bitstream> {
    let mut db = ChipDatabase::open(inputs.db)
        .with_context(|| format!("Failed to open database {:?}", inputs.db))?;
    let (mut store, chain) = db.base_frames();

    let roi = read_address_list(inputs.roi_frames)?;
    store.reset_frames(roi.iter().copied());

    let harness = fs::read_to_string(inputs.harness)
        .with_context(|| format!("Failed to read harness {:?}", inputs.harness))?;
    ingest_harness(&mut store, &harness, &roi)
        .with_context(|| format!("Invalid harness {:?}", inputs.harness))?;

    let features = fs::read_to_string(inputs.features)
        .with_context(|| format!("Failed to read features {:?}", inputs.features))?;
    let count = db
        .apply_features(&mut store, &features)
        .with_context(|| format!("Failed to apply features from {:?}", inputs.features))?;
    info!("Applied {} features to {} frames", count, store.len());

    let bitstream = BitstreamGenerator::new(profile).generate(&store, &chain)?;
    bitstream.verify()?;
    Ok(bitstream)
}

fn dump(path: &Path, frames: Option<&Path>, comments: bool, hex: bool) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if hex {
        let mut bitstream = Bitstream::new(path.display().to_string());
        bitstream.data = data;
        write!(out, "{}", bitstream.to_hex_dump())?;
        out.flush()?;
        return Ok(());
    }

    let chain = match frames {
        Some(frames) => {
            load_chain(frames).with_context(|| format!("Failed to load frames {:?}", frames))?
        }
        None => FrameChain::new(),
    };

    let report = BitstreamDecoder::new(&chain)
        .decode(&data)
        .with_context(|| format!("Failed to decode {:?}", path))?;

    for event in &report.events {
        match event {
            DecodeEvent::Bit(addr) => writeln!(out, "{}", addr)?,
            DecodeEvent::Diagnostic(diag) if comments => writeln!(out, "# {}", diag)?,
            DecodeEvent::Diagnostic(_) => {}
        }
    }
    out.flush()?;
    Ok(())
}
