//! Command-line interface components.

use crate::config::ReaderConfig;
use crate::constants::DEFAULT_SEPARATORS;
use crate::reader::AsciiReader;
use crate::schema::{PointType, Schema};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "ascii-cloud")]
#[command(about = "Parse delimiter-separated point records into packed binary rows")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Increase logging verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count records and report row geometry without converting them
    Probe(ReadArgs),

    /// Convert every record and write the packed rows to a file
    Convert {
        #[command(flatten)]
        read: ReadArgs,

        /// Destination for the packed little-endian row bytes
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Options shared by every command that reads a file
#[derive(clap::Args, Debug)]
pub struct ReadArgs {
    /// ASCII point file to read
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Field layout, e.g. "x:f32,y:f32,z:f32,rgb:u8x3"
    #[arg(long, conflicts_with = "point_type")]
    pub fields: Option<String>,

    /// Built-in layout (xyz, xyzi, xyzrgba, xyzl, normal, xyznormal, pointuv)
    #[arg(long)]
    pub point_type: Option<String>,

    /// Separator characters
    #[arg(long, default_value = DEFAULT_SEPARATORS)]
    pub sep: String,

    /// Byte offset of the text payload (e.g. 513 inside a TAR entry)
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Required file extension, including the dot
    #[arg(long)]
    pub ext: Option<String>,
}

impl ReadArgs {
    /// Reader configuration described by these options
    pub fn config(&self) -> ReaderConfig {
        let config = ReaderConfig::default()
            .with_separators(self.sep.clone())
            .with_offset(self.offset);
        match &self.ext {
            Some(ext) => config.with_required_extension(ext.clone()),
            None => config,
        }
    }

    /// Schema from --fields or --point-type, defaulting to xyz
    pub fn schema(&self) -> Result<Schema> {
        if let Some(spec) = &self.fields {
            return Schema::parse_spec(spec).context("Invalid --fields layout");
        }
        let point_type = match &self.point_type {
            Some(name) => name.parse::<PointType>().context("Invalid --point-type")?,
            None => PointType::Xyz,
        };
        Ok(point_type.schema().clone())
    }

    /// Build a configured reader and the payload offset to read at
    pub fn reader(&self) -> Result<(AsciiReader, u64)> {
        let config = self.config();
        let mut reader = AsciiReader::with_config(&config).context("Invalid reader options")?;
        reader.set_schema(self.schema()?);
        debug!("Reader configured: {:?}", reader);
        Ok((reader, config.offset))
    }
}

/// Set up tracing output on stderr
pub fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let level = log_level(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ascii_cloud={}", level)));

    // Exactly one of these is present.
    let compact = quiet.then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
    });
    let timed = (!quiet).then(|| {
        fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::uptime())
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(compact)
        .with(timed)
        .init();

    debug!("Logging initialized at level: {}", level);
}

/// Log level selected by the `-v`/`-q` flags; `-q` wins
fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Execute the parsed command
pub fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Probe(read) => probe(read),
        Command::Convert { read, output } => convert(read, output),
    }
}

fn probe(read: &ReadArgs) -> Result<()> {
    let (reader, offset) = read.reader()?;
    let header = reader
        .read_header(&read.file, offset)
        .with_context(|| format!("Failed to probe {}", read.file.display()))?;

    println!("{}", read.file.display().to_string().bright_green().bold());
    println!(
        "  {} {}",
        "Points:".bright_cyan(),
        header.point_count.to_string().bright_white().bold()
    );
    println!("  {} {} bytes", "Row stride:".bright_cyan(), header.row_stride);
    println!("  {} {}", "Fields:".bright_cyan(), reader.schema());
    println!("  {} {}", "Version:".bright_cyan(), header.version);
    println!("  {} {}", "Data offset:".bright_cyan(), header.data_offset);
    Ok(())
}

fn convert(read: &ReadArgs, output: &Path) -> Result<()> {
    let (reader, offset) = read.reader()?;
    let cloud = reader
        .read(&read.file, offset)
        .with_context(|| format!("Failed to read {}", read.file.display()))?;

    std::fs::write(output, &cloud.data)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "  {} {} points ({} bytes, stride {}) to {}",
        "Wrote".bright_green(),
        cloud.width.to_string().bright_white().bold(),
        cloud.total_bytes(),
        cloud.row_stride,
        output.display()
    );
    if !cloud.is_dense {
        println!("  {}", "Cloud contains non-finite values".bright_yellow());
    }
    Ok(())
}
