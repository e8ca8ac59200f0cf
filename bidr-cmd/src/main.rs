mod dump;
mod info;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about the logical records in an F-BIDR data file.
    Info {
        /// Input F-BIDR file
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        /// Stop after this many logical records.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Decode logical records and write each as a line of JSON to stdout.
    Dump {
        /// Input F-BIDR file
        input: PathBuf,

        /// Record layout to decode with.
        ///
        /// logical decodes only the primary header, header also decodes the secondary
        /// header, and image decodes full image data records including image lines.
        #[arg(short, long, default_value = "logical")]
        schema: dump::Schema,

        /// Stop after this many logical records.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Include the absolute byte range of every decoded field.
        #[arg(short, long, action)]
        provenance: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("BIDR_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Info {
            input,
            format,
            limit,
        } => info::info(input, format, *limit),
        Commands::Dump {
            input,
            schema,
            limit,
            provenance,
        } => dump::dump(input, schema, *limit, *provenance),
    }
}
