//! streamarc CLI - forward-only archive reader
//!
//! Lists, extracts and verifies TAR archives (plain, gzip, bzip2, lzip or xz)
//! from files or standard input without ever seeking.

mod commands;
mod utils;

use clap::{ArgAction, Parser, Subcommand};
use commands::{ExtractOptions, ListOptions, cmd_detect, cmd_extract, cmd_list, cmd_test};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "streamarc")]
#[command(author, version, about = "Forward-only archive reader for pipes and files")]
#[command(long_about = "
streamarc reads TAR archives front to back, detecting the compression
envelope (gzip, bzip2, lzip, xz) from the first bytes of the stream.
Use '-' as the archive path to read from standard input.

Examples:
  streamarc list backup.tar.gz
  curl -s https://example.com/src.tar.xz | streamarc list -
  streamarc extract backup.tar.bz2 -o restore/
  streamarc extract release.tar.lz -I '*.md'
  streamarc test backup.tar.gz
  streamarc detect mystery.bin
")]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list ('-' for stdin)
        archive: PathBuf,

        /// Show type, permissions, size and modification time
        #[arg(short, long)]
        long: bool,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,
    },

    /// Extract entries from an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract ('-' for stdin)
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Entries to extract (all if empty)
        files: Vec<String>,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        /// Hide the progress spinner
        #[arg(long)]
        no_progress: bool,
    },

    /// Read every payload to verify the archive
    #[command(alias = "t")]
    Test {
        /// Archive file to test ('-' for stdin)
        archive: PathBuf,
    },

    /// Detect the compression envelope and container
    Detect {
        /// File to detect
        file: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let verbose = cli.verbose > 0;

    let result = match cli.command {
        Commands::List {
            archive,
            long,
            json,
            include,
            exclude,
        } => cmd_list(
            &archive,
            &ListOptions {
                long,
                json,
                include: &include,
                exclude: &exclude,
            },
        ),
        Commands::Extract {
            archive,
            output,
            files,
            include,
            exclude,
            no_progress,
        } => cmd_extract(
            &archive,
            &ExtractOptions {
                output: &output,
                files: &files,
                include: &include,
                exclude: &exclude,
                verbose,
                progress: !no_progress,
            },
        ),
        Commands::Test { archive } => cmd_test(&archive, verbose),
        Commands::Detect { file } => cmd_detect(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract_arguments() {
        let cli = Cli::parse_from([
            "streamarc", "-v", "extract", "-", "-o", "out", "-I", "*.txt", "--no-progress",
        ]);
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Extract {
                archive,
                output,
                include,
                no_progress,
                ..
            } => {
                assert_eq!(archive, PathBuf::from("-"));
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(include, ["*.txt"]);
                assert!(no_progress);
            }
            _ => panic!("expected extract"),
        }
    }
}
