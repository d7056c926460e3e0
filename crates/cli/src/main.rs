//! xref-meta
//!
//! Inspect the cross-reference metadata a file carries, or wrap a metadata
//! JSON file into a comment header that indexers will pick up.
//!
//! ## Usage
//!
//! ```text
//! xref-meta inspect gen/foo.pb.h
//! xref-meta inspect src/foo.cc --search-string xref-metadata
//! xref-meta encode foo.meta --block > foo.meta.h
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "xref-meta", version, about = "Embedded cross-reference metadata tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the rules a file carries as JSON
    Inspect {
        file: PathBuf,
        /// Token that follows `// ` or `/* ` ahead of the encoded block
        #[arg(long, default_value = "")]
        search_string: String,
        /// TOML file with header suffixes and a default search string
        #[arg(long)]
        config: Option<PathBuf>,
        /// Resolve `source_path` references to this corpus
        #[arg(long)]
        corpus: Option<String>,
    },
    /// Wrap a metadata JSON file as a base64 comment header
    Encode {
        file: PathBuf,
        /// Emit a multi-line `/* */` block instead of a single `//` line
        #[arg(long)]
        block: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();
    let found = match cli.command {
        Command::Inspect {
            file,
            search_string,
            config,
            corpus,
        } => commands::inspect(&file, &search_string, config.as_deref(), corpus)?,
        Command::Encode { file, block } => {
            commands::encode(&file, block)?;
            true
        }
    };

    if !found {
        std::process::exit(1);
    }
    Ok(())
}
