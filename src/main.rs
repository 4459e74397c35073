use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_sprocscan::parser::InputEncoding;
use rust_sprocscan::{run_extract, run_show, ExtractOptions, ShowOptions, DEFAULT_PREVIEW_LINES};

#[derive(Parser)]
#[command(name = "rust-sprocscan")]
#[command(author, version, about = "Extract and classify stored procedures from T-SQL dumps")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every subcommand
#[derive(Args)]
struct InputArgs {
    /// Path to the SQL dump
    #[arg(short, long)]
    input: PathBuf,

    /// Known table names (JSON array, {"tables": [...]}, or one per line)
    #[arg(long)]
    known_tables: Option<PathBuf>,

    /// Caller cross-reference JSON
    #[arg(long)]
    callers: Option<PathBuf>,

    /// TOML file replacing the built-in module rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Input encoding label (auto, utf-16le, utf-8, windows-1252, ...)
    #[arg(long, default_value = "auto")]
    encoding: InputEncoding,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every procedure and write procedures.json plus per-module files
    Extract {
        #[command(flatten)]
        input: InputArgs,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Body lines kept in each preview
        #[arg(long, default_value_t = DEFAULT_PREVIEW_LINES)]
        preview_lines: usize,

        /// Worker threads (defaults to one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Print the classified record(s) for one procedure as JSON
    Show {
        #[command(flatten)]
        input: InputArgs,

        /// Procedure name, optionally schema-qualified
        #[arg(short, long)]
        name: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract {
            input,
            output,
            preview_lines,
            jobs,
        } => {
            let options = ExtractOptions {
                input_path: input.input,
                output_dir: output,
                known_tables_path: input.known_tables,
                callers_path: input.callers,
                rules_path: input.rules,
                encoding: input.encoding,
                preview_lines,
                jobs,
            };

            let written = run_extract(&options)?;
            println!(
                "Wrote {} and {} module files",
                written.catalog.display(),
                written.modules.len()
            );
        }
        Commands::Show { input, name } => {
            let options = ShowOptions {
                input_path: input.input,
                name,
                known_tables_path: input.known_tables,
                callers_path: input.callers,
                rules_path: input.rules,
                encoding: input.encoding,
            };

            println!("{}", run_show(&options)?);
        }
    }

    Ok(())
}
