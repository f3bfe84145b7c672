mod error;
mod generator;
mod output;
mod parser;
mod region;
mod render;
mod schema;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};

use types::TypeConfig;

/// Generate Sequelize TypeScript models from a MySQL schema file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// SQL file with the CREATE TABLE statements
    db: PathBuf,

    /// Directory the models are written to, created if missing
    output: PathBuf,

    /// Type DECIMAL attributes as `number` instead of `string`
    #[arg(long)]
    decimal_as_number: bool,

    /// Log more, repeat for debug output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<ExitCode> {
    let sql = std::fs::read_to_string(&args.db)
        .with_context(|| format!("reading {}", args.db.display()))?;
    output::create_dir(&args.output)?;

    let raw = match parser::parse_schema(&sql) {
        Ok(raw) => raw,
        Err(err) => {
            println!("{}", err.diagnostic());
            return Ok(ExitCode::from(1));
        }
    };

    let config = TypeConfig {
        decimal_as_string: !args.decimal_as_number,
    };
    let tables = schema::normalize_tables(&raw, &config).context("mapping column types")?;
    let summary = generator::generate(&tables, &args.output)
        .with_context(|| format!("writing models to {}", args.output.display()))?;
    info!(
        tables = tables.len(),
        created = summary.created,
        updated = summary.updated,
        unchanged = summary.unchanged,
        "done"
    );

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(args.verbose);
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}
