use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use minibase::{minimize, parse_query_file};

/// Removes redundant body atoms from a conjunctive query.
#[derive(Debug, StructOpt)]
#[structopt(name = "cq_minimizer")]
struct Opt {
    #[structopt(parse(from_os_str))]
    input_file: PathBuf,

    /// Defaults to stdout
    #[structopt(parse(from_os_str))]
    output_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("minibase=info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let query = parse_query_file(&opt.input_file)?;
    let minimized = minimize(&query)?;

    match &opt.output_file {
        Some(path) => std::fs::write(path, format!("{}\n", minimized))
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => writeln!(io::stdout(), "{}", minimized)?,
    }
    Ok(())
}
