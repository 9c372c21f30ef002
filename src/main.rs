use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rustyline::{error::ReadlineError, Editor};
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use minibase::{parse_query, parse_query_file, Catalog, QueryPlanner};

/// Evaluates conjunctive queries over a directory of CSV relations.
#[derive(Debug, StructOpt)]
#[structopt(name = "minibase")]
struct Opt {
    /// Directory holding schema.txt and files/<relation>.csv
    #[structopt(parse(from_os_str))]
    database_dir: PathBuf,

    /// File with one query; starts an interactive prompt when omitted
    #[structopt(parse(from_os_str))]
    input_file: Option<PathBuf>,

    /// Where to write results; defaults to stdout
    #[structopt(parse(from_os_str))]
    output_file: Option<PathBuf>,

    /// Enable debug logging
    #[structopt(short, long)]
    verbose: bool,

    /// Print the operator tree before the results
    #[structopt(long)]
    explain: bool,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("minibase=debug")
        } else {
            EnvFilter::new("minibase=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn evaluate<W: Write>(
    planner: &QueryPlanner,
    code: &str,
    explain: bool,
    out: &mut W,
) -> Result<usize> {
    let query = parse_query(code)?;
    let mut root = planner.plan(&query)?;
    if explain {
        write!(out, "{}", root.explain())?;
    }
    Ok(root.dump(out)?)
}

fn run_file(planner: &QueryPlanner, opt: &Opt, input_file: &Path) -> Result<()> {
    let query = parse_query_file(input_file)?;
    let mut root = planner.plan(&query)?;
    if opt.explain {
        eprint!("{}", root.explain());
    }

    let count = match &opt.output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            root.dump(&mut BufWriter::new(file))?
        }
        None => root.dump(&mut io::stdout().lock())?,
    };
    info!(tuples = count, query = %query, "query evaluated");
    Ok(())
}

fn run_repl(planner: &QueryPlanner, explain: bool) -> Result<()> {
    let mut editor = Editor::<()>::new();

    loop {
        let readline = editor.readline("> ");
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str());

                let stdout = io::stdout();
                if let Err(e) = evaluate(planner, &line, explain, &mut stdout.lock()) {
                    println!("Error: {:#}", e);
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {}", err);
                break;
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    init_logging(opt.verbose);

    let catalog = Catalog::load(&opt.database_dir)?;
    let planner = QueryPlanner::new(&catalog);

    match &opt.input_file {
        Some(input_file) => run_file(&planner, &opt, input_file),
        None => run_repl(&planner, opt.explain),
    }
}
