use std::{io, path::PathBuf, process};

use clap::{ArgAction, Parser};
use log::{info, LevelFilter};
use thiserror::Error;

use static_stack_lib as ss;
use ss::input::{Disassembly, InputError};
use ss::output::{DotConf, TableConf};
use ss::{AnalyzeError, Limit, Max, OutputFormat, SortKey, Target};

#[derive(Parser)]
#[command(name = "static-stack")]
#[command(about = "Estimate the worst-case stack usage of every function in a MIPS binary")]
#[command(long_about = "Estimate the worst-case stack usage of every function in a MIPS binary.

The report is a markdown table:
  Name:           the function's label in the binary
  Own:            stack bytes the function allocates itself
  Deepest:        own bytes plus the deepest call tree below it
  Indirect Calls: `*` when the function calls through pointers; Deepest is then a lower bound

Recursion is not followed around the cycle, so Deepest under-estimates recursive functions.")]
#[command(version)]
struct Cli {
    /// ELF file to disassemble, or a saved `objdump -d` listing with --listing (`-` for stdin)
    input: PathBuf,

    /// Sort rows by deepest (d) or own (o) stack usage
    #[arg(short, long, default_value = "deepest")]
    sort: SortKey,

    /// Number of rows to print, -1 or `all` for every function
    #[arg(short = 'n', long, default_value = "10", allow_hyphen_values = true)]
    count: Limit,

    /// Instruction set of the binary (mips32, mips64)
    #[arg(long, default_value = "mips32")]
    target: Target,

    /// Only sections whose name starts with this are analyzed
    #[arg(long, default_value = ".text")]
    section: String,

    /// Demangle Rust symbol names in the report
    #[arg(long)]
    demangle: bool,

    /// Report format (table, dot)
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,

    /// Treat the input as an already disassembled listing
    #[arg(long)]
    listing: bool,

    /// Disassembler to run on the input
    #[arg(long, default_value = "objdump")]
    objdump: String,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}


#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Analyze(#[from] AnalyzeError),

    #[error("failed to write the report: {0}")]
    Output(#[from] io::Error),
}


fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut disassembly = if cli.listing {
        Disassembly::open_listing(&cli.input)?
    } else {
        Disassembly::spawn(&cli.objdump, &cli.input)?
    };

    let mut s = ss::State::empty(cli.target);
    s.section_prefix = cli.section.clone();
    s.load_listing(disassembly.reader())?;
    disassembly.finish()?;

    s.resolve_depths();
    s.find_cycles();

    match s.worst_case() {
        Some(Max::Exact(n)) => info!("worst case over all functions: {} bytes", n),
        Some(Max::LowerBound(n)) => info!("worst case over all functions: at least {} bytes", n),
        None => {}
    }

    let stdout = io::stdout().lock();
    match cli.format {
        OutputFormat::Table => {
            let conf = TableConf {
                sort: cli.sort,
                limit: cli.count,
                demangle: cli.demangle,
            };
            s.output_table(stdout, &conf)?;
        }
        OutputFormat::Dot => {
            let conf = DotConf {
                demangle: cli.demangle,
                ..DotConf::default()
            };
            s.output_dot(stdout, conf)?;
        }
    }

    Ok(())
}
