use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(target_env = "msvc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use annograph_cli::bed::BedOptions;
use annograph_cli::{bed, gff3, select, sketch, validate};
use annograph_cli::{Gff3Options, SelectOptions, SketchOptions, ValidateOptions};

#[derive(Parser, Debug)]
#[command(
    name = "annograph",
    about = "annograph: parse, transform and lay out annotated genome features",
    version
)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "annograph=trace"
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse, possibly transform, and output GFF3
    Gff3(Gff3Options),
    /// Convert BED input to GFF3
    BedToGff3(BedOptions),
    /// Keep only features matching the given conditions
    Select(SelectOptions),
    /// Compute a diagram layout and report its tracks
    Sketch(SketchOptions),
    /// Parse files and report problems, optionally in parallel
    Validate(ValidateOptions),
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    match &cli.command {
        Command::Gff3(opts) => gff3::run(opts)?,
        Command::BedToGff3(opts) => bed::run(opts)?,
        Command::Select(opts) => select::run(opts)?,
        Command::Sketch(opts) => {
            let out = gff3::open_output(None)?;
            sketch::run(opts, out)?;
        }
        Command::Validate(opts) => {
            let reports = validate::run(opts)?;
            let mut failed = 0usize;
            for report in &reports {
                if report.ok {
                    println!("{}: ok ({} nodes)", report.file, report.nodes);
                } else {
                    failed += 1;
                    println!(
                        "{}: error: {}",
                        report.file,
                        report.error.as_deref().unwrap_or("unknown")
                    );
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} files failed validation", failed, reports.len());
            }
        }
    }
    Ok(())
}
