mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use nimbus_rs::design::load_design;
use nimbus_rs::fastq::PairedReader;
use nimbus_rs::{AmpliconAligner, AmpliconIndex, Manager, SamHeader};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if args.quiet {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new("info")
            }
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let aligner_config = args.aligner_config();
    let design = load_design(&args.design, &args.fasta)?;
    let total_bases = design.total_bases();
    let header = SamHeader::new(design.references.clone());

    let mut index = AmpliconIndex::new();
    for amplicon in design.amplicons {
        index.add(amplicon);
    }
    let indexed = index.build(aligner_config.seed_length);
    tracing::info!(
        amplicons = indexed,
        bases = total_bases,
        seed_length = aligner_config.seed_length,
        "amplicon index ready"
    );

    let reads = PairedReader::open(&args.forward, &args.reverse)?;
    let aligner = AmpliconAligner::new(&index, &aligner_config);
    let manager = Manager::new(&aligner, args.pipeline_config())?;

    let sink: Box<dyn Write + Send> = if args.output.as_os_str() == "-" {
        Box::new(std::io::stdout())
    } else {
        Box::new(
            File::create(&args.output)
                .with_context(|| format!("failed to create {}", args.output.display()))?,
        )
    };
    let mut out = BufWriter::new(sink);
    write!(out, "{header}").context("failed to write SAM header")?;

    let stats = manager.run(reads, &mut out)?;
    out.flush().context("failed to flush SAM output")?;

    tracing::info!(
        read_pairs = stats.read_pairs,
        written_pairs = stats.written_pairs,
        mapped_records = stats.mapped_records,
        unmapped_records = stats.unmapped_records,
        "nimbus-rs: processing complete"
    );
    Ok(())
}
