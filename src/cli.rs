use nimbus_rs::{AlignerConfig, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "nimbus-rs",
    about = "Align paired-end amplicon reads against a target design",
    version
)]
pub struct Args {
    /// Forward reads (FASTQ, optionally gzipped)
    #[arg(short = '1', long = "forward", value_name = "FASTQ")]
    pub forward: PathBuf,

    /// Reverse reads (FASTQ, optionally gzipped)
    #[arg(short = '2', long = "reverse", value_name = "FASTQ")]
    pub reverse: PathBuf,

    /// Amplicon design
    #[arg(short = 'd', long = "design", value_name = "BED")]
    pub design: PathBuf,

    /// Reference sequences the design refers to
    #[arg(short = 'f', long = "fasta", value_name = "FASTA")]
    pub fasta: PathBuf,

    /// Output SAM path, `-` for stdout
    #[arg(short = 'o', long = "output", value_name = "SAM")]
    pub output: PathBuf,

    /// Skip read pairs matching this many amplicons or more
    #[arg(short = 'x', long = "maximum-amplicons", default_value_t = 6000)]
    pub max_amplicons: usize,

    /// Seed length used to index the amplicons
    #[arg(short = 'k', long = "key-size", default_value_t = 7)]
    pub key_size: usize,

    /// Match score
    #[arg(short = 'm', long = "match", default_value_t = 2, allow_negative_numbers = true)]
    pub match_score: i32,

    /// Mismatch score
    #[arg(short = 'n', long = "mismatch", default_value_t = -1, allow_negative_numbers = true)]
    pub mismatch: i32,

    /// Gap extension score
    #[arg(short = 'e', long = "gap-extend", default_value_t = -1, allow_negative_numbers = true)]
    pub gap_extend: i32,

    /// Gap opening score
    #[arg(short = 'g', long = "gap-open", default_value_t = -1, allow_negative_numbers = true)]
    pub gap_open: i32,

    /// Maximum distance between an alignment edge and an amplicon edge; negative disables
    #[arg(short = 's', long = "seed-margin", default_value_t = 5, allow_negative_numbers = true)]
    pub seed_margin: i32,

    /// Number of alignment worker threads
    #[arg(short = 'w', long = "workers", default_value_t = 5)]
    pub workers: usize,

    /// Report a record for every candidate amplicon, not only the best
    #[arg(long)]
    pub secondary: bool,

    /// Set logging level to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn aligner_config(&self) -> AlignerConfig {
        AlignerConfig {
            max_amplicons: self.max_amplicons,
            seed_length: self.key_size,
            match_score: self.match_score,
            mismatch_score: self.mismatch,
            gap_extend: self.gap_extend,
            gap_open: self.gap_open,
            seed_margin: self.seed_margin,
            report_secondary: self.secondary,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            ..PipelineConfig::default()
        }
    }
}
