//! nimbus-rs: seeded alignment of paired-end reads against a known amplicon design.
//!
//! # Library usage
//!
//! ```no_run
//! use nimbus_rs::{AlignerConfig, AmpliconAligner, AmpliconIndex, Manager, PipelineConfig};
//! use nimbus_rs::design::load_design;
//! use nimbus_rs::fastq::PairedReader;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let design = load_design(Path::new("design.bed"), Path::new("ref.fa"))?;
//! let config = AlignerConfig::default();
//! let mut index = AmpliconIndex::new();
//! for amplicon in design.amplicons {
//!     index.add(amplicon);
//! }
//! index.build(config.seed_length);
//!
//! let aligner = AmpliconAligner::new(&index, &config);
//! let manager = Manager::new(&aligner, PipelineConfig::default())?;
//! let reads = PairedReader::open(Path::new("r1.fq"), Path::new("r2.fq"))?;
//! let stats = manager.run(reads, std::io::stdout())?;
//! # let _ = stats;
//! # Ok(())
//! # }
//! ```

pub mod aligner;
pub mod alignment;
pub mod amplicon;
pub mod builder;
pub mod cigar;
pub mod design;
pub mod fasta;
pub mod fastq;
pub mod header;
pub mod index;
pub mod pipeline;
pub mod queue;
pub mod read;
pub mod record;

// Internal modules — not part of the public API.
pub(crate) mod types;

// Flat re-exports for the most commonly used public types.
pub use aligner::{AlignerConfig, AmpliconAligner, MappingQuality};
pub use alignment::{Alignment, AlignmentKind, AlignmentScore};
pub use amplicon::{Amplicon, GenomicRegion};
pub use builder::{AlignmentBuilder, AlnSet};
pub use cigar::Cigar;
pub use header::SamHeader;
pub use index::AmpliconIndex;
pub use pipeline::{Manager, PipelineConfig, Stats};
pub use read::{Read, ReadPair};
pub use record::SamRecord;
pub use types::{AmpliconId, Coord};
