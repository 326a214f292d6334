//! sleep2dreem - Convert wearable sleep-stage exports into Dreem-style CSV summaries
//!
//! Raw stage intervals go through a deterministic pipeline: export adaptation →
//! interval parsing → night grouping → fixed-grid resampling → night statistics
//! → CSV encoding.
//!
//! ## Modules
//!
//! - **Adapters**: Read Health Auto Export envelopes or bare record lists
//! - **Interval Parser**: Turn raw records into shifted, timezone-aware intervals
//! - **Normalizer**: Map source stage labels onto the canonical stages
//! - **Grouper**: Bucket intervals into overnight windows keyed by evening date
//! - **Resampler**: Tile each night with fixed-length segments
//! - **Stats**: Sleep onset, stage durations, WASO, awakenings, efficiency, hypnogram
//! - **Encoder**: Dreem CSV header and rows
//! - **Pipeline**: Accumulate intervals across files and summarize each night
//! - **Files**: Input discovery, processed-input marking and output naming

pub mod adapters;
pub mod config;
pub mod diagnostics;
pub mod encoder;
pub mod error;
pub mod files;
pub mod grouper;
pub mod interval;
pub mod normalizer;
pub mod pipeline;
pub mod resampler;
pub mod stats;
pub mod types;

pub use config::ConvertConfig;
pub use diagnostics::{Diagnostics, Warning};
pub use encoder::{CsvEncoder, DurationFormat};
pub use error::ConvertError;
pub use pipeline::{convert_files, BatchReport, Conversion, Converter};
pub use types::{SleepStage, SummaryRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name used in file names and the CLI
pub const PRODUCER_NAME: &str = "sleep2dreem";
