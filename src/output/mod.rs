//! Materializing generated artifact trees on disk

mod writer;

pub use writer::{fingerprint, OutputWriter, WriteError, WriteOutcome, WriteReport, WrittenFile};

/// Output root used when neither flag nor environment names one
pub const DEFAULT_OUTPUT_DIR: &str = "infrakit-out";
