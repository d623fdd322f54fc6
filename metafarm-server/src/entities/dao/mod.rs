pub mod analysis;

pub use analysis::{AnalysisRecord, AnalysisStatus};
