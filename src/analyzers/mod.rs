pub mod backend;
pub mod comparison;
pub mod density;
pub mod distribution;
pub mod lengths;
pub mod segmenter;
pub mod stats;

pub use backend::{Correction, StatisticsBackend, StatrsBackend};
pub use comparison::{
    ComparisonConfig, ComparisonOutcome, ComparisonReport, GroupComparisonEngine, TestFamily,
};
pub use density::DensityAnalyzer;
pub use distribution::{DistributionReport, LengthDistributionComparison};
pub use lengths::{stats_per_modality, LengthAnalyzer};
pub use segmenter::{remove_metadata_lines, Segment, SegmentationMode, Segmenter};
