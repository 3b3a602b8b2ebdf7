pub mod aggregator;
pub mod exporter;

pub use aggregator::*;
pub use exporter::*;
