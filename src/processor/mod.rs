pub mod cleaner;
pub mod enrichment;
pub mod lexicon;
pub mod schema_normalizer;

pub use cleaner::*;
pub use enrichment::*;
pub use lexicon::*;
pub use schema_normalizer::*;
