pub mod aggregate;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod storage;

pub use config::PipelineConfig;
pub use error::{PipelineError, RowError, Stage};
pub use models::{AggregateRow, Review, RunSummary, Sentiment, UpsertResult};
