use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bucket granularity for the timeseries aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Month,
}

impl Granularity {
    /// chrono format string producing the bucket key. Keys sort
    /// lexicographically in chronological order.
    pub fn format_str(&self) -> &'static str {
        match self {
            Granularity::Day => "%Y-%m-%d",
            Granularity::Month => "%Y-%m",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
    /// Development cap on the number of rows read (like --limit on the CLI).
    pub limit: Option<usize>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: "data/raw/reviews.csv".to_string(),
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data/db/reviews.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub path: String,
    pub aggregate_path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: "data/export/reviews_for_dashboard.csv".to_string(),
            aggregate_path: "data/export/aggregate.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            min_value: 1.0,
            max_value: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            positive_threshold: 0.05,
            negative_threshold: -0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    pub top_n: usize,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeseriesConfig {
    pub granularity: Granularity,
}

impl Default for TimeseriesConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
        }
    }
}

/// Full configuration surface of the pipeline. Every section has defaults, so
/// an empty TOML file (or no file at all) yields a working configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: InputConfig,
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub rating: RatingConfig,
    pub sentiment: SentimentConfig,
    pub keywords: KeywordConfig,
    pub timeseries: TimeseriesConfig,
    /// Extra column aliases merged over the built-in table:
    /// canonical field name -> accepted source column names.
    pub aliases: HashMap<String, Vec<String>>,
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;

        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.sentiment.positive_threshold, 0.05);
        assert_eq!(config.sentiment.negative_threshold, -0.05);
        assert_eq!(config.keywords.top_n, 5);
        assert_eq!(config.rating.min_value, 1.0);
        assert_eq!(config.rating.max_value, 5.0);
        assert_eq!(config.timeseries.granularity, Granularity::Day);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [input]
            path = "samples/reviews.csv"

            [sentiment]
            positive_threshold = 0.1

            [keywords]
            top_n = 3

            [timeseries]
            granularity = "month"

            [aliases]
            text = ["comment_body"]
        "#;
        let config: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.input.path, "samples/reviews.csv");
        assert_eq!(config.sentiment.positive_threshold, 0.1);
        // untouched sections keep defaults
        assert_eq!(config.sentiment.negative_threshold, -0.05);
        assert_eq!(config.keywords.top_n, 3);
        assert_eq!(config.timeseries.granularity, Granularity::Month);
        assert_eq!(config.aliases["text"], vec!["comment_body"]);
    }

    #[test]
    fn test_granularity_format() {
        assert_eq!(Granularity::Day.format_str(), "%Y-%m-%d");
        assert_eq!(Granularity::Month.format_str(), "%Y-%m");
    }
}
