use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sentiment label derived from the compound polarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(format!("unknown sentiment label: {}", other)),
        }
    }
}

/// Canonical field mapping of one raw row, produced by the schema normalizer.
/// Rating and identity are still unvalidated at this point; the cleaner
/// decides whether the row survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    pub review_id: Option<String>,
    pub product_id: String,
    pub brand: String,
    pub author: String,
    pub title: String,
    pub categories: String,
    pub raw_text: String,
    pub rating: Option<f64>,
    pub review_date_raw: String,
    pub review_date: Option<NaiveDate>,
    pub helpful_votes: Option<f64>,
}

/// Canonical enriched review, the aggregate root of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub product_id: String,
    pub brand: String,
    pub author: String,
    pub title: String,
    pub categories: String,
    pub raw_text: String,
    pub clean_text: String,
    pub rating: f64,
    pub review_date: Option<NaiveDate>,
    pub sentiment_label: Option<Sentiment>,
    pub sentiment_score: f64,
    pub keywords: Vec<String>,
    pub word_count: i64,
    pub helpfulness: Option<f64>,
    pub enrichment_failed: bool,
}

/// Outcome of one batch upsert against the review store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertResult {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertResult {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Run-level counters reported back to the caller (CLI or web layer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub rows_deduplicated: usize,
    pub rows_invalid: usize,
    pub rows_enrichment_failed: usize,
    pub rows_written: usize,
}

/// One grouped entry of an aggregation metric. Never persisted, recomputed
/// on demand from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub key: String,
    pub value: i64,
}
