use crate::config::Granularity;
use crate::models::AggregateRow;
use crate::storage::{ReviewFilter, SqliteReviewStore};
use anyhow::Result;
use std::collections::HashMap;
use std::str::FromStr;

/// Named grouping metrics computed over the review store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    ByProduct,
    BySentiment,
    ByRating,
    ByKeyword,
    Timeseries,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::ByProduct => "by_product",
            Metric::BySentiment => "by_sentiment",
            Metric::ByRating => "by_rating",
            Metric::ByKeyword => "by_keyword",
            Metric::Timeseries => "timeseries",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_product" => Ok(Metric::ByProduct),
            "by_sentiment" => Ok(Metric::BySentiment),
            "by_rating" => Ok(Metric::ByRating),
            "by_keyword" => Ok(Metric::ByKeyword),
            "timeseries" => Ok(Metric::Timeseries),
            other => Err(format!(
                "unknown metric: {} (expected by_product, by_sentiment, by_rating, by_keyword or timeseries)",
                other
            )),
        }
    }
}

/// Recomputes grouped counts from the store on demand. Pure view: nothing is
/// persisted, and the same store contents always produce the same rows in
/// the same order.
pub struct Aggregator<'a> {
    store: &'a SqliteReviewStore,
    granularity: Granularity,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a SqliteReviewStore, granularity: Granularity) -> Self {
        Self { store, granularity }
    }

    /// Group, count, then sort descending by count with ties broken by key.
    /// Bucket keys are formatted so lexicographic order matches chronological
    /// order, which keeps the tie-break natural for timeseries too.
    pub fn aggregate(&self, metric: Metric, top_n: Option<usize>) -> Result<Vec<AggregateRow>> {
        let reviews = self.store.query(&ReviewFilter::default())?;
        let mut counts: HashMap<String, i64> = HashMap::new();

        for review in &reviews {
            match metric {
                Metric::ByProduct => {
                    *counts.entry(review.product_id.clone()).or_insert(0) += 1;
                }
                Metric::BySentiment => {
                    // rows with failed enrichment carry no label and are not
                    // a sentiment group
                    if let Some(label) = review.sentiment_label {
                        *counts.entry(label.as_str().to_string()).or_insert(0) += 1;
                    }
                }
                Metric::ByRating => {
                    *counts.entry(format_rating(review.rating)).or_insert(0) += 1;
                }
                Metric::ByKeyword => {
                    // a review with K keywords contributes K grouping events
                    for keyword in &review.keywords {
                        *counts.entry(keyword.clone()).or_insert(0) += 1;
                    }
                }
                Metric::Timeseries => {
                    // only observed buckets appear; no gap filling
                    if let Some(date) = review.review_date {
                        let bucket = date.format(self.granularity.format_str()).to_string();
                        *counts.entry(bucket).or_insert(0) += 1;
                    }
                }
            }
        }

        let mut rows: Vec<AggregateRow> = counts
            .into_iter()
            .map(|(key, value)| AggregateRow { key, value })
            .collect();
        rows.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key.cmp(&b.key)));

        if let Some(n) = top_n {
            rows.truncate(n);
        }

        Ok(rows)
    }
}

/// Whole ratings print without a fractional part so group keys stay stable
/// across runs ("5", never "5.0").
pub fn format_rating(rating: f64) -> String {
    if rating.fract() == 0.0 {
        format!("{}", rating as i64)
    } else {
        format!("{}", rating)
    }
}
