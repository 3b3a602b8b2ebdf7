use crate::aggregate::aggregator::format_rating;
use crate::models::AggregateRow;
use crate::storage::{ReviewFilter, SqliteReviewStore};
use anyhow::{Context, Result};
use std::path::Path;

/// Writes flat CSV exports for the external dashboard. Column order is fixed
/// and rows come out of deterministic queries, so re-exporting unchanged data
/// produces byte-identical files.
pub struct Exporter {
    keyword_columns: usize,
}

impl Exporter {
    pub fn new(keyword_columns: usize) -> Self {
        Self { keyword_columns }
    }

    /// Review-level export with the canonical dashboard columns:
    /// `product, brand, rating, sentiment, date, keyword_1..N`. Rows come
    /// out ordered by review_id. Returns the number of data rows written.
    pub fn export_reviews<P: AsRef<Path>>(
        &self,
        store: &SqliteReviewStore,
        path: P,
    ) -> Result<usize> {
        ensure_parent_dir(path.as_ref())?;
        let mut writer = csv::Writer::from_path(path.as_ref())
            .with_context(|| format!("Failed to open export file {:?}", path.as_ref()))?;

        let mut header = vec![
            "product".to_string(),
            "brand".to_string(),
            "rating".to_string(),
            "sentiment".to_string(),
            "date".to_string(),
        ];
        for i in 1..=self.keyword_columns {
            header.push(format!("keyword_{}", i));
        }
        writer.write_record(&header)?;

        let reviews = store.query(&ReviewFilter::default())?;
        let rows = reviews.len();

        for review in &reviews {
            let mut record = vec![
                review.product_id.clone(),
                review.brand.clone(),
                format_rating(review.rating),
                review
                    .sentiment_label
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default(),
                review
                    .review_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ];
            for i in 0..self.keyword_columns {
                record.push(review.keywords.get(i).cloned().unwrap_or_default());
            }
            writer.write_record(&record)?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to flush export file {:?}", path.as_ref()))?;
        Ok(rows)
    }

    /// Aggregate-shaped export: `key, value` in the aggregator's order.
    pub fn export_aggregate<P: AsRef<Path>>(
        &self,
        rows: &[AggregateRow],
        path: P,
    ) -> Result<usize> {
        ensure_parent_dir(path.as_ref())?;
        let mut writer = csv::Writer::from_path(path.as_ref())
            .with_context(|| format!("Failed to open export file {:?}", path.as_ref()))?;

        writer.write_record(["key", "value"])?;
        for row in rows {
            writer.write_record([row.key.as_str(), &row.value.to_string()])?;
        }

        writer
            .flush()
            .with_context(|| format!("Failed to flush export file {:?}", path.as_ref()))?;
        Ok(rows.len())
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create export directory {:?}", parent))?;
        }
    }
    Ok(())
}
