use crate::error::RowError;
use crate::models::NormalizedRecord;
use crate::processor::schema_normalizer::derive_review_id;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::debug;

/// Result of cleaning one batch: surviving records (identity resolved, rating
/// validated, date standardized) plus the counts the run summary reports.
#[derive(Debug, Default)]
pub struct CleanOutcome {
    pub records: Vec<NormalizedRecord>,
    pub duplicates_dropped: usize,
    pub invalid_rows: usize,
}

/// Validates rows and removes duplicates. Deterministic: the same input
/// always yields the same output, which is what allows idempotent re-runs.
pub struct Cleaner {
    rating_min: f64,
    rating_max: f64,
}

impl Cleaner {
    pub fn new(rating_min: f64, rating_max: f64) -> Self {
        Self {
            rating_min,
            rating_max,
        }
    }

    /// Validate, resolve identity, standardize dates and deduplicate.
    /// Duplicate key = review_id (native or content hash); last write wins
    /// within the batch, keeping the first occurrence's position so output
    /// order stays stable.
    pub fn clean_batch(&self, rows: Vec<NormalizedRecord>) -> CleanOutcome {
        let mut outcome = CleanOutcome::default();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for mut row in rows {
            let review_id = match self.validate(&row) {
                Ok(id) => id,
                Err(reason) => {
                    debug!("dropping invalid row: {}", reason);
                    outcome.invalid_rows += 1;
                    continue;
                }
            };

            row.review_id = Some(review_id.clone());
            // unparsable dates become None, never an error; downstream
            // tolerates a missing date but not a missing identity
            row.review_date = standardize_date(&row.review_date_raw);

            match seen.get(&review_id) {
                Some(&pos) => {
                    outcome.records[pos] = row;
                    outcome.duplicates_dropped += 1;
                }
                None => {
                    seen.insert(review_id, outcome.records.len());
                    outcome.records.push(row);
                }
            }
        }

        outcome
    }

    /// Rating must parse and lie within the configured scale (inclusive);
    /// out-of-range values are rejected, not clamped. Identity must be
    /// present or derivable. Empty text is valid.
    fn validate(&self, row: &NormalizedRecord) -> Result<String, RowError> {
        let rating = row.rating.ok_or(RowError::MissingRating)?;
        if rating < self.rating_min || rating > self.rating_max {
            return Err(RowError::RatingOutOfRange {
                value: rating,
                min: self.rating_min,
                max: self.rating_max,
            });
        }

        derive_review_id(row).ok_or(RowError::MissingIdentity)
    }
}

/// Parse a date out of the formats review dumps actually use; None when
/// nothing matches.
pub fn standardize_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, text: &str, rating: f64) -> NormalizedRecord {
        NormalizedRecord {
            review_id: Some(id.to_string()),
            raw_text: text.to_string(),
            rating: Some(rating),
            ..Default::default()
        }
    }

    #[test]
    fn test_last_write_wins_dedup() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let outcome = cleaner.clean_batch(vec![
            row("r1", "first version", 4.0),
            row("r2", "other review", 3.0),
            row("r1", "second version", 5.0),
        ]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.duplicates_dropped, 1);
        // last content wins, first position kept
        assert_eq!(outcome.records[0].raw_text, "second version");
        assert_eq!(outcome.records[0].rating, Some(5.0));
        assert_eq!(outcome.records[1].review_id.as_deref(), Some("r2"));
    }

    #[test]
    fn test_out_of_range_rating_excluded() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let outcome = cleaner.clean_batch(vec![
            row("r1", "fine", 7.0),
            row("r2", "fine", 5.0),
            row("r3", "fine", 0.0),
        ]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.invalid_rows, 2);
        assert_eq!(outcome.records[0].review_id.as_deref(), Some("r2"));
    }

    #[test]
    fn test_boundary_ratings_are_valid() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let outcome = cleaner.clean_batch(vec![row("r1", "a", 1.0), row("r2", "b", 5.0)]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.invalid_rows, 0);
    }

    #[test]
    fn test_missing_rating_excluded() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let mut record = row("r1", "fine", 3.0);
        record.rating = None;
        let outcome = cleaner.clean_batch(vec![record]);
        assert_eq!(outcome.records.len(), 0);
        assert_eq!(outcome.invalid_rows, 1);
    }

    #[test]
    fn test_empty_text_is_valid() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let outcome = cleaner.clean_batch(vec![row("r2", "", 3.0)]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.invalid_rows, 0);
    }

    #[test]
    fn test_missing_identity_excluded() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let record = NormalizedRecord {
            review_id: None,
            raw_text: "text but nothing identifying".to_string(),
            rating: Some(3.0),
            ..Default::default()
        };
        let outcome = cleaner.clean_batch(vec![record]);
        assert_eq!(outcome.records.len(), 0);
        assert_eq!(outcome.invalid_rows, 1);
    }

    #[test]
    fn test_hash_identity_dedups_identical_content() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let make = || NormalizedRecord {
            review_id: None,
            product_id: "B00X".to_string(),
            author: "pat".to_string(),
            raw_text: "same text".to_string(),
            rating: Some(4.0),
            ..Default::default()
        };
        let outcome = cleaner.clean_batch(vec![make(), make()]);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.duplicates_dropped, 1);
    }

    #[test]
    fn test_date_standardization() {
        assert_eq!(
            standardize_date("2020-01-02"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(
            standardize_date("2020-01-02T10:30:00Z"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(
            standardize_date("2020-01-02 10:30:00"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(
            standardize_date("01/02/2020"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(
            standardize_date("02-01-2020"),
            NaiveDate::from_ymd_opt(2020, 1, 2)
        );
        assert_eq!(standardize_date("soonish"), None);
        assert_eq!(standardize_date(""), None);
    }

    #[test]
    fn test_clean_batch_is_deterministic() {
        let cleaner = Cleaner::new(1.0, 5.0);
        let input = vec![
            row("r1", "a", 4.0),
            row("r2", "b", 7.0),
            row("r1", "c", 3.0),
        ];
        let first = cleaner.clean_batch(input.clone());
        let second = cleaner.clean_batch(input);
        assert_eq!(first.records, second.records);
        assert_eq!(first.duplicates_dropped, second.duplicates_dropped);
        assert_eq!(first.invalid_rows, second.invalid_rows);
    }
}
