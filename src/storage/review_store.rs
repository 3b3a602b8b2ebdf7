use crate::models::{Review, Sentiment, UpsertResult};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Additive migrations, one per schema version. Index + 1 = the version a
/// migration brings the database to; existing data is never destroyed.
const MIGRATIONS: &[&str] = &[
    // v1: initial schema
    "CREATE TABLE reviews (
        review_id        TEXT PRIMARY KEY,
        product_id       TEXT NOT NULL,
        brand            TEXT NOT NULL,
        author           TEXT NOT NULL,
        title            TEXT NOT NULL,
        categories       TEXT NOT NULL,
        raw_text         TEXT NOT NULL,
        clean_text       TEXT NOT NULL,
        rating           REAL NOT NULL,
        review_date      TEXT,
        sentiment        TEXT,
        sentiment_score  REAL NOT NULL DEFAULT 0.0,
        keywords         TEXT NOT NULL DEFAULT '',
        helpfulness      REAL,
        enrichment_failed INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX idx_reviews_product ON reviews(product_id);
    CREATE INDEX idx_reviews_sentiment ON reviews(sentiment);
    CREATE INDEX idx_reviews_date ON reviews(review_date);",
    // v2: word count feature column
    "ALTER TABLE reviews ADD COLUMN word_count INTEGER NOT NULL DEFAULT 0;",
];

/// Query filters backing the aggregator and the read-only browsing endpoints
/// of the surrounding service.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub product_id: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub rating: Option<f64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// SQLite-backed review store. One batch = one transaction, so an
/// interrupted run never leaves a partially committed batch behind, and the
/// single-writer discipline holds under concurrently triggered runs.
pub struct SqliteReviewStore {
    conn: Connection,
}

impl SqliteReviewStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create store directory {:?}", parent))?;
            }
        }

        let mut conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open review store at {:?}", path.as_ref()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on review store")?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout on review store")?;

        migrate_if_needed(&mut conn)?;

        Ok(Self { conn })
    }

    /// In-memory store, test use.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        migrate_if_needed(&mut conn)?;
        Ok(Self { conn })
    }

    /// Insert-or-replace each review keyed by review_id inside a single
    /// transaction. Conflicts resolve by full-record replace, which is what
    /// makes re-running the pipeline idempotent instead of duplicating rows.
    pub fn upsert(&mut self, reviews: &[Review]) -> Result<UpsertResult> {
        let mut result = UpsertResult::default();
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin upsert transaction")?;

        {
            let mut exists_stmt =
                tx.prepare("SELECT 1 FROM reviews WHERE review_id = ?1")?;
            let mut upsert_stmt = tx.prepare(
                "INSERT INTO reviews (
                    review_id, product_id, brand, author, title, categories,
                    raw_text, clean_text, rating, review_date,
                    sentiment, sentiment_score, keywords, word_count,
                    helpfulness, enrichment_failed
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                ON CONFLICT(review_id) DO UPDATE SET
                    product_id = excluded.product_id,
                    brand = excluded.brand,
                    author = excluded.author,
                    title = excluded.title,
                    categories = excluded.categories,
                    raw_text = excluded.raw_text,
                    clean_text = excluded.clean_text,
                    rating = excluded.rating,
                    review_date = excluded.review_date,
                    sentiment = excluded.sentiment,
                    sentiment_score = excluded.sentiment_score,
                    keywords = excluded.keywords,
                    word_count = excluded.word_count,
                    helpfulness = excluded.helpfulness,
                    enrichment_failed = excluded.enrichment_failed",
            )?;

            for review in reviews {
                let already_present: Option<i64> = exists_stmt
                    .query_row(params![review.review_id], |r| r.get(0))
                    .optional()?;

                upsert_stmt.execute(params![
                    review.review_id,
                    review.product_id,
                    review.brand,
                    review.author,
                    review.title,
                    review.categories,
                    review.raw_text,
                    review.clean_text,
                    review.rating,
                    review.review_date.map(|d| d.format("%Y-%m-%d").to_string()),
                    review.sentiment_label.map(|s| s.as_str()),
                    review.sentiment_score,
                    review.keywords.join(","),
                    review.word_count,
                    review.helpfulness,
                    review.enrichment_failed as i64,
                ])?;

                if already_present.is_some() {
                    result.updated += 1;
                } else {
                    result.inserted += 1;
                }
            }
        }

        tx.commit().context("Failed to commit upsert transaction")?;
        Ok(result)
    }

    /// Filtered read in deterministic order (review_id ascending).
    pub fn query(&self, filter: &ReviewFilter) -> Result<Vec<Review>> {
        let mut sql = String::from(
            "SELECT review_id, product_id, brand, author, title, categories,
                    raw_text, clean_text, rating, review_date,
                    sentiment, sentiment_score, keywords, word_count,
                    helpfulness, enrichment_failed
             FROM reviews WHERE 1=1",
        );
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(product_id) = &filter.product_id {
            sql.push_str(&format!(" AND product_id = ?{}", args.len() + 1));
            args.push(Box::new(product_id.clone()));
        }
        if let Some(sentiment) = filter.sentiment {
            sql.push_str(&format!(" AND sentiment = ?{}", args.len() + 1));
            args.push(Box::new(sentiment.as_str().to_string()));
        }
        if let Some(rating) = filter.rating {
            sql.push_str(&format!(" AND rating = ?{}", args.len() + 1));
            args.push(Box::new(rating));
        }
        if let Some(from) = filter.date_from {
            sql.push_str(&format!(" AND review_date >= ?{}", args.len() + 1));
            args.push(Box::new(from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = filter.date_to {
            sql.push_str(&format!(" AND review_date <= ?{}", args.len() + 1));
            args.push(Box::new(to.format("%Y-%m-%d").to_string()));
        }
        sql.push_str(" ORDER BY review_id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            row_to_review,
        )?;

        let mut reviews = Vec::new();
        for row in rows {
            reviews.push(row.context("Failed to read review row")?);
        }
        Ok(reviews)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM reviews", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let latest = MIGRATIONS.len() as i64;

    if current >= latest {
        return Ok(());
    }

    info!(
        "Migrating review store schema from version {} to {}",
        current, latest
    );

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().skip(current as usize) {
        tx.execute_batch(migration)
            .context("Failed to apply store migration")?;
    }
    tx.pragma_update(None, "user_version", latest)?;
    tx.commit().context("Failed to commit store migration")?;

    Ok(())
}

fn row_to_review(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
    let review_date: Option<String> = row.get(9)?;
    let sentiment: Option<String> = row.get(10)?;
    let keywords: String = row.get(12)?;
    let enrichment_failed: i64 = row.get(15)?;

    Ok(Review {
        review_id: row.get(0)?,
        product_id: row.get(1)?,
        brand: row.get(2)?,
        author: row.get(3)?,
        title: row.get(4)?,
        categories: row.get(5)?,
        raw_text: row.get(6)?,
        clean_text: row.get(7)?,
        rating: row.get(8)?,
        review_date: review_date
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        sentiment_label: sentiment.and_then(|s| s.parse().ok()),
        sentiment_score: row.get(11)?,
        keywords: if keywords.is_empty() {
            Vec::new()
        } else {
            keywords.split(',').map(str::to_string).collect()
        },
        word_count: row.get(13)?,
        helpfulness: row.get(14)?,
        enrichment_failed: enrichment_failed != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, product: &str, rating: f64, sentiment: Sentiment) -> Review {
        Review {
            review_id: id.to_string(),
            product_id: product.to_string(),
            brand: "acme".to_string(),
            author: "pat".to_string(),
            title: String::new(),
            categories: String::new(),
            raw_text: "Great battery".to_string(),
            clean_text: "great battery".to_string(),
            rating,
            review_date: NaiveDate::from_ymd_opt(2020, 1, 2),
            sentiment_label: Some(sentiment),
            sentiment_score: 0.6,
            keywords: vec!["battery".to_string()],
            word_count: 2,
            helpfulness: None,
            enrichment_failed: false,
        }
    }

    #[test]
    fn test_upsert_counts_inserts_and_updates() {
        let mut store = SqliteReviewStore::open_in_memory().unwrap();
        let batch = vec![
            review("r1", "p1", 5.0, Sentiment::Positive),
            review("r2", "p1", 2.0, Sentiment::Negative),
        ];

        let first = store.upsert(&batch).unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.updated, 0);

        let second = store.upsert(&batch).unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_upsert_replaces_full_record() {
        let mut store = SqliteReviewStore::open_in_memory().unwrap();
        store
            .upsert(&[review("r1", "p1", 5.0, Sentiment::Positive)])
            .unwrap();

        let mut changed = review("r1", "p2", 1.0, Sentiment::Negative);
        changed.clean_text = "terrible battery".to_string();
        store.upsert(&[changed.clone()]).unwrap();

        let stored = store.query(&ReviewFilter::default()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], changed);
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        let mut store = SqliteReviewStore::open_in_memory().unwrap();
        let mut original = review("r1", "p1", 4.0, Sentiment::Neutral);
        original.helpfulness = Some(0.75);
        original.keywords = vec!["battery".to_string(), "life".to_string()];
        store.upsert(&[original.clone()]).unwrap();

        let stored = store.query(&ReviewFilter::default()).unwrap();
        assert_eq!(stored, vec![original]);
    }

    #[test]
    fn test_null_enrichment_roundtrip() {
        let mut store = SqliteReviewStore::open_in_memory().unwrap();
        let mut failed = review("r1", "p1", 3.0, Sentiment::Neutral);
        failed.sentiment_label = None;
        failed.keywords = Vec::new();
        failed.review_date = None;
        failed.enrichment_failed = true;
        store.upsert(&[failed.clone()]).unwrap();

        let stored = store.query(&ReviewFilter::default()).unwrap();
        assert_eq!(stored, vec![failed]);
    }

    #[test]
    fn test_query_filters() {
        let mut store = SqliteReviewStore::open_in_memory().unwrap();
        let mut r3 = review("r3", "p2", 4.0, Sentiment::Positive);
        r3.review_date = NaiveDate::from_ymd_opt(2021, 6, 1);
        store
            .upsert(&[
                review("r1", "p1", 5.0, Sentiment::Positive),
                review("r2", "p1", 2.0, Sentiment::Negative),
                r3,
            ])
            .unwrap();

        let by_product = store
            .query(&ReviewFilter {
                product_id: Some("p1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_product.len(), 2);

        let negatives = store
            .query(&ReviewFilter {
                sentiment: Some(Sentiment::Negative),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(negatives.len(), 1);
        assert_eq!(negatives[0].review_id, "r2");

        let by_rating = store
            .query(&ReviewFilter {
                rating: Some(5.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_rating.len(), 1);

        let in_range = store
            .query(&ReviewFilter {
                date_from: NaiveDate::from_ymd_opt(2021, 1, 1),
                date_to: NaiveDate::from_ymd_opt(2021, 12, 31),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].review_id, "r3");
    }

    #[test]
    fn test_query_order_is_deterministic() {
        let mut store = SqliteReviewStore::open_in_memory().unwrap();
        store
            .upsert(&[
                review("rb", "p1", 4.0, Sentiment::Positive),
                review("ra", "p1", 4.0, Sentiment::Positive),
            ])
            .unwrap();
        let ids: Vec<String> = store
            .query(&ReviewFilter::default())
            .unwrap()
            .into_iter()
            .map(|r| r.review_id)
            .collect();
        assert_eq!(ids, vec!["ra", "rb"]);
    }

    #[test]
    fn test_migration_is_additive() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("reviews.db");

        // create a v1 database with one row, no word_count column
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch(MIGRATIONS[0]).unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
            conn.execute(
                "INSERT INTO reviews (review_id, product_id, brand, author, title,
                     categories, raw_text, clean_text, rating, sentiment_score, keywords)
                 VALUES ('r1', 'p1', '', '', '', '', 'ok', 'ok', 3.0, 0.0, '')",
                [],
            )
            .unwrap();
        }

        // opening through the store migrates to the latest version without
        // losing the existing row
        let store = SqliteReviewStore::open(&db_path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        let rows = store.query(&ReviewFilter::default()).unwrap();
        assert_eq!(rows[0].word_count, 0);
    }
}
