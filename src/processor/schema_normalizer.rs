use crate::error::{PipelineError, Stage};
use crate::models::NormalizedRecord;
use csv::StringRecord;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Canonical field names the rest of the pipeline works with.
pub mod canonical {
    pub const REVIEW_ID: &str = "review_id";
    pub const PRODUCT_ID: &str = "product_id";
    pub const BRAND: &str = "brand";
    pub const AUTHOR: &str = "author";
    pub const TITLE: &str = "title";
    pub const CATEGORIES: &str = "categories";
    pub const TEXT: &str = "text";
    pub const RATING: &str = "rating";
    pub const DATE: &str = "date";
    pub const HELPFUL: &str = "helpful";
}

/// Resolved column positions for one input file. Text and rating are
/// mandatory at the file level; everything else is optional per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub text: usize,
    pub rating: usize,
    pub review_id: Option<usize>,
    pub product_id: Option<usize>,
    pub brand: Option<usize>,
    pub author: Option<usize>,
    pub title: Option<usize>,
    pub categories: Option<usize>,
    pub date: Option<usize>,
    pub helpful: Option<usize>,
}

/// Maps heterogeneous raw column names onto the canonical schema via a
/// configurable alias table. Pure mapping, no side effects; unmapped extra
/// columns are simply dropped.
pub struct SchemaNormalizer {
    // normalized alias -> canonical field
    aliases: HashMap<String, &'static str>,
}

impl SchemaNormalizer {
    pub fn new() -> Self {
        let mut aliases = HashMap::new();

        let defaults: &[(&'static str, &[&str])] = &[
            (
                canonical::REVIEW_ID,
                &["review_id", "reviews_id", "reviews.id", "id"],
            ),
            (
                canonical::PRODUCT_ID,
                &["product_id", "asins", "asin", "product"],
            ),
            (canonical::BRAND, &["brand", "manufacturer"]),
            (
                canonical::AUTHOR,
                &["author", "reviews_username", "reviews.username", "username", "user"],
            ),
            (
                canonical::TITLE,
                &["title", "reviews_title", "reviews.title", "summary"],
            ),
            (
                canonical::CATEGORIES,
                &["categories", "category", "primarycategories"],
            ),
            (
                canonical::TEXT,
                &["text", "review_text", "reviews_text", "reviews.text", "body", "review_body"],
            ),
            (
                canonical::RATING,
                &["rating", "reviews_rating", "reviews.rating", "stars", "score"],
            ),
            (
                canonical::DATE,
                &[
                    "date",
                    "review_date",
                    "reviews_date",
                    "reviews.date",
                    "reviews_dateadded",
                    "reviews.dateadded",
                ],
            ),
            (
                canonical::HELPFUL,
                &["helpful", "reviews_numhelpful", "reviews.numhelpful", "helpful_votes"],
            ),
        ];

        for (field, names) in defaults {
            for name in *names {
                aliases.insert(normalize_column_name(name), *field);
            }
        }

        SchemaNormalizer { aliases }
    }

    /// Merge caller-supplied aliases over the built-in table. Keys must be
    /// canonical field names; unknown keys are ignored.
    pub fn with_extra_aliases(mut self, extra: &HashMap<String, Vec<String>>) -> Self {
        let canonical_fields = [
            canonical::REVIEW_ID,
            canonical::PRODUCT_ID,
            canonical::BRAND,
            canonical::AUTHOR,
            canonical::TITLE,
            canonical::CATEGORIES,
            canonical::TEXT,
            canonical::RATING,
            canonical::DATE,
            canonical::HELPFUL,
        ];

        for (field, names) in extra {
            if let Some(target) = canonical_fields.iter().find(|c| **c == field.as_str()) {
                for name in names {
                    self.aliases.insert(normalize_column_name(name), *target);
                }
            }
        }

        self
    }

    /// Resolve a header row to canonical column positions. Fails with a
    /// schema error before any row processing when the text column, the
    /// rating column, or every identity-bearing column is missing.
    pub fn map_headers(&self, headers: &StringRecord) -> Result<ColumnMap, PipelineError> {
        let mut positions: HashMap<&'static str, usize> = HashMap::new();

        for (idx, raw_name) in headers.iter().enumerate() {
            let normalized = normalize_column_name(raw_name);
            if let Some(field) = self.aliases.get(&normalized) {
                // first matching column wins when several aliases collide
                positions.entry(*field).or_insert(idx);
            }
        }

        let text = *positions.get(canonical::TEXT).ok_or_else(|| {
            self.schema_error(headers, "no review text column found")
        })?;
        let rating = *positions.get(canonical::RATING).ok_or_else(|| {
            self.schema_error(headers, "no rating column found")
        })?;

        let review_id = positions.get(canonical::REVIEW_ID).copied();
        let product_id = positions.get(canonical::PRODUCT_ID).copied();
        let author = positions.get(canonical::AUTHOR).copied();
        let date = positions.get(canonical::DATE).copied();

        // identity: a native id column, or enough fields to derive one
        if review_id.is_none() && product_id.is_none() && author.is_none() {
            return Err(self.schema_error(
                headers,
                "no identity-bearing column found (id, or product/author)",
            ));
        }

        Ok(ColumnMap {
            text,
            rating,
            review_id,
            product_id,
            brand: positions.get(canonical::BRAND).copied(),
            author,
            title: positions.get(canonical::TITLE).copied(),
            categories: positions.get(canonical::CATEGORIES).copied(),
            date,
            helpful: positions.get(canonical::HELPFUL).copied(),
        })
    }

    /// Map one raw row onto the canonical record shape. Never fails; rating
    /// and identity validation happen in the cleaner.
    pub fn normalize_row(&self, map: &ColumnMap, record: &StringRecord) -> NormalizedRecord {
        let get = |idx: Option<usize>| -> String {
            idx.and_then(|i| record.get(i))
                .map(clean_cell)
                .unwrap_or_default()
        };

        let review_id = match get(map.review_id) {
            id if id.is_empty() => None,
            id => Some(id),
        };

        let rating_raw = get(Some(map.rating));
        let rating = rating_raw.parse::<f64>().ok();

        let helpful_raw = get(map.helpful);
        let helpful_votes = helpful_raw.parse::<f64>().ok();

        NormalizedRecord {
            review_id,
            product_id: first_product_id(&get(map.product_id)),
            brand: get(map.brand),
            author: get(map.author),
            title: get(map.title),
            categories: get(map.categories),
            raw_text: get(Some(map.text)),
            rating,
            review_date_raw: get(map.date),
            review_date: None,
            helpful_votes,
        }
    }

    fn schema_error(&self, headers: &StringRecord, message: &str) -> PipelineError {
        let seen: Vec<&str> = headers.iter().collect();
        PipelineError::Schema {
            stage: Stage::Normalize,
            message: format!("{} (columns seen: {:?})", message, seen),
        }
    }
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a raw column name to simple snake_case for alias lookup.
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('.', "_")
        .replace('-', "_")
}

/// Treat literal null spellings as empty so downstream fields are never null,
/// only empty.
fn clean_cell(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.to_lowercase().as_str() {
        "nan" | "null" | "none" | "n/a" => String::new(),
        _ => trimmed.to_string(),
    }
}

/// Extract a single product id from common multi-valued spellings:
/// `["B00X","B00Y"]`, `B00X,B00Y`, `B00X|B00Y` all yield `B00X`.
pub fn first_product_id(value: &str) -> String {
    let s = value.trim();
    if s.is_empty() {
        return String::new();
    }
    let first = s
        .split([',', '|', ';', ' '])
        .find(|part| !part.trim_matches(|c: char| "[]'\" ".contains(c)).is_empty())
        .unwrap_or(s);
    first.trim_matches(|c: char| "[]'\" ".contains(c)).to_string()
}

/// Deterministic review identity when the source carries no native id:
/// SHA-256 over the immutable fields, hex encoded. Same inputs always hash
/// to the same id across runs, which is what makes re-runs idempotent.
pub fn derive_review_id(record: &NormalizedRecord) -> Option<String> {
    if let Some(id) = &record.review_id {
        return Some(id.clone());
    }

    // need something identity-bearing beyond the text itself
    if record.product_id.is_empty() && record.author.is_empty() {
        return None;
    }

    let mut hasher = Sha256::new();
    hasher.update(record.product_id.as_bytes());
    hasher.update(b"|");
    hasher.update(record.author.as_bytes());
    hasher.update(b"|");
    hasher.update(record.review_date_raw.as_bytes());
    hasher.update(b"|");
    hasher.update(record.raw_text.as_bytes());
    Some(hex::encode(hasher.finalize()))
}
