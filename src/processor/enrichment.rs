use crate::error::RowError;
use crate::models::{NormalizedRecord, Review, Sentiment};
use crate::processor::lexicon::{Lexicon, NEGATION_SCALAR};
use anyhow::Result;
use regex::Regex;
use std::collections::HashMap;

/// Tuning knobs for the enrichment engine, taken from the pipeline config.
#[derive(Debug, Clone, Copy)]
pub struct EnrichmentOptions {
    pub positive_threshold: f64,
    pub negative_threshold: f64,
    pub top_n: usize,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            positive_threshold: 0.05,
            negative_threshold: -0.05,
            top_n: 5,
        }
    }
}

/// VADER-style normalization constant; maps an unbounded weight sum into
/// (-1, 1).
const NORMALIZATION_ALPHA: f64 = 15.0;

/// Compound score below which a mildly positive text containing a bare
/// moderate word ("ok", "fine") is still treated as neutral.
const MODERATE_GUARD: f64 = 0.20;

/// Text cleaning, sentiment classification and keyword extraction. Every
/// operation is a pure function of its input and the options, so re-running
/// the pipeline never drifts.
pub struct TextEnricher {
    url_re: Regex,
    tag_re: Regex,
    symbol_re: Regex,
    moderate_re: Regex,
    lexicon: Lexicon,
    options: EnrichmentOptions,
}

impl TextEnricher {
    pub fn new(lexicon: Lexicon, options: EnrichmentOptions) -> Result<Self> {
        Ok(Self {
            url_re: Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+")?,
            tag_re: Regex::new(r"<[^>]*>")?,
            // everything that is not an ASCII letter or whitespace: digits,
            // punctuation, emoji, markup leftovers
            symbol_re: Regex::new(r"[^A-Za-z\s]+")?,
            moderate_re: Regex::new(r"\b(?:ok|okay|fine|alright)\b")?,
            lexicon,
            options,
        })
    }

    /// Run all three sub-operations on one record. A failure in any of them
    /// marks the record instead of aborting the batch: the review passes
    /// through with null sentiment and no keywords.
    pub fn enrich(&self, record: NormalizedRecord) -> Review {
        let result = self.try_enrich(&record);

        let review_id = record.review_id.clone().unwrap_or_default();
        let rating = record.rating.unwrap_or_default();

        match result {
            Ok(enriched) => Review {
                review_id,
                product_id: record.product_id,
                brand: record.brand,
                author: record.author,
                title: record.title,
                categories: record.categories,
                raw_text: record.raw_text,
                clean_text: enriched.clean_text,
                rating,
                review_date: record.review_date,
                sentiment_label: Some(enriched.label),
                sentiment_score: enriched.score,
                keywords: enriched.keywords,
                word_count: enriched.word_count,
                helpfulness: record.helpful_votes,
                enrichment_failed: false,
            },
            Err(_) => Review {
                review_id,
                product_id: record.product_id,
                brand: record.brand,
                author: record.author,
                title: record.title,
                categories: record.categories,
                raw_text: record.raw_text,
                clean_text: String::new(),
                rating,
                review_date: record.review_date,
                sentiment_label: None,
                sentiment_score: 0.0,
                keywords: Vec::new(),
                word_count: 0,
                helpfulness: record.helpful_votes,
                enrichment_failed: true,
            },
        }
    }

    fn try_enrich(&self, record: &NormalizedRecord) -> Result<Enriched, RowError> {
        let clean_text = self.clean_text(&record.raw_text);
        let (score, label) = self.sentiment(&clean_text);
        let keywords = self.keywords(&clean_text);
        let word_count = clean_text.split_whitespace().count() as i64;

        Ok(Enriched {
            clean_text,
            score,
            label,
            keywords,
            word_count,
        })
    }

    /// Strip URLs, HTML markup and non-linguistic symbols, collapse
    /// whitespace, lowercase. Leaves the original text untouched.
    pub fn clean_text(&self, raw: &str) -> String {
        let no_urls = self.url_re.replace_all(raw, " ");
        let no_tags = self.tag_re.replace_all(&no_urls, " ");
        let letters_only = self.symbol_re.replace_all(&no_tags, " ");

        letters_only
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Compound polarity score plus label over already-cleaned text. Empty
    /// or all-stopword text yields neutral with score 0.0, never a failure.
    pub fn sentiment(&self, clean_text: &str) -> (f64, Sentiment) {
        let tokens: Vec<&str> = clean_text.split_whitespace().collect();
        if tokens.is_empty() {
            return (0.0, Sentiment::Neutral);
        }

        let mut sum = 0.0;
        let mut hits = 0usize;
        for (i, token) in tokens.iter().enumerate() {
            if let Some(mut weight) = self.lexicon.weight(token) {
                if i > 0 && self.lexicon.is_negator(tokens[i - 1]) {
                    weight *= NEGATION_SCALAR;
                }
                sum += weight;
                hits += 1;
            }
        }

        if hits == 0 {
            return (0.0, Sentiment::Neutral);
        }

        let compound = sum / (sum * sum + NORMALIZATION_ALPHA).sqrt();
        let mut label = self.classify(compound);

        // a mildly positive "it is okay" kind of text reads neutral to a
        // human; keep it neutral unless the score clears the guard
        if label == Sentiment::Positive
            && compound < MODERATE_GUARD
            && self.moderate_re.is_match(clean_text)
        {
            label = Sentiment::Neutral;
        }

        (compound, label)
    }

    /// Label assignment with inclusive boundaries: a score exactly at the
    /// positive threshold is positive.
    pub fn classify(&self, score: f64) -> Sentiment {
        if score >= self.options.positive_threshold {
            Sentiment::Positive
        } else if score <= self.options.negative_threshold {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Top-N most frequent non-stopword tokens, ties broken by first
    /// occurrence. Deduplicated by construction; empty input gives an empty
    /// list, not an error.
    pub fn keywords(&self, clean_text: &str) -> Vec<String> {
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();

        for (position, token) in clean_text.split_whitespace().enumerate() {
            if self.lexicon.is_stopword(token) {
                continue;
            }
            let entry = counts.entry(token).or_insert((0, position));
            entry.0 += 1;
        }

        let mut ranked: Vec<(&str, usize, usize)> = counts
            .into_iter()
            .map(|(token, (count, first))| (token, count, first))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        ranked.truncate(self.options.top_n);

        ranked.into_iter().map(|(token, _, _)| token.to_string()).collect()
    }
}

struct Enriched {
    clean_text: String,
    score: f64,
    label: Sentiment,
    keywords: Vec<String>,
    word_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enricher() -> TextEnricher {
        TextEnricher::new(Lexicon::english(), EnrichmentOptions::default()).unwrap()
    }

    fn enricher_with(options: EnrichmentOptions) -> TextEnricher {
        TextEnricher::new(Lexicon::english(), options).unwrap()
    }

    #[test]
    fn test_clean_text_strips_noise() {
        let e = enricher();
        assert_eq!(
            e.clean_text("Great battery life!! http://x.com"),
            "great battery life"
        );
        assert_eq!(e.clean_text("<p>Hello World! 123</p>"), "hello world");
        assert_eq!(e.clean_text("love it \u{1F600}\u{1F44D}"), "love it");
        assert_eq!(e.clean_text("check www.example.com now"), "check now");
        assert_eq!(e.clean_text("   spaced \t out\n text "), "spaced out text");
        assert_eq!(e.clean_text(""), "");
    }

    #[test]
    fn test_clean_text_is_deterministic() {
        let e = enricher();
        let raw = "Great <b>battery</b>!! https://x.com \u{1F600}";
        assert_eq!(e.clean_text(raw), e.clean_text(raw));
    }

    #[test]
    fn test_sentiment_labels() {
        let e = enricher();
        assert_eq!(e.sentiment("i love this product").1, Sentiment::Positive);
        assert_eq!(e.sentiment("this is terrible").1, Sentiment::Negative);
        assert_eq!(e.sentiment("it is okay").1, Sentiment::Neutral);
        assert_eq!(e.sentiment("").1, Sentiment::Neutral);
    }

    #[test]
    fn test_empty_and_stopword_only_text_scores_zero() {
        let e = enricher();
        assert_eq!(e.sentiment(""), (0.0, Sentiment::Neutral));
        assert_eq!(e.sentiment("the and of it"), (0.0, Sentiment::Neutral));
        // unknown vocabulary also stays neutral
        assert_eq!(e.sentiment("zebra xylophone"), (0.0, Sentiment::Neutral));
    }

    #[test]
    fn test_negation_flips_polarity() {
        let e = enricher();
        let (positive_score, _) = e.sentiment("good product");
        let (negated_score, negated_label) = e.sentiment("not good product");
        assert!(positive_score > 0.0);
        assert!(negated_score < 0.0);
        assert_eq!(negated_label, Sentiment::Negative);

        // contractions lose their apostrophe during cleaning
        let cleaned = e.clean_text("Don't like it at all");
        assert_eq!(e.sentiment(&cleaned).1, Sentiment::Negative);
    }

    #[test]
    fn test_boundary_score_is_positive() {
        let e = enricher();
        // inclusive boundary: exactly the threshold classifies positive
        assert_eq!(e.classify(0.05), Sentiment::Positive);
        assert_eq!(e.classify(-0.05), Sentiment::Negative);
        assert_eq!(e.classify(0.049), Sentiment::Neutral);
        assert_eq!(e.classify(-0.049), Sentiment::Neutral);
    }

    #[test]
    fn test_threshold_override() {
        let e = enricher_with(EnrichmentOptions {
            positive_threshold: 0.9,
            negative_threshold: -0.9,
            top_n: 5,
        });
        // "great" alone compounds to ~0.63, below the raised threshold
        assert_eq!(e.sentiment("great").1, Sentiment::Neutral);
    }

    #[test]
    fn test_score_stays_bounded() {
        let e = enricher();
        let gushing = "love love love best great perfect excellent amazing wonderful superb";
        let (score, label) = e.sentiment(gushing);
        assert!(score > 0.0 && score < 1.0);
        assert_eq!(label, Sentiment::Positive);

        let scathing = "hate terrible awful worst horrible garbage useless broken";
        let (score, label) = e.sentiment(scathing);
        assert!(score < 0.0 && score > -1.0);
        assert_eq!(label, Sentiment::Negative);
    }

    #[test]
    fn test_keywords_frequency_and_ties() {
        let e = enricher();
        // apple x3, banana x2, orange x1
        let text = "apple banana apple orange banana apple";
        assert_eq!(e.keywords(text), vec!["apple", "banana", "orange"]);

        // tie between banana and orange broken by first occurrence
        let text = "banana orange banana orange";
        assert_eq!(e.keywords(text), vec!["banana", "orange"]);
    }

    #[test]
    fn test_keywords_bounded_and_deduplicated() {
        let e = enricher_with(EnrichmentOptions {
            top_n: 2,
            ..Default::default()
        });
        let keywords = e.keywords("alpha beta gamma alpha beta delta");
        assert_eq!(keywords.len(), 2);
        assert_eq!(keywords, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_keywords_skip_stopwords_and_empty() {
        let e = enricher();
        assert!(e.keywords("").is_empty());
        assert!(e.keywords("the and of it").is_empty());
        let keywords = e.keywords("this is a simple test sentence");
        assert!(keywords.contains(&"simple".to_string()));
        assert!(!keywords.contains(&"this".to_string()));
    }

    #[test]
    fn test_enrich_scenario_positive_review() {
        let e = enricher();
        let record = NormalizedRecord {
            review_id: Some("r1".into()),
            raw_text: "Great battery life!! http://x.com".into(),
            rating: Some(5.0),
            ..Default::default()
        };
        let review = e.enrich(record);
        assert_eq!(review.clean_text, "great battery life");
        assert_eq!(review.sentiment_label, Some(Sentiment::Positive));
        assert!(review.keywords.contains(&"battery".to_string()));
        assert!(!review.enrichment_failed);
        assert_eq!(review.raw_text, "Great battery life!! http://x.com");
        assert_eq!(review.word_count, 3);
    }

    #[test]
    fn test_enrich_scenario_empty_text() {
        let e = enricher();
        let record = NormalizedRecord {
            review_id: Some("r2".into()),
            raw_text: String::new(),
            rating: Some(3.0),
            ..Default::default()
        };
        let review = e.enrich(record);
        assert_eq!(review.sentiment_label, Some(Sentiment::Neutral));
        assert_eq!(review.sentiment_score, 0.0);
        assert!(review.keywords.is_empty());
        assert!(!review.enrichment_failed);
    }

    #[test]
    fn test_enrichment_is_pure() {
        let e = enricher();
        let record = NormalizedRecord {
            review_id: Some("r1".into()),
            raw_text: "Solid product, would recommend! https://shop.example".into(),
            rating: Some(4.0),
            ..Default::default()
        };
        let first = e.enrich(record.clone());
        let second = e.enrich(record);
        assert_eq!(first, second);
    }
}
