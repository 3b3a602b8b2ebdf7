use crate::aggregate::Exporter;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Stage};
use crate::models::{NormalizedRecord, Review, RunSummary};
use crate::processor::{Cleaner, EnrichmentOptions, Lexicon, SchemaNormalizer, TextEnricher};
use crate::storage::SqliteReviewStore;
use anyhow::anyhow;
use tracing::{info, warn};

/// Run the full batch pipeline: normalize -> clean -> enrich -> persist ->
/// export. Row-level problems are counted and the run continues; schema and
/// store problems abort with a stage indicator.
pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::default();

    // --- normalize -----------------------------------------------------
    info!("Reading raw reviews from {}", config.input.path);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&config.input.path)
        .map_err(|e| PipelineError::Io {
            stage: Stage::Normalize,
            source: anyhow!(e).context(format!("Failed to open input file {}", config.input.path)),
        })?;

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::Io {
            stage: Stage::Normalize,
            source: anyhow!(e).context("Failed to read input headers"),
        })?
        .clone();

    let normalizer = SchemaNormalizer::new().with_extra_aliases(&config.aliases);
    let column_map = normalizer.map_headers(&headers)?;

    let mut normalized: Vec<NormalizedRecord> = Vec::new();
    for record in reader.records() {
        if let Some(limit) = config.input.limit {
            if summary.rows_read >= limit {
                break;
            }
        }
        summary.rows_read += 1;

        match record {
            Ok(row) => normalized.push(normalizer.normalize_row(&column_map, &row)),
            Err(e) => {
                // a malformed line is a row-level problem, not a run killer
                warn!("Skipping unreadable row {}: {}", summary.rows_read, e);
                summary.rows_invalid += 1;
            }
        }
    }
    info!("Read {} rows from input", summary.rows_read);

    // --- clean ---------------------------------------------------------
    let cleaner = Cleaner::new(config.rating.min_value, config.rating.max_value);
    let outcome = cleaner.clean_batch(normalized);
    summary.rows_deduplicated = outcome.duplicates_dropped;
    summary.rows_invalid += outcome.invalid_rows;
    info!(
        "Cleaned batch: {} records kept, {} duplicates dropped, {} invalid rows excluded",
        outcome.records.len(),
        summary.rows_deduplicated,
        summary.rows_invalid
    );

    // --- enrich --------------------------------------------------------
    let enricher = TextEnricher::new(
        Lexicon::english(),
        EnrichmentOptions {
            positive_threshold: config.sentiment.positive_threshold,
            negative_threshold: config.sentiment.negative_threshold,
            top_n: config.keywords.top_n,
        },
    )
    .map_err(|e| PipelineError::Io {
        stage: Stage::Enrich,
        source: e.context("Failed to build text enricher"),
    })?;

    let reviews: Vec<Review> = outcome
        .records
        .into_iter()
        .map(|record| enricher.enrich(record))
        .collect();
    summary.rows_enrichment_failed = reviews.iter().filter(|r| r.enrichment_failed).count();
    info!(
        "Enriched {} reviews ({} partial failures)",
        reviews.len(),
        summary.rows_enrichment_failed
    );

    // --- persist -------------------------------------------------------
    let mut store =
        SqliteReviewStore::open(&config.store.path).map_err(|e| PipelineError::Persistence {
            stage: Stage::Persist,
            source: e,
            summary,
        })?;
    let upsert = store
        .upsert(&reviews)
        .map_err(|e| PipelineError::Persistence {
            stage: Stage::Persist,
            source: e,
            summary,
        })?;
    summary.rows_written = upsert.total();
    info!(
        "Upserted {} reviews into {} ({} inserted, {} updated)",
        upsert.total(),
        config.store.path,
        upsert.inserted,
        upsert.updated
    );

    // --- export --------------------------------------------------------
    let exporter = Exporter::new(config.keywords.top_n);
    let exported = exporter
        .export_reviews(&store, &config.export.path)
        .map_err(|e| PipelineError::Io {
            stage: Stage::Export,
            source: e,
        })?;
    info!("Exported {} rows to {}", exported, config.export.path);

    Ok(summary)
}
