use anyhow::{Context, Result};
use review_pipeline::aggregate::{Aggregator, Exporter, Metric};
use review_pipeline::config::PipelineConfig;
use review_pipeline::pipeline;
use review_pipeline::storage::SqliteReviewStore;
use std::env;
use std::path::Path;
use tracing::{error, info};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let args = CliArgs::parse(env::args().skip(1))?;
    let mut config = load_config(args.config_path.as_deref())?;
    apply_overrides(&mut config, &args);

    info!("🚀 Starting review pipeline");
    info!(
        "input={} store={} export={}",
        config.input.path, config.store.path, config.export.path
    );

    let summary = match pipeline::run(&config) {
        Ok(summary) => summary,
        Err(e) => {
            error!("❌ Pipeline failed at stage '{}': {}", e.stage(), e);
            std::process::exit(1);
        }
    };

    info!("=== Pipeline Summary ===");
    info!(
        "📊 read={} deduplicated={} invalid={} enrichment_failed={} written={}",
        summary.rows_read,
        summary.rows_deduplicated,
        summary.rows_invalid,
        summary.rows_enrichment_failed,
        summary.rows_written
    );
    // machine-readable line for the surrounding service
    info!("summary={}", serde_json::to_string(&summary)?);

    if let Some(metric) = args.metric {
        let store = SqliteReviewStore::open(&config.store.path)?;
        let rows = Aggregator::new(&store, config.timeseries.granularity)
            .aggregate(metric, args.top_n)?;
        let written = Exporter::new(config.keywords.top_n)
            .export_aggregate(&rows, &config.export.aggregate_path)?;
        info!(
            "📈 Exported {} '{}' rows to {}",
            written,
            metric.as_str(),
            config.export.aggregate_path
        );
    }

    info!("🎉 Pipeline completed successfully");
    Ok(())
}

#[derive(Debug, Default)]
struct CliArgs {
    config_path: Option<String>,
    source: Option<String>,
    out: Option<String>,
    db: Option<String>,
    limit: Option<usize>,
    metric: Option<Metric>,
    top_n: Option<usize>,
}

impl CliArgs {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args;

        while let Some(flag) = args.next() {
            let mut value = |name: &str| -> Result<String> {
                args.next()
                    .with_context(|| format!("Missing value for {}", name))
            };
            match flag.as_str() {
                "--config" => parsed.config_path = Some(value("--config")?),
                "--source" => parsed.source = Some(value("--source")?),
                "--out" => parsed.out = Some(value("--out")?),
                "--db" => parsed.db = Some(value("--db")?),
                "--limit" => {
                    parsed.limit = Some(
                        value("--limit")?
                            .parse()
                            .context("--limit expects a number")?,
                    )
                }
                "--metric" => {
                    parsed.metric = Some(
                        value("--metric")?
                            .parse()
                            .map_err(|e: String| anyhow::anyhow!(e))?,
                    )
                }
                "--top-n" => {
                    parsed.top_n = Some(
                        value("--top-n")?
                            .parse()
                            .context("--top-n expects a number")?,
                    )
                }
                other => anyhow::bail!(
                    "Unknown argument: {} (expected --config, --source, --out, --db, --limit, --metric, --top-n)",
                    other
                ),
            }
        }

        Ok(parsed)
    }
}

fn load_config(path: Option<&str>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_file(p),
        None => {
            let default_path = "configs/pipeline.toml";
            if Path::new(default_path).exists() {
                PipelineConfig::from_file(default_path)
            } else {
                Ok(PipelineConfig::default())
            }
        }
    }
}

/// Precedence: CLI flags beat environment variables beat the config file.
fn apply_overrides(config: &mut PipelineConfig, args: &CliArgs) {
    if let Ok(path) = env::var("REVIEW_RAW_CSV") {
        config.input.path = path;
    }
    if let Ok(path) = env::var("REVIEW_DB_PATH") {
        config.store.path = path;
    }
    if let Ok(path) = env::var("REVIEW_EXPORT_CSV") {
        config.export.path = path;
    }

    if let Some(source) = &args.source {
        config.input.path = source.clone();
    }
    if let Some(out) = &args.out {
        config.export.path = out.clone();
    }
    if let Some(db) = &args.db {
        config.store.path = db.clone();
    }
    if let Some(limit) = args.limit {
        config.input.limit = Some(limit);
    }
}
