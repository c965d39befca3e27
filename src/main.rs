//! CLI entry point for the POTA map engine.
//!
//! Provides subcommands for classifying park markers, counting QSOs per mode,
//! summing a park's activation history, and running either engine unit as a
//! JSON-lines worker over stdin/stdout.

use std::collections::{BTreeSet, HashSet};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use potamap_engine::{
    aggregator::{ModeCountCache, cache::DEFAULT_BATCH_SIZE, sum_mode_totals},
    classifier::{MarkerRequest, display::NEW_PARK_COLOR},
    clock::SystemClock,
    config::{FilterConfig, Settings},
    fetch::load_json_source,
    infra::pota::PotaClient,
    mode::ModeCounts,
    model::{
        ActivationEvent, ContactRecord, activated_references, decode_contacts, decode_parks,
        decode_records, index_spots,
    },
    output::{ModeCountRow, append_mode_counts, print_json, write_json},
    services::pota_api::PotaApi,
    worker::{MarkerWorker, QsoWorker, serve_marker_lines, serve_qso_lines},
};
use serde::Serialize;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "potamap_engine")]
#[command(about = "Marker classification and QSO aggregation for the POTA map", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide which parks get a marker and how each one is drawn
    Classify {
        /// Park list (file or URL), bare array or {"parks": [...]}
        #[arg(long, value_name = "FILE_OR_URL")]
        parks: String,

        /// Live spots (file or URL); defaults to the live API
        #[arg(long, value_name = "FILE_OR_URL")]
        spots: Option<String>,

        /// The user's activation records (file or URL)
        #[arg(long, value_name = "FILE_OR_URL")]
        user_activations: Option<String>,

        /// Saved filter configuration (JSON)
        #[arg(long)]
        filters: Option<String>,

        /// Where to write the decisions; stdout if omitted
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Count QSOs per park and mode bucket and append them to a CSV
    Count {
        /// Activation records (file or URL)
        #[arg(long, value_name = "FILE_OR_URL")]
        activations: String,

        /// Park list (file or URL)
        #[arg(long, value_name = "FILE_OR_URL")]
        parks: Option<String>,

        /// Park references to count; all parks if omitted
        #[arg(short, long = "reference")]
        references: Vec<String>,

        /// Maximum references per COMPUTE request
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// CSV file to append results to
        #[arg(short, long, default_value = "mode_counts.csv")]
        output: String,
    },
    /// Sum a park's activation history into per-mode totals
    ParkModes {
        /// Park reference, e.g. US-0001
        #[arg(short, long)]
        reference: String,
    },
    /// Serve one engine unit as a JSON-lines worker on stdin/stdout
    Worker {
        #[arg(value_enum)]
        kind: WorkerKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WorkerKind {
    Marker,
    Qso,
}

#[derive(Serialize)]
struct ParkModeTotals<'a> {
    reference: &'a str,
    activations: usize,
    totals: ModeCounts,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/potamap_engine.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("potamap_engine.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Classify {
            parks,
            spots,
            user_activations,
            filters,
            output,
        } => {
            classify(
                &settings,
                &parks,
                spots.as_deref(),
                user_activations.as_deref(),
                filters.as_deref(),
                output.as_deref(),
            )
            .await?;
        }
        Commands::Count {
            activations,
            parks,
            references,
            batch_size,
            output,
        } => {
            count(&activations, parks.as_deref(), references, batch_size, &output).await?;
        }
        Commands::ParkModes { reference } => {
            let client = PotaClient::from_settings(&settings)?;
            let history = client.park_activations(&reference).await?;
            let totals = sum_mode_totals(&history);

            print_json(&ParkModeTotals {
                reference: &reference,
                activations: history.len(),
                totals,
            })?;
        }
        Commands::Worker { kind } => {
            let stdin = BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();

            info!(?kind, "Worker listening on stdin");
            match kind {
                WorkerKind::Marker => {
                    let worker = MarkerWorker::spawn(Arc::new(SystemClock));
                    serve_marker_lines(stdin, stdout, &worker).await?;
                }
                WorkerKind::Qso => {
                    let worker = QsoWorker::spawn();
                    serve_qso_lines(stdin, stdout, &worker).await?;
                }
            }
        }
    }

    Ok(())
}

/// Loads parks, spots and the user's activations, then runs one
/// classification pass and writes the decisions.
#[tracing::instrument(skip(settings))]
async fn classify(
    settings: &Settings,
    parks: &str,
    spots: Option<&str>,
    user_activations: Option<&str>,
    filters: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    let parks = decode_parks(load_json_source(parks).await?);

    let spots: Vec<ActivationEvent> = match spots {
        Some(source) => decode_records(load_json_source(source).await?),
        None => PotaClient::from_settings(settings)?.list_spots().await?,
    };

    let records: Vec<ContactRecord> = match user_activations {
        Some(source) => decode_contacts(load_json_source(source).await?),
        None if settings.id_token.is_some() => {
            match PotaClient::from_settings(settings)?.user_activations().await {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "Could not fetch user activations, continuing without");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    let filters = match filters {
        Some(path) => FilterConfig::load(path)?,
        None => FilterConfig::default(),
    };

    let user_activated: HashSet<String> = activated_references(&records);
    let request = MarkerRequest {
        parks,
        user_activated_references: user_activated.clone(),
        spot_by_ref: index_spots(spots),
        pota_filters: filters.pota_filters,
        mode_filters: filters.mode_filters,
    };
    let total = request.parks.len();

    let worker = MarkerWorker::spawn(Arc::new(SystemClock));
    let decisions = worker.classify(request).await?;

    let active = decisions
        .iter()
        .filter(|d| d.state.current_activation.is_some())
        .count();
    let new = decisions
        .iter()
        .filter(|d| d.state.circle_opts.fill_color == NEW_PARK_COLOR)
        .count();
    let mine = decisions
        .iter()
        .filter(|d| user_activated.contains(&d.park.reference))
        .count();

    info!(
        parks = total,
        shown = decisions.len(),
        active,
        new,
        user_activated = mine,
        "Classification summary"
    );

    write_json(output, &decisions)
}

/// Initializes a QSO worker with the activation records and appends counts
/// for the requested references.
#[tracing::instrument(skip(references))]
async fn count(
    activations: &str,
    parks: Option<&str>,
    references: Vec<String>,
    batch_size: usize,
    output: &str,
) -> Result<()> {
    let activations = decode_contacts(load_json_source(activations).await?);
    let parks = match parks {
        Some(source) => decode_parks(load_json_source(source).await?),
        None => Vec::new(),
    };

    let references: Vec<String> = if !references.is_empty() {
        references
    } else if !parks.is_empty() {
        parks
            .iter()
            .map(|park| park.reference.clone())
            .filter(|reference| !reference.is_empty())
            .collect()
    } else {
        activations
            .iter()
            .filter_map(ContactRecord::resolved_reference)
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    info!(
        parks = parks.len(),
        activations = activations.len(),
        references = references.len(),
        "Initializing QSO worker"
    );

    let worker = QsoWorker::spawn();
    worker.init(parks, activations).await?;
    let mut cache = ModeCountCache::new();

    let computed = worker
        .compute_into(&mut cache, &references, batch_size)
        .await?;

    let rows: Vec<ModeCountRow> = references
        .iter()
        .map(|reference| ModeCountRow::new(reference.as_str(), &cache.get(reference)))
        .collect();
    append_mode_counts(output, &rows)?;

    info!(computed, rows = rows.len(), output, "Mode counts written");
    Ok(())
}
