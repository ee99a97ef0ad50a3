use call_queue::config::StoreConfig;
use call_queue::error::AppError;
use call_queue::queue::{CallQueueService, SqliteCallStore, StaticDirectory};
use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) type QueueService = CallQueueService<SqliteCallStore, SqliteCallStore, StaticDirectory>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the configured ledger, falling back to a throwaway in-memory database.
pub(crate) fn open_store(config: &StoreConfig) -> Result<Arc<SqliteCallStore>, AppError> {
    let store = match &config.database_path {
        Some(path) => {
            info!(path = %path.display(), "opening call list database");
            SqliteCallStore::open(path)?
        }
        None => {
            warn!("APP_DATABASE_PATH not set; call list will not survive a restart");
            SqliteCallStore::open_in_memory()?
        }
    };
    Ok(Arc::new(store))
}

pub(crate) fn load_directory(config: &StoreConfig) -> Result<Arc<StaticDirectory>, AppError> {
    let directory = match &config.directory_file {
        Some(path) => StaticDirectory::from_json_file(path)?,
        None => {
            warn!("APP_DIRECTORY_FILE not set; subject names and agents will be unavailable");
            StaticDirectory::default()
        }
    };
    Ok(Arc::new(directory))
}

pub(crate) fn build_service(config: &StoreConfig) -> Result<Arc<QueueService>, AppError> {
    let store = open_store(config)?;
    let directory = load_directory(config)?;
    Ok(Arc::new(CallQueueService::new(
        Arc::clone(&store),
        store,
        directory,
    )))
}

/// Accepts RFC 3339 timestamps, or a bare `YYYY-MM-DD` meaning midnight UTC.
pub(crate) fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("failed to parse '{raw}' as RFC 3339 or YYYY-MM-DD"))
}
