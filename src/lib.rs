pub mod types;
pub mod error;
pub mod grade;
pub mod ranking;
pub mod snake;
pub mod handicap;
pub mod presets;
pub mod metadata;
pub mod setup;
pub mod finalize;
pub mod config;

pub use config::{load_config, load_preset_catalog, EngineConfig};
pub use error::{EngineError, EngineResult, Readiness};
pub use finalize::{finalize_round, qualifier_standings};
pub use grade::Grade;
pub use metadata::{build_metadata, MetadataOptions};
pub use presets::{PresetCatalog, PresetDefinition, PresetRound};
pub use ranking::{
    compare_qualifier_score, compare_stage_score, get_qualifier_result, get_stage_result,
    get_supplement_comparison,
};
pub use setup::{get_dependency_for_round, setup_round, StageRoster};
pub use types::*;

use std::{fs, path::Path};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// ── Logging ────────────────────────────────────────────────────────────

/// Installs a daily rolling `engine.log` in `log_dir`. Keep the returned
/// guard alive for as long as logs should be flushed.
pub fn init_tracing(log_dir: &Path, filter: &str) -> WorkerGuard {
    fs::create_dir_all(log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(log_dir, "engine.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    // A second install (tests, embedding hosts) keeps the existing subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init();
    guard
}
