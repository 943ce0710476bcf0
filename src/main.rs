//! job-watcher — single polling pass.
//! Loads the watch config, polls every source once, notifies about unseen
//! matches and persists the seen-set.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use job_watcher::config::load_config_default;
use job_watcher::metrics::{Metrics, ENV_METRICS_PATH};
use job_watcher::source::driver::{ChromeDriver, ChromeOptions};
use job_watcher::{watched_sources, NotifierMux, SeenStore, WatchError, Watcher};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status when there is nothing to do (no sources configured).
const EXIT_NOTHING_TO_DO: u8 = 2;

/// Compact logs by default; `WATCHER_LOG_FORMAT=json` for structured output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("job_watcher=info,warn"));

    let json = std::env::var("WATCHER_LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env when present; no-op otherwise.
    let _ = dotenvy::dotenv();
    init_tracing();

    let metrics_path = std::env::var(ENV_METRICS_PATH).ok().map(PathBuf::from);
    let metrics = match &metrics_path {
        Some(_) => match Metrics::init() {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "metrics disabled");
                None
            }
        },
        None => None,
    };

    let cfg = match load_config_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cannot load watch config");
            return ExitCode::from(EXIT_NOTHING_TO_DO);
        }
    };

    let driver = Arc::new(ChromeDriver::new(ChromeOptions {
        headless: cfg.browser.headless,
        user_agent: cfg.browser.user_agent.clone(),
        ..Default::default()
    }));

    let watcher = Watcher::new(
        watched_sources(&cfg, driver),
        NotifierMux::from_env(),
        SeenStore::from_env(),
    );

    let code = match watcher.run_once().await {
        Ok(summary) => {
            for s in summary.sources.iter().filter(|s| s.error.is_some()) {
                tracing::warn!(source = %s.name, "source failed this run");
            }
            tracing::info!(
                new_jobs = summary.new_jobs(),
                seen_total = summary.seen_total,
                persisted = summary.persisted,
                started_at = %summary.started_at.format("%H:%M:%S"),
                "run complete"
            );
            ExitCode::SUCCESS
        }
        Err(WatchError::NoSources) => {
            tracing::error!(
                "no sources configured (set {} or add config/watcher.toml)",
                job_watcher::config::ENV_CONFIG_PATH
            );
            ExitCode::from(EXIT_NOTHING_TO_DO)
        }
    };

    if let (Some(m), Some(path)) = (metrics, metrics_path) {
        if let Err(e) = m.write_textfile(&path) {
            tracing::warn!(error = %format!("{e:#}"), "metrics not written");
        }
    }

    code
}
