//! Hot reload of the service configuration file.
//!
//! Only [`HttpSettings`] can change at runtime. Edits to anything else are
//! reported and otherwise wait for a restart.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{HttpSettings, ServiceConfig};

/// What a freshly loaded file means for the running service.
#[derive(Debug, Clone, PartialEq)]
pub enum ReloadOutcome {
    /// Reloadable settings changed; forward the config.
    Apply,
    /// Nothing the running service reads has changed.
    Unchanged,
    /// Only startup settings changed; these are ignored until restart.
    RestartRequired(Vec<&'static str>),
}

/// Compare a newly loaded config with the one currently in effect.
pub fn reload_outcome(current: &ServiceConfig, next: &ServiceConfig) -> ReloadOutcome {
    if current.http.settings() != next.http.settings() {
        return ReloadOutcome::Apply;
    }

    let mut fixed = Vec::new();
    if current.listener.bind_address != next.listener.bind_address {
        fixed.push("listener.bind_address");
    }
    if current.http.internal_prefix != next.http.internal_prefix {
        fixed.push("http.internal_prefix");
    }
    if current.http.max_body_bytes != next.http.max_body_bytes {
        fixed.push("http.max_body_bytes");
    }
    if current.service.name != next.service.name {
        fixed.push("service.name");
    }

    if fixed.is_empty() {
        ReloadOutcome::Unchanged
    } else {
        ReloadOutcome::RestartRequired(fixed)
    }
}

/// Watches one config file and sends reloadable updates.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ServiceConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for the HTTP server.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ServiceConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. `current` is the config the service started with.
    /// Dropping the returned watcher stops reloads.
    pub fn run(self, current: ServiceConfig) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        // Editors often replace the file, so watch its directory.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(ToOwned::to_owned);
        let watched = path.clone();
        let mut in_effect = current;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "Config watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let touches_file = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(ToOwned::to_owned) == file_name);
                if !touches_file {
                    return;
                }

                let next = match load_config(&watched) {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::error!(
                            path = ?watched,
                            error = %e,
                            "Config reload failed; keeping current settings"
                        );
                        return;
                    }
                };

                match reload_outcome(&in_effect, &next) {
                    ReloadOutcome::Apply => {
                        let HttpSettings {
                            default_timeout,
                            slow_threshold,
                        } = next.http.settings();
                        tracing::info!(
                            default_timeout = ?default_timeout,
                            slow_threshold = ?slow_threshold,
                            "Config change detected; applying HTTP settings"
                        );
                        // Keep startup-only fields as they were.
                        in_effect.http.timeout_secs = next.http.timeout_secs;
                        in_effect.http.slow_api_threshold_secs = next.http.slow_api_threshold_secs;
                        let _ = update_tx.send(next);
                    }
                    ReloadOutcome::Unchanged => {
                        tracing::debug!("Config file touched without effective changes");
                    }
                    ReloadOutcome::RestartRequired(fields) => {
                        tracing::warn!(
                            fields = %fields.join(","),
                            "Config change needs a restart to take effect"
                        );
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}
