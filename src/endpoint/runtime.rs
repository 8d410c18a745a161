//! Process-wide state shared by every endpoint of a service.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::config::HttpSettings;
use crate::observability::{HttpStats, ServiceIdentity, StatsRecorder};

/// Owns the counters, the stats backend, identity, and the live settings.
///
/// One per service process, shared via `Arc` by the router and every
/// invocation. Settings can be swapped while requests are in flight; each
/// invocation reads them once when it starts.
pub struct ServiceRuntime {
    settings: ArcSwap<HttpSettings>,
    stats: Arc<HttpStats>,
    recorder: Arc<dyn StatsRecorder>,
    identity: ServiceIdentity,
}

impl ServiceRuntime {
    pub fn new(
        settings: HttpSettings,
        identity: ServiceIdentity,
        recorder: Arc<dyn StatsRecorder>,
    ) -> Self {
        Self {
            settings: ArcSwap::from_pointee(settings),
            stats: Arc::new(HttpStats::new()),
            recorder,
            identity,
        }
    }

    pub fn settings(&self) -> HttpSettings {
        **self.settings.load()
    }

    pub fn update_settings(&self, settings: HttpSettings) {
        tracing::info!(
            default_timeout = ?settings.default_timeout,
            slow_threshold = ?settings.slow_threshold,
            "HTTP settings updated"
        );
        self.settings.store(Arc::new(settings));
    }

    pub fn stats(&self) -> &Arc<HttpStats> {
        &self.stats
    }

    pub fn recorder(&self) -> &Arc<dyn StatsRecorder> {
        &self.recorder
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }
}

impl std::fmt::Debug for ServiceRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRuntime")
            .field("settings", &self.settings())
            .field("stats", &self.stats.snapshot())
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
