//! Slow record backend
//!
//! A decorator around any `RecordBackend` that adds variable delays to each
//! lookup, so the tree can be exercised against something that behaves like a
//! network data source. It can also be told to fail lookups for specific
//! parents and keeps call metrics for tests.

use super::backend::{Record, RecordBackend};
use crate::view::tree::NodeId;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Configuration for latency simulation
#[derive(Debug, Clone, Default)]
pub struct SlowBackendConfig {
    /// Minimum delay for every lookup
    pub latency: Duration,
    /// Upper bound of the extra, per-parent delay added on top of `latency`
    pub jitter: Duration,
    /// Fixed delays for individual parents, overriding latency and jitter
    pub parent_delays: HashMap<Option<NodeId>, Duration>,
}

impl SlowBackendConfig {
    /// Same delay for every lookup
    pub fn uniform(delay: Duration) -> Self {
        Self {
            latency: delay,
            ..Self::default()
        }
    }

    /// No delays (useful as a baseline)
    pub fn none() -> Self {
        Self::default()
    }

    /// Roughly what a remote API over a slow link feels like
    pub fn slow_network() -> Self {
        Self {
            latency: Duration::from_millis(300),
            jitter: Duration::from_millis(700),
            parent_delays: HashMap::new(),
        }
    }

    /// Override the delay for one parent
    pub fn with_parent_delay(mut self, parent: Option<NodeId>, delay: Duration) -> Self {
        self.parent_delays.insert(parent, delay);
        self
    }

    /// Delay applied to a lookup for `parent`
    ///
    /// The jitter part is derived from the parent id, so the same parent always
    /// sees the same delay while different parents finish in varying order.
    pub fn delay_for(&self, parent: Option<NodeId>) -> Duration {
        if let Some(delay) = self.parent_delays.get(&parent) {
            return *delay;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.latency;
        }
        let mut hasher = DefaultHasher::new();
        parent.hash(&mut hasher);
        self.latency + Duration::from_millis(hasher.finish() % (jitter_ms + 1))
    }
}

/// Metrics for backend lookups
#[derive(Debug, Clone, Default)]
pub struct BackendMetrics {
    /// Number of lookups per parent (`None` = root lookups)
    pub calls_per_parent: HashMap<Option<NodeId>, usize>,
    /// Number of lookups that were made to fail
    pub failures: usize,
    /// Total time spent in artificial delays
    pub total_delay_time: Duration,
}

impl BackendMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Total number of lookups
    pub fn total_calls(&self) -> usize {
        self.calls_per_parent.values().sum()
    }

    /// Number of lookups for the children of `id`
    pub fn calls_for(&self, id: NodeId) -> usize {
        self.calls_per_parent.get(&Some(id)).copied().unwrap_or(0)
    }
}

/// Slow record backend wrapper
pub struct SlowBackend {
    inner: Arc<dyn RecordBackend>,
    config: SlowBackendConfig,
    metrics: Arc<Mutex<BackendMetrics>>,
    failing: Mutex<HashSet<Option<NodeId>>>,
}

impl SlowBackend {
    pub fn new(inner: Arc<dyn RecordBackend>, config: SlowBackendConfig) -> Self {
        Self {
            inner,
            config,
            metrics: Arc::new(Mutex::new(BackendMetrics::new())),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_uniform_delay(inner: Arc<dyn RecordBackend>, delay: Duration) -> Self {
        Self::new(inner, SlowBackendConfig::uniform(delay))
    }

    pub fn config(&self) -> &SlowBackendConfig {
        &self.config
    }

    /// Make every later lookup for the children of `parent` fail
    pub async fn fail_parent(&self, parent: Option<NodeId>) {
        self.failing.lock().await.insert(parent);
    }

    /// Stop failing lookups for `parent`
    pub async fn heal_parent(&self, parent: Option<NodeId>) {
        self.failing.lock().await.remove(&parent);
    }

    /// Snapshot of current metrics
    pub async fn metrics(&self) -> BackendMetrics {
        self.metrics.lock().await.clone()
    }

    pub async fn reset_metrics(&self) {
        self.metrics.lock().await.reset();
    }

    /// Shared handle to the metrics, for observers outside the fetcher
    pub fn metrics_arc(&self) -> Arc<Mutex<BackendMetrics>> {
        Arc::clone(&self.metrics)
    }

    async fn add_delay(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
            self.metrics.lock().await.total_delay_time += delay;
        }
    }
}

#[async_trait]
impl RecordBackend for SlowBackend {
    async fn records_with_parent(&self, parent: Option<NodeId>) -> io::Result<Vec<Record>> {
        self.add_delay(self.config.delay_for(parent)).await;

        let failing = self.failing.lock().await.contains(&parent);
        {
            let mut metrics = self.metrics.lock().await;
            *metrics.calls_per_parent.entry(parent).or_insert(0) += 1;
            if failing {
                metrics.failures += 1;
            }
        }

        if failing {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "record source unavailable",
            ));
        }
        self.inner.records_with_parent(parent).await
    }
}
