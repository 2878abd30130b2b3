//! `Engine`: the public coordinator tying together the Entry Table,
//! Admission/Eviction, and the background Sweeper.

use bytes::Bytes;
use parking_lot::Mutex as SyncMutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::batch::Batch;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::policy::Policy;
use crate::state::{AdaptiveParams, State};
use crate::sweeper::{PreloadHintProvider, Sweeper};

/// The in-process adaptive cache.
///
/// A single [`Engine`] owns the Entry Table, Recency Order, Hot-Key
/// Set, and Access Log (jointly, [`crate::state::State`]), protected by
/// one exclusive lock, plus a background Sweeper task that runs at
/// `sweep_interval_ms` cadence. Construct one per logical cache; it is
/// not `Clone` — share it behind an `Arc` if multiple owners need it.
pub struct Engine {
    state: Arc<SyncMutex<State>>,
    sweeper: tokio::sync::Mutex<Option<Sweeper>>,
    preload: Arc<SyncMutex<Option<PreloadHintProvider>>>,
    predictive_loading: Arc<AtomicBool>,
    shut_down: AtomicBool,
}

impl Engine {
    /// Constructs an engine with a byte ceiling and compression
    /// threshold; every other knob takes its [`CacheConfig`] default.
    #[must_use]
    pub fn new(max_memory_mb: usize, compression_threshold_kb: usize) -> Self {
        let config = CacheConfig {
            max_memory_mb,
            compression_threshold_kb,
            ..CacheConfig::default()
        };
        Self::from_config(&config)
    }

    /// Constructs an engine from a fully-populated [`CacheConfig`],
    /// e.g. one loaded via [`CacheConfig::load`].
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let memory_limit = config.max_memory_mb * 1_048_576;
        let params = AdaptiveParams {
            compression_threshold: config.compression_threshold_kb * 1024,
            compression_ratio_target: config.compression_ratio_target,
            hot_key_threshold: config.hot_key_threshold,
            enable_predictive_loading: config.enable_predictive_loading,
        };

        let state = Arc::new(SyncMutex::new(State::new(memory_limit, params)));
        let preload = Arc::new(SyncMutex::new(None));
        let predictive_loading = Arc::new(AtomicBool::new(config.enable_predictive_loading));

        let sweeper = Sweeper::spawn(
            state.clone(),
            Duration::from_millis(config.sweep_interval_ms),
            preload.clone(),
            predictive_loading.clone(),
        );

        Self {
            state,
            sweeper: tokio::sync::Mutex::new(Some(sweeper)),
            preload,
            predictive_loading,
            shut_down: AtomicBool::new(false),
        }
    }

    /// §4.C `get`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if called after [`Engine::shutdown`].
    pub fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.check_alive()?;
        self.state.lock().get(key)
    }

    /// §4.C `put`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OverCapacity`] if the write cannot be admitted
    /// even after exhaustive eviction, or [`Error::Shutdown`] if called
    /// after [`Engine::shutdown`].
    pub fn put(&self, key: &str, value: Bytes, policy: Option<Policy>) -> Result<()> {
        self.check_alive()?;
        self.state.lock().put(key, &value, policy)
    }

    /// §4.B `refresh_policy`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if `key` is not resident, or
    /// [`Error::Shutdown`] if called after [`Engine::shutdown`].
    pub fn refresh_policy(&self, key: &str, policy: Policy) -> Result<()> {
        self.check_alive()?;
        self.state.lock().refresh_policy(key, policy)
    }

    /// Adjusts the adaptive runtime knobs without reconstructing the
    /// engine. Takes effect immediately for all subsequent operations
    /// and sweep passes.
    pub fn configure_adaptive_behavior(
        &self,
        hot_key_threshold: usize,
        enable_predictive_loading: bool,
        compression_ratio_target: f64,
    ) {
        let mut guard = self.state.lock();
        guard.params.hot_key_threshold = hot_key_threshold;
        guard.params.enable_predictive_loading = enable_predictive_loading;
        guard.params.compression_ratio_target = compression_ratio_target;
        drop(guard);
        self.predictive_loading
            .store(enable_predictive_loading, Ordering::Relaxed);
    }

    /// Registers the Preload Hint Provider consulted by the Sweeper
    /// when predictive loading is enabled. Replaces any previously
    /// registered provider.
    pub fn register_preload_hint_provider(&self, provider: PreloadHintProvider) {
        *self.preload.lock() = Some(provider);
    }

    /// §4.I: opens a scoped batch of buffered writes. Call
    /// [`Batch::commit`] to apply them atomically; dropping the batch
    /// without committing discards it.
    #[must_use]
    pub fn batch_operation(&self) -> Batch<'_> {
        Batch::new(&self.state)
    }

    /// Top-`n` keys by windowed access count, most-accessed first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shutdown`] if called after [`Engine::shutdown`].
    pub fn most_accessed(&self, n: usize) -> Result<Vec<(String, usize)>> {
        self.check_alive()?;
        Ok(self.state.lock().most_accessed(n))
    }

    /// Cancels the Sweeper task, waits for its in-flight pass (if any)
    /// to finish, and refuses all operations thereafter.
    ///
    /// Idempotent: calling this more than once is a no-op after the
    /// first call.
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Relaxed);
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
        }
    }

    fn check_alive(&self) -> Result<()> {
        if self.shut_down.load(Ordering::Relaxed) {
            return Err(Error::Shutdown);
        }
        Ok(())
    }
}
