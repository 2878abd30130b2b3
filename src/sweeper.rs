//! Background Sweeper (§4.H): a cancellable `tokio` task that applies
//! time- and access-based expiry, reclassifies hot keys, and optionally
//! drives the Preload Hint Provider.

use bytes::Bytes;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::state::State;

/// A function returning preload suggestions, keyed by the hot key that
/// prompted them, each a list of `(key, value)` pairs to install if not
/// already resident. Registered once; called only when predictive
/// loading is enabled.
pub type PreloadHintProvider =
    Box<dyn Fn() -> FxHashMap<String, Vec<(String, Bytes)>> + Send + Sync>;

/// Handle to the running background sweep task.
///
/// Dropping this handle does not stop the task; call [`Sweeper::shutdown`]
/// to cancel and join it deterministically.
pub(crate) struct Sweeper {
    handle: JoinHandle<()>,
    cancel: Arc<Notify>,
}

impl Sweeper {
    /// Spawns the periodic sweep task on the current `tokio` runtime.
    ///
    /// `preload` is shared with the `Engine` so that a Preload Hint
    /// Provider can be registered (or swapped) after the sweeper has
    /// already started, per §6's "registered once" contract — the slot
    /// itself is long-lived, only its contents are set once in practice.
    pub(crate) fn spawn(
        state: Arc<Mutex<State>>,
        interval: Duration,
        preload: Arc<Mutex<Option<PreloadHintProvider>>>,
        enable_predictive_loading: Arc<std::sync::atomic::AtomicBool>,
    ) -> Self {
        let cancel = Arc::new(Notify::new());
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so the cache
            // gets one full interval before its first sweep.
            ticker.tick().await;

            loop {
                tokio::select! {
                    () = task_cancel.notified() => break,
                    _ = ticker.tick() => {
                        run_pass(
                            &state,
                            &preload,
                            enable_predictive_loading.load(std::sync::atomic::Ordering::Relaxed),
                        );
                    }
                }
            }
        });

        Self { handle, cancel }
    }

    /// Cancels the task and waits for its current pass (if any) to finish.
    pub(crate) async fn shutdown(self) {
        self.cancel.notify_one();
        let _ = self.handle.await;
    }
}

fn run_pass(
    state: &Arc<Mutex<State>>,
    preload: &Mutex<Option<PreloadHintProvider>>,
    predictive_loading_enabled: bool,
) {
    let expired = {
        let mut guard = state.lock();
        guard.sweep_pass()
    };

    if !expired.is_empty() {
        tracing::debug!(count = expired.len(), "sweeper expired entries");
    }

    if !predictive_loading_enabled {
        return;
    }

    let hints = {
        let provider = preload.lock();
        match provider.as_ref() {
            Some(provider) => provider(),
            None => return,
        }
    };

    let mut guard = state.lock();
    for suggestions in hints.values() {
        for (key, value) in suggestions {
            if let Err(e) = guard.install_if_absent(key, value) {
                if e.is_recoverable() {
                    tracing::warn!(error = %e, code = e.code(), key = %key, "preload install failed, will retry next pass");
                } else {
                    tracing::error!(error = %e, code = e.code(), key = %key, "preload install failed permanently");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AdaptiveParams;

    fn params() -> AdaptiveParams {
        AdaptiveParams {
            compression_threshold: 1024,
            compression_ratio_target: 0.7,
            hot_key_threshold: 2,
            enable_predictive_loading: false,
        }
    }

    #[tokio::test]
    async fn spawned_sweeper_runs_a_pass_and_shuts_down_cleanly() {
        let state = Arc::new(Mutex::new(State::new(1024, params())));
        {
            let mut guard = state.lock();
            guard.put("k", b"v", None).unwrap();
        }

        let flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let preload = Arc::new(Mutex::new(None));
        let sweeper = Sweeper::spawn(state.clone(), Duration::from_millis(10), preload, flag);

        tokio::time::sleep(Duration::from_millis(30)).await;
        sweeper.shutdown().await;

        assert!(state.lock().get("k").unwrap().is_some());
    }

    #[tokio::test]
    async fn preload_hints_are_installed_when_enabled() {
        let state = Arc::new(Mutex::new(State::new(1024, params())));
        let flag = Arc::new(std::sync::atomic::AtomicBool::new(true));

        let provider: PreloadHintProvider = Box::new(|| {
            let mut hints = FxHashMap::default();
            hints.insert(
                "hot".to_string(),
                vec![("preloaded".to_string(), Bytes::from_static(b"hint"))],
            );
            hints
        });
        let preload = Arc::new(Mutex::new(Some(provider)));

        let sweeper = Sweeper::spawn(state.clone(), Duration::from_millis(10), preload, flag);

        tokio::time::sleep(Duration::from_millis(30)).await;
        sweeper.shutdown().await;

        assert_eq!(
            state.lock().get("preloaded").unwrap().as_deref(),
            Some(b"hint".as_slice())
        );
    }
}
