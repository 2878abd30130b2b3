//! Integration-style scenarios exercising the Sweeper's real timing
//! behavior against the public `Engine` surface.

use adaptive_cache::{CacheConfig, Engine, Policy};
use bytes::Bytes;
use std::time::Duration;

fn fast_sweep_config() -> CacheConfig {
    CacheConfig {
        max_memory_mb: 16,
        compression_threshold_kb: 4,
        sweep_interval_ms: 50,
        ..CacheConfig::default()
    }
}

#[tokio::test]
async fn scenario_s3_hot_key_is_protected_across_a_sweep() {
    let config = CacheConfig {
        hot_key_threshold: 1,
        ..fast_sweep_config()
    };
    let engine = Engine::from_config(&config);

    engine.put("h", Bytes::from_static(b"hot"), None).unwrap();
    engine.get("h").unwrap();
    engine.get("h").unwrap();

    // Let the Sweeper observe the access count and promote "h" to hot.
    tokio::time::sleep(Duration::from_millis(120)).await;

    // Fill with cold writes into a tiny-limit engine sharing the same
    // state shape: re-derive eviction behavior by driving enough cold
    // writes to force eviction pressure on the 16 MB engine would be
    // impractical here, so this scenario is exercised at the `State`
    // level in `state.rs` (`hot_keys_are_protected_from_eviction_until_forced`)
    // and here we only assert the Sweeper actually promoted "h".
    let top = engine.most_accessed(1).unwrap();
    assert_eq!(top.first().map(|(k, _)| k.as_str()), Some("h"));

    engine.shutdown().await;
}

#[tokio::test]
async fn scenario_s5_max_access_expiry() {
    let engine = Engine::from_config(&fast_sweep_config());
    let policy = Policy::builder().with_max_access(3);
    engine
        .put("k", Bytes::from_static(b"v"), Some(policy))
        .unwrap();

    engine.get("k").unwrap();
    engine.get("k").unwrap();
    engine.get("k").unwrap();

    // Give the Sweeper a pass to observe the threshold being met.
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(engine.get("k").unwrap(), None);
    engine.shutdown().await;
}

#[tokio::test]
async fn scenario_s6_large_payload_is_compressed_and_round_trips() {
    let engine = Engine::from_config(&CacheConfig {
        compression_threshold_kb: 1,
        compression_ratio_target: 0.7,
        ..fast_sweep_config()
    });

    let payload = vec![b'a'; 100 * 1024];
    engine
        .put("k", Bytes::from(payload.clone()), None)
        .unwrap();

    let got = engine.get("k").unwrap().expect("resident");
    assert_eq!(got.as_ref(), payload.as_slice());

    engine.shutdown().await;
}

#[tokio::test]
async fn preload_hint_provider_installs_suggestions_during_a_sweep() {
    let engine = Engine::from_config(&CacheConfig {
        enable_predictive_loading: true,
        ..fast_sweep_config()
    });

    engine.register_preload_hint_provider(Box::new(|| {
        let mut hints = rustc_hash::FxHashMap::default();
        hints.insert(
            "h".to_string(),
            vec![("preloaded".to_string(), Bytes::from_static(b"hint"))],
        );
        hints
    }));

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(
        engine.get("preloaded").unwrap().as_deref(),
        Some(b"hint".as_slice())
    );
    engine.shutdown().await;
}
