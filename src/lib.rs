//! # Adaptive Cache
//!
//! An in-process, adaptive key-value cache: bounded memory under
//! concurrent admission, multi-policy expiration (TTL/TTI/max-access),
//! hot-key-aware eviction, and size-adaptive DEFLATE compression of
//! stored payloads.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use adaptive_cache::{Engine, Policy};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = Engine::new(/* max_memory_mb */ 64, /* compression_threshold_kb */ 4);
//!
//! let policy = Policy::builder().with_ttl(Duration::from_secs(60));
//! engine.put("session:42", Bytes::from_static(b"payload"), Some(policy)).unwrap();
//!
//! assert_eq!(engine.get("session:42").unwrap().as_deref(), Some(b"payload".as_slice()));
//! engine.shutdown().await;
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod access_log;
mod arena;
mod batch;
mod codec;
pub mod config;
mod entry;
mod error;
mod hotset;
mod policy;
mod state;
mod sweeper;

mod engine;

pub use batch::Batch;
pub use config::{CacheConfig, ConfigError};
pub use engine::Engine;
pub use error::{Error, Result};
pub use policy::Policy;
pub use sweeper::PreloadHintProvider;
