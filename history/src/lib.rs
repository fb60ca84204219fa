//! fxhistory Engine
//!
//! Cache-backed exchange-rate history engine. Given a base currency and an
//! inclusive date range it returns the daily rates in date order, reusing
//! cached days and fetching each uncached run from the provider with a
//! single ranged call.
//!
//! # Features
//!
//! - Range segmentation into cached days and maximal uncached runs
//! - Backfill with write-through of every fetched day
//! - Page store serving fixed-size pages of assembled histories
//! - Provider registry with default fallback
//! - Frankfurter HTTP provider
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxhistory_engine::{
//!     EngineConfig, FrankfurterConfig, FrankfurterProvider, HistoryEngine, HistoryRequest,
//!     InMemoryBackend, ProviderRegistry,
//! };
//!
//! let config = EngineConfig::from_env();
//! let provider = Arc::new(FrankfurterProvider::new(&FrankfurterConfig::from_env())?);
//! let registry = ProviderRegistry::new(vec![provider], config.default_provider.clone())?;
//! let engine = HistoryEngine::new(Arc::new(registry), Arc::new(InMemoryBackend::new()), config);
//!
//! let history = engine
//!     .get_history(HistoryRequest::new("USD", "2024-01-01", "2024-01-31").with_pagination(1, 10))
//!     .await?;
//! ```

pub mod backend;
pub mod backfill;
pub mod config;
pub mod engine;
pub mod error;
pub mod frankfurter;
pub mod keys;
pub mod metrics;
pub mod pages;
pub mod provider;
pub mod registry;
pub mod segment;

pub use backend::{CacheBackend, CacheStats, InMemoryBackend, SharedCacheBackend};
pub use backfill::{Backfill, BackfillOrchestrator};
pub use config::{EngineConfig, FrankfurterConfig};
pub use engine::{HistoryEngine, HistoryRequest};
pub use error::{HistoryError, HistoryResult};
pub use frankfurter::FrankfurterProvider;
pub use keys::{CacheKeyScheme, KeySelector, PageGroup, ParsedKey};
pub use metrics::{EngineMetrics, EngineStats};
pub use pages::{Page, PageStore};
pub use provider::RateProvider;
pub use registry::{ProviderRegistry, ProviderSelection};
pub use segment::{RangeSegmenter, Segment, SegmentBuilder};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
