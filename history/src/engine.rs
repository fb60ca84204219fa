//! History engine: cached, paginated exchange-rate histories.

use std::sync::Arc;

use chrono::NaiveDate;
use fxhistory_common::{
    format_date, page_count, Currency, DateRange, ExchangeRate, ExchangeRateHistory,
    PaginationInfo, PaginationOptions,
};
use tracing::{debug, info, instrument};

use crate::backend::SharedCacheBackend;
use crate::backfill::BackfillOrchestrator;
use crate::config::EngineConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::keys::CacheKeyScheme;
use crate::metrics::{EngineMetrics, EngineStats};
use crate::pages::{slice_page, Page, PageStore};
use crate::provider::RateProvider;
use crate::registry::{ProviderRegistry, ProviderSelection};
use crate::segment::RangeSegmenter;

/// Request for a history of daily rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Base currency code, any case.
    pub base_currency: String,
    /// First day, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last day, `YYYY-MM-DD`, inclusive.
    pub end_date: String,
    /// Provider to use. `None` selects the default.
    pub provider_id: Option<String>,
    /// Page to return. `None` returns the whole range.
    pub pagination: Option<PaginationOptions>,
}

impl HistoryRequest {
    pub fn new(
        base_currency: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            provider_id: None,
            pagination: None,
        }
    }

    /// Create a request from calendar dates.
    pub fn for_dates(base_currency: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(base_currency, format_date(start), format_date(end))
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Request page `page_number` of `max_page_size` records. Bounds are
    /// checked when the request is served.
    pub fn with_pagination(mut self, page_number: u32, max_page_size: u32) -> Self {
        self.pagination = Some(PaginationOptions {
            page_number,
            max_page_size,
        });
        self
    }
}

/// Serves exchange-rate histories from cache, backfilling from providers.
pub struct HistoryEngine {
    registry: Arc<ProviderRegistry>,
    backend: SharedCacheBackend,
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl HistoryEngine {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        backend: SharedCacheBackend,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            backend,
            config,
            metrics: EngineMetrics::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        self.metrics.snapshot()
    }

    /// Get the history for a base currency over an inclusive date range.
    ///
    /// Cached days are reused; each uncached run is fetched with one ranged
    /// provider call and written through. Any provider or cache failure fails
    /// the whole request.
    #[instrument(skip(self, request), fields(
        base = %request.base_currency,
        start = %request.start_date,
        end = %request.end_date
    ))]
    pub async fn get_history(&self, request: HistoryRequest) -> HistoryResult<ExchangeRateHistory> {
        let result = self.serve_history(request).await;
        self.metrics.request_completed(result.is_ok());
        result
    }

    /// Get the latest published rates.
    ///
    /// Always asks the provider, since a newer publication may exist, then
    /// caches the record under its day so later histories reuse it.
    #[instrument(skip(self))]
    pub async fn get_latest(
        &self,
        base_currency: &str,
        provider_id: Option<&str>,
    ) -> HistoryResult<ExchangeRate> {
        let base = Currency::new(base_currency);
        let provider = self
            .registry
            .resolve(&ProviderSelection::from_optional(provider_id));
        let keys = CacheKeyScheme::new(provider.id().clone(), base);

        let rate = provider.get_latest(keys.base_currency()).await?;
        self.metrics.latest_fetched();

        let value =
            serde_json::to_string(&rate).map_err(|e| HistoryError::Serialization(e.to_string()))?;
        self.backend
            .set(&keys.day(rate.date), value, self.config.history_ttl)
            .await?;

        debug!(provider = %provider.id(), date = %rate.date, "Cached latest rates");
        Ok(rate)
    }

    async fn serve_history(&self, request: HistoryRequest) -> HistoryResult<ExchangeRateHistory> {
        let range = DateRange::parse(&request.start_date, &request.end_date)?;
        if range.len_days() > self.config.max_range_days {
            return Err(HistoryError::InvalidRange(format!(
                "{} spans {} days, at most {} allowed",
                range,
                range.len_days(),
                self.config.max_range_days
            )));
        }
        if let Some(pagination) = &request.pagination {
            pagination.validate()?;
        }

        let provider = self
            .registry
            .resolve(&ProviderSelection::from_optional(request.provider_id.as_deref()));
        let keys = CacheKeyScheme::new(provider.id().clone(), Currency::new(&request.base_currency));
        let store = PageStore::new(self.backend.as_ref());
        let logical = keys.range(range);

        if let Some(page) = self
            .stored_page(&store, &logical, request.pagination)
            .await?
        {
            debug!(group = %logical, "Serving stored page");
            self.metrics.page_hit();
            return Ok(history(&keys, range, page));
        }

        let rates = self.assemble(provider.as_ref(), &keys, range).await?;
        if rates.is_empty() {
            let page_number = request.pagination.map_or(1, |options| options.page_number);
            if page_number > 1 {
                return Err(HistoryError::PageOutOfRange {
                    requested: page_number,
                    total: 0,
                });
            }
            return Ok(history(
                &keys,
                range,
                Page {
                    values: Vec::new(),
                    info: PaginationInfo {
                        current_page_number: page_number,
                        current_page_size: 0,
                        page_count_total: 0,
                    },
                },
            ));
        }

        let page = match request.pagination {
            Some(options) => {
                store
                    .save(&logical, &rates, options.max_page_size, self.config.page_ttl)
                    .await?;
                self.metrics.page_saved();
                slice_page(&rates, options.max_page_size, options.page_number).ok_or(
                    HistoryError::PageOutOfRange {
                        requested: options.page_number,
                        total: page_count(rates.len(), options.max_page_size as usize) as u32,
                    },
                )?
            }
            None => {
                store.save_all(&logical, &rates, self.config.page_ttl).await?;
                self.metrics.page_saved();
                Page {
                    info: PaginationInfo::single_page(rates.len() as u32),
                    values: rates,
                }
            }
        };

        Ok(history(&keys, range, page))
    }

    /// Look up the requested page in the page store.
    ///
    /// Fails with `PageOutOfRange` when the group exists but has fewer pages
    /// than requested.
    async fn stored_page(
        &self,
        store: &PageStore<'_>,
        logical: &str,
        pagination: Option<PaginationOptions>,
    ) -> HistoryResult<Option<Page<ExchangeRate>>> {
        let Some(options) = pagination else {
            return store.get_all(logical).await;
        };

        if let Some(page) = store
            .get_page(logical, options.max_page_size, options.page_number)
            .await?
        {
            return Ok(Some(page));
        }

        let total = store.page_count(logical, options.max_page_size).await?;
        if total > 0 && options.page_number > total {
            return Err(HistoryError::PageOutOfRange {
                requested: options.page_number,
                total,
            });
        }
        Ok(None)
    }

    /// Segment the range against the per-day cache and backfill the gaps.
    async fn assemble(
        &self,
        provider: &dyn RateProvider,
        keys: &CacheKeyScheme,
        range: DateRange,
    ) -> HistoryResult<Vec<ExchangeRate>> {
        let backend = self.backend.as_ref();

        let segments = RangeSegmenter::new(backend, keys).segment(range).await?;
        let backfill = BackfillOrchestrator::new(provider, backend, keys, self.config.history_ttl)
            .with_parallel(self.config.parallel_backfill)
            .run(segments)
            .await?;

        self.metrics
            .backfilled(backfill.fetches, backfill.hit_days, backfill.fetched_days);
        info!(
            provider = %keys.provider(),
            range = %range,
            days = backfill.rates.len(),
            fetches = backfill.fetches,
            "Assembled history"
        );

        Ok(backfill.rates)
    }
}

fn history(keys: &CacheKeyScheme, range: DateRange, page: Page<ExchangeRate>) -> ExchangeRateHistory {
    ExchangeRateHistory {
        provider: keys.provider().clone(),
        base_currency: keys.base_currency().clone(),
        start_date: range.start(),
        end_date: range.end(),
        rates: page.values,
        pagination: page.info,
    }
}
