//! Simulation controller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use serde::Serialize;
use tracing::info;

use fxhistory_common::{parse_date, Currency, ExchangeRateHistory};
use fxhistory_engine::{
    CacheBackend, CacheKeyScheme, EngineConfig, EngineStats, HistoryEngine, HistoryRequest,
    HistoryResult, InMemoryBackend, ProviderRegistry, RateProvider,
};

use crate::metrics::SimulationMetrics;
use crate::provider::SyntheticProvider;
use crate::scenario::{Expectation, Outcome, PageRequest, Scenario, ScenarioStep};

/// Result of one request step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub request: String,
    pub fetches: u64,
    pub outcome: String,
}

/// Result of a scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub description: String,
    pub steps: Vec<StepReport>,
    pub metrics: SimulationMetrics,
    pub engine: EngineStats,
}

/// Drives one engine over a fresh cache.
pub struct SimulationController {
    engine: HistoryEngine,
    provider: Arc<SyntheticProvider>,
    backend: Arc<InMemoryBackend>,
    metrics: SimulationMetrics,
}

impl SimulationController {
    /// Create a controller with an empty cache and a seeded provider.
    pub fn new(seed: u64, latency: Duration, parallel: bool) -> anyhow::Result<Self> {
        let provider = Arc::new(SyntheticProvider::new(seed, latency));
        let config = EngineConfig {
            default_provider: provider.id().clone(),
            parallel_backfill: parallel,
            ..EngineConfig::default()
        };
        config.validate().map_err(anyhow::Error::msg)?;

        let registry = ProviderRegistry::new(
            vec![provider.clone() as Arc<dyn RateProvider>],
            config.default_provider.clone(),
        )?;
        let backend = Arc::new(InMemoryBackend::new());

        Ok(Self {
            engine: HistoryEngine::new(Arc::new(registry), backend.clone(), config),
            provider,
            backend,
            metrics: SimulationMetrics::new(),
        })
    }

    /// Run a scenario, failing on the first unmet expectation.
    pub async fn run_scenario(mut self, scenario: Scenario) -> anyhow::Result<ScenarioReport> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        let mut reports = Vec::new();
        for (index, step) in scenario.steps.iter().enumerate() {
            if let Some(report) = self
                .execute_step(index + 1, step)
                .await
                .with_context(|| format!("scenario {} step {}", scenario.name, index + 1))?
            {
                reports.push(report);
            }
        }

        Ok(ScenarioReport {
            name: scenario.name,
            description: scenario.description,
            steps: reports,
            metrics: self.metrics,
            engine: self.engine.stats(),
        })
    }

    /// Execute a single scenario step.
    async fn execute_step(
        &mut self,
        index: usize,
        step: &ScenarioStep,
    ) -> anyhow::Result<Option<StepReport>> {
        match step {
            ScenarioStep::SeedDays { base, dates } => {
                let base = Currency::new(base);
                let keys = CacheKeyScheme::new(self.provider.id().clone(), base.clone());
                for date in dates {
                    let rate = self.provider.rate_for(&base, parse_date(date)?);
                    self.backend
                        .set(&keys.day(rate.date), serde_json::to_string(&rate)?, None)
                        .await?;
                }
                info!("Seeded {} cached days", dates.len());
                Ok(None)
            }
            ScenarioStep::SetCacheAvailable { available } => {
                info!("Cache available: {}", available);
                self.backend.set_available(*available);
                Ok(None)
            }
            ScenarioStep::SetProviderFailing { failing } => {
                info!("Provider failing: {}", failing);
                self.provider.set_failing(*failing);
                Ok(None)
            }
            ScenarioStep::Request {
                base,
                start,
                end,
                page,
                expect,
            } => {
                let mut request = HistoryRequest::new(base, start, end);
                if let Some(PageRequest { number, size }) = page {
                    request = request.with_pagination(*number, *size);
                }
                let label = describe(&request);

                let fetches_before = self.provider.fetch_count();
                let started = Instant::now();
                let result = self.engine.get_history(request).await;
                let elapsed = started.elapsed().as_micros() as u64;
                let fetches = self.provider.fetch_count() - fetches_before;

                self.metrics.record_request(result.is_ok(), elapsed);
                let outcome = check(&label, fetches, &result, expect)?;
                self.metrics.record_expectation_met();

                info!(
                    step = index,
                    request = %label,
                    fetches,
                    latency_us = elapsed,
                    "{}",
                    outcome
                );

                Ok(Some(StepReport {
                    step: index,
                    request: label,
                    fetches,
                    outcome,
                }))
            }
        }
    }
}

fn describe(request: &HistoryRequest) -> String {
    let mut label = format!(
        "{} {}..{}",
        request.base_currency, request.start_date, request.end_date
    );
    if let Some(page) = &request.pagination {
        label.push_str(&format!(" page {}/{}", page.page_number, page.max_page_size));
    }
    label
}

/// Compare a request result with its expectation.
fn check(
    label: &str,
    fetches: u64,
    result: &HistoryResult<ExchangeRateHistory>,
    expect: &Expectation,
) -> anyhow::Result<String> {
    if fetches != expect.fetches {
        bail!(
            "{}: expected {} provider fetches, observed {}",
            label,
            expect.fetches,
            fetches
        );
    }

    match (result, &expect.outcome) {
        (Ok(history), Outcome::Rates { count, pages }) => {
            if !history.is_sorted() {
                bail!("{}: rates out of date order", label);
            }
            if history.rates.len() != *count || history.pagination.page_count_total != *pages {
                bail!(
                    "{}: expected {} rates over {} pages, got {} over {}",
                    label,
                    count,
                    pages,
                    history.rates.len(),
                    history.pagination.page_count_total
                );
            }
            Ok(format!(
                "{} rates, page {} of {}",
                history.rates.len(),
                history.pagination.current_page_number,
                history.pagination.page_count_total
            ))
        }
        (Err(err), Outcome::Error { code }) if err.error_code() == code.as_str() => Ok(err.to_string()),
        (Err(err), expected) => bail!("{}: expected {:?}, got error {}", label, expected, err),
        (Ok(history), expected) => bail!(
            "{}: expected {:?}, got {} rates",
            label,
            expected,
            history.rates.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::SCENARIOS;

    #[tokio::test]
    async fn test_every_scenario_passes() {
        for name in SCENARIOS {
            let controller = SimulationController::new(42, Duration::ZERO, true).unwrap();
            let report = controller
                .run_scenario(Scenario::load(name).unwrap())
                .await
                .unwrap();

            assert_eq!(report.metrics.expectations_met, report.steps.len() as u64);
        }
    }

    #[tokio::test]
    async fn test_sequential_backfill_passes() {
        let controller = SimulationController::new(42, Duration::ZERO, false).unwrap();
        controller
            .run_scenario(Scenario::load("partial-cache").unwrap())
            .await
            .unwrap();
    }
}
