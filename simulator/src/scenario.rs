//! Simulation scenarios.

use serde::{Deserialize, Serialize};

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Write provider records for the given days straight into the cache.
    SeedDays { base: String, dates: Vec<String> },
    /// Issue a history request and check the outcome.
    Request {
        base: String,
        start: String,
        end: String,
        page: Option<PageRequest>,
        expect: Expectation,
    },
    /// Switch the cache backend on or off.
    SetCacheAvailable { available: bool },
    /// Make the provider fail or recover.
    SetProviderFailing { failing: bool },
}

/// Page number and size of a paginated request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

/// What a request step must observe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expectation {
    /// Ranged provider calls issued by this request.
    pub fetches: u64,
    /// Expected outcome.
    pub outcome: Outcome,
}

/// Expected result of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Outcome {
    /// Success with this many records and this page count.
    Rates { count: usize, pages: u32 },
    /// Failure with this error code.
    Error { code: String },
}

impl Expectation {
    fn rates(fetches: u64, count: usize, pages: u32) -> Self {
        Self {
            fetches,
            outcome: Outcome::Rates { count, pages },
        }
    }

    fn error(fetches: u64, code: &str) -> Self {
        Self {
            fetches,
            outcome: Outcome::Error {
                code: code.to_string(),
            },
        }
    }
}

/// Names accepted by [`Scenario::load`].
pub const SCENARIOS: &[&str] = &[
    "cold-range",
    "partial-cache",
    "warm-repeat",
    "paginate",
    "cache-outage",
    "provider-outage",
];

const BASE: &str = "USD";
const START: &str = "2024-01-01";
const END: &str = "2024-01-05";

fn request(page: Option<(u32, u32)>, expect: Expectation) -> ScenarioStep {
    ScenarioStep::Request {
        base: BASE.to_string(),
        start: START.to_string(),
        end: END.to_string(),
        page: page.map(|(number, size)| PageRequest { number, size }),
        expect,
    }
}

impl Scenario {
    /// Load a scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "cold-range" => Ok(Self::cold_range()),
            "partial-cache" => Ok(Self::partial_cache()),
            "warm-repeat" => Ok(Self::warm_repeat()),
            "paginate" => Ok(Self::paginate()),
            "cache-outage" => Ok(Self::cache_outage()),
            "provider-outage" => Ok(Self::provider_outage()),
            _ => Err(anyhow::anyhow!(
                "Unknown scenario: {} (expected one of: {}, all)",
                name,
                SCENARIOS.join(", ")
            )),
        }
    }

    /// Five uncached days fetched with a single call.
    fn cold_range() -> Self {
        Self {
            name: "cold-range".to_string(),
            description: "Empty cache, one ranged fetch for the whole span".to_string(),
            steps: vec![request(None, Expectation::rates(1, 5, 1))],
        }
    }

    /// Cached days split the span into singleton gaps.
    fn partial_cache() -> Self {
        Self {
            name: "partial-cache".to_string(),
            description: "Days 2 and 4 cached, one fetch per remaining day".to_string(),
            steps: vec![
                ScenarioStep::SeedDays {
                    base: BASE.to_string(),
                    dates: vec!["2024-01-02".to_string(), "2024-01-04".to_string()],
                },
                request(None, Expectation::rates(3, 5, 1)),
            ],
        }
    }

    fn warm_repeat() -> Self {
        Self {
            name: "warm-repeat".to_string(),
            description: "Second identical request served without fetching".to_string(),
            steps: vec![
                request(None, Expectation::rates(1, 5, 1)),
                request(None, Expectation::rates(0, 5, 1)),
            ],
        }
    }

    fn paginate() -> Self {
        Self {
            name: "paginate".to_string(),
            description: "Five days in pages of two".to_string(),
            steps: vec![
                request(Some((1, 2)), Expectation::rates(1, 2, 3)),
                request(Some((2, 2)), Expectation::rates(0, 2, 3)),
                request(Some((3, 2)), Expectation::rates(0, 1, 3)),
                request(Some((4, 2)), Expectation::error(0, "PAGE_OUT_OF_RANGE")),
            ],
        }
    }

    fn cache_outage() -> Self {
        Self {
            name: "cache-outage".to_string(),
            description: "Cache failures surface as errors, never as misses".to_string(),
            steps: vec![
                ScenarioStep::SetCacheAvailable { available: false },
                request(None, Expectation::error(0, "CACHE_UNAVAILABLE")),
                ScenarioStep::SetCacheAvailable { available: true },
                request(None, Expectation::rates(1, 5, 1)),
            ],
        }
    }

    fn provider_outage() -> Self {
        Self {
            name: "provider-outage".to_string(),
            description: "Provider failure aborts the request with nothing paged".to_string(),
            steps: vec![
                ScenarioStep::SetProviderFailing { failing: true },
                request(Some((1, 2)), Expectation::error(1, "PROVIDER_UNAVAILABLE")),
                ScenarioStep::SetProviderFailing { failing: false },
                request(Some((3, 2)), Expectation::rates(1, 1, 3)),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_names_load() {
        for name in SCENARIOS {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(&scenario.name, name);
            assert!(!scenario.steps.is_empty());
        }
        assert!(Scenario::load("nope").is_err());
    }
}
