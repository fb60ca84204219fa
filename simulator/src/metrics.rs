//! Simulation metrics.

use std::collections::VecDeque;

use serde::Serialize;

/// Request outcomes and latencies observed during a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationMetrics {
    /// History requests issued.
    pub total_requests: u64,
    /// Requests that returned rates.
    pub successful_requests: u64,
    /// Requests that returned an error.
    pub failed_requests: u64,
    /// Request steps whose expectation held.
    pub expectations_met: u64,
    /// Latency samples (us).
    #[serde(skip)]
    latency_samples: VecDeque<u64>,
    /// Maximum samples to keep.
    #[serde(skip)]
    max_samples: usize,
}

impl SimulationMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self {
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            expectations_met: 0,
            latency_samples: VecDeque::with_capacity(1024),
            max_samples: 1024,
        }
    }

    /// Record a finished request.
    pub fn record_request(&mut self, ok: bool, latency_us: u64) {
        self.total_requests += 1;
        if ok {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }

        if self.latency_samples.len() >= self.max_samples {
            self.latency_samples.pop_front();
        }
        self.latency_samples.push_back(latency_us);
    }

    pub fn record_expectation_met(&mut self) {
        self.expectations_met += 1;
    }

    /// Get average latency in us.
    pub fn average_latency_us(&self) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let sum: u64 = self.latency_samples.iter().sum();
        sum / self.latency_samples.len() as u64
    }

    /// Get p99 latency in us.
    pub fn p99_latency_us(&self) -> u64 {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> u64 {
        if self.latency_samples.is_empty() {
            return 0;
        }

        let mut sorted: Vec<_> = self.latency_samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for SimulationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_request(true, 100);
        metrics.record_request(true, 200);
        metrics.record_request(false, 150);
        metrics.record_expectation_met();

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.expectations_met, 1);
        assert_eq!(metrics.average_latency_us(), 150);
        assert_eq!(metrics.p99_latency_us(), 200);
    }
}
