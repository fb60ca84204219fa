//! Partitioning a date range into cached and uncached runs.

use chrono::NaiveDate;
use futures::future::try_join_all;
use fxhistory_common::{DateRange, ExchangeRate};
use tracing::{debug, warn};

use crate::backend::CacheBackend;
use crate::error::HistoryResult;
use crate::keys::CacheKeyScheme;

/// Value stored under a day key when the provider published nothing for it.
pub const NO_PUBLICATION: &str = "no-publication";

/// A contiguous run of days classified as cached or uncached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A single cached day.
    Hit(ExchangeRate),
    /// A single day the provider is known not to publish.
    Closed(NaiveDate),
    /// A maximal run of uncached days.
    Miss(DateRange),
}

impl Segment {
    pub fn start(&self) -> NaiveDate {
        match self {
            Segment::Hit(rate) => rate.date,
            Segment::Closed(date) => *date,
            Segment::Miss(range) => range.start(),
        }
    }

    pub fn end(&self) -> NaiveDate {
        match self {
            Segment::Hit(rate) => rate.date,
            Segment::Closed(date) => *date,
            Segment::Miss(range) => range.end(),
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Segment::Hit(_))
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Segment::Miss(_))
    }
}

/// Accumulates per-day hit/miss observations, fed in ascending date order.
///
/// A hit or closed day always closes the pending miss run; runs are never
/// merged across an intervening cached day.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    segments: Vec<Segment>,
    pending_miss: Option<(NaiveDate, NaiveDate)>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cached day.
    pub fn push_hit(&mut self, rate: ExchangeRate) {
        self.close_miss();
        self.segments.push(Segment::Hit(rate));
    }

    /// Record a cached no-publication day.
    pub fn push_closed(&mut self, date: NaiveDate) {
        self.close_miss();
        self.segments.push(Segment::Closed(date));
    }

    /// Record an uncached day.
    pub fn push_miss(&mut self, date: NaiveDate) {
        self.pending_miss = match self.pending_miss {
            Some((first, _)) => Some((first, date)),
            None => Some((date, date)),
        };
    }

    /// Close any trailing miss run and return the segments.
    pub fn finish(mut self) -> Vec<Segment> {
        self.close_miss();
        self.segments
    }

    fn close_miss(&mut self) {
        // Days arrive in ascending order, so `first <= last` always holds.
        if let Some((first, last)) = self.pending_miss.take() {
            if let Ok(run) = DateRange::new(first, last) {
                self.segments.push(Segment::Miss(run));
            }
        }
    }
}

/// Walks a range against the per-day cache namespace.
pub struct RangeSegmenter<'a> {
    backend: &'a dyn CacheBackend,
    keys: &'a CacheKeyScheme,
}

impl<'a> RangeSegmenter<'a> {
    pub fn new(backend: &'a dyn CacheBackend, keys: &'a CacheKeyScheme) -> Self {
        Self { backend, keys }
    }

    /// Segment `range`, covering every day exactly once in ascending order.
    ///
    /// Backend failures are returned as errors, never read as misses.
    pub async fn segment(&self, range: DateRange) -> HistoryResult<Vec<Segment>> {
        let lookups = range.days().map(|day| self.lookup(day));
        let cached = try_join_all(lookups).await?;

        let mut builder = SegmentBuilder::new();
        for (day, cached) in range.days().zip(cached) {
            match cached {
                CachedDay::Rate(rate) => builder.push_hit(rate),
                CachedDay::Closed => builder.push_closed(day),
                CachedDay::Missing => builder.push_miss(day),
            }
        }

        let segments = builder.finish();
        debug!(
            range = %range,
            segments = segments.len(),
            misses = segments.iter().filter(|s| s.is_miss()).count(),
            "Segmented range"
        );
        Ok(segments)
    }

    async fn lookup(&self, day: NaiveDate) -> HistoryResult<CachedDay> {
        let key = self.keys.day(day);
        let Some(raw) = self.backend.get(&key).await? else {
            return Ok(CachedDay::Missing);
        };
        if raw == NO_PUBLICATION {
            return Ok(CachedDay::Closed);
        }

        match serde_json::from_str::<ExchangeRate>(&raw) {
            Ok(rate) if rate.date == day => Ok(CachedDay::Rate(rate)),
            Ok(rate) => {
                warn!(key = %key, stored_date = %rate.date, "Cached record date mismatch, refetching");
                Ok(CachedDay::Missing)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Corrupt cached record, refetching");
                Ok(CachedDay::Missing)
            }
        }
    }
}

enum CachedDay {
    Rate(ExchangeRate),
    Closed,
    Missing,
}
