//! Pipeline and publishing metrics.
//!
//! Counters are mirrored to the `metrics` facade for the exporter and kept
//! in owned atomics so engines can expose a snapshot without a scrape.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::Serialize;

use crate::decision::router::Route;

const LATENCY_WINDOW: usize = 1024;

#[derive(Default)]
pub struct PipelineMetrics {
    decisions_total: AtomicU64,
    auto_responses: AtomicU64,
    suggestions: AtomicU64,
    human_reviews: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    timeouts: AtomicU64,
    capacity_rejections: AtomicU64,
    validation_failures: AtomicU64,
    latencies_ms: Mutex<VecDeque<f64>>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_decision(&self, route: Route, elapsed_ms: f64, validation_passed: bool) {
        self.decisions_total.fetch_add(1, Ordering::Relaxed);
        match route {
            Route::AutoResponse => self.auto_responses.fetch_add(1, Ordering::Relaxed),
            Route::Suggestion => self.suggestions.fetch_add(1, Ordering::Relaxed),
            Route::HumanReview => self.human_reviews.fetch_add(1, Ordering::Relaxed),
        };
        if !validation_passed {
            self.validation_failures.fetch_add(1, Ordering::Relaxed);
        }

        let mut latencies = self.latencies_ms.lock();
        if latencies.len() >= LATENCY_WINDOW {
            latencies.pop_front();
        }
        latencies.push_back(elapsed_ms);
        drop(latencies);

        counter!("pulsebot_decisions_total", 1, "route" => route.as_str());
        histogram!("pulsebot_decision_latency_ms", elapsed_ms);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_decision_cache_hits_total", 1);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_decision_cache_misses_total", 1);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_decision_timeouts_total", 1);
    }

    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_decision_capacity_rejections_total", 1);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        let latencies = self.latencies_ms.lock();
        let mut sorted: Vec<f64> = latencies.iter().copied().collect();
        drop(latencies);
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        PipelineSnapshot {
            decisions_total: self.decisions_total.load(Ordering::Relaxed),
            auto_responses: self.auto_responses.load(Ordering::Relaxed),
            suggestions: self.suggestions.load(Ordering::Relaxed),
            human_reviews: self.human_reviews.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            capacity_rejections: self.capacity_rejections.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            latency_p50_ms: percentile(&sorted, 0.50),
            latency_p95_ms: percentile(&sorted, 0.95),
            latency_max_ms: sorted.last().copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSnapshot {
    pub decisions_total: u64,
    pub auto_responses: u64,
    pub suggestions: u64,
    pub human_reviews: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub timeouts: u64,
    pub capacity_rejections: u64,
    pub validation_failures: u64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_max_ms: f64,
}

#[derive(Default)]
pub struct PublishingMetrics {
    published: AtomicU64,
    partial: AtomicU64,
    failed: AtomicU64,
    retries: AtomicU64,
    notifications_sent: AtomicU64,
    validation_rejections: AtomicU64,
}

impl PublishingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_publishes_total", 1, "outcome" => "published");
    }

    pub fn record_partial(&self) {
        self.partial.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_publishes_total", 1, "outcome" => "partial");
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_publishes_total", 1, "outcome" => "failed");
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_publish_retries_total", 1);
    }

    pub fn record_validation_rejection(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_publish_validation_rejections_total", 1);
    }

    pub fn record_notification(&self, kind: &'static str) {
        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
        counter!("pulsebot_notifications_total", 1, "type" => kind);
    }

    pub fn snapshot(&self) -> PublishingSnapshot {
        PublishingSnapshot {
            published: self.published.load(Ordering::Relaxed),
            partial: self.partial.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            validation_rejections: self.validation_rejections.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishingSnapshot {
    pub published: u64,
    pub partial: u64,
    pub failed: u64,
    pub retries: u64,
    pub notifications_sent: u64,
    pub validation_rejections: u64,
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = ((sorted.len() as f64 * q).ceil() as usize).saturating_sub(1);
    sorted[index.min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_snapshot_counts() {
        let metrics = PipelineMetrics::new();
        metrics.record_decision(Route::AutoResponse, 12.0, true);
        metrics.record_decision(Route::HumanReview, 48.0, false);
        metrics.record_cache_hit();
        metrics.record_timeout();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.decisions_total, 2);
        assert_eq!(snapshot.auto_responses, 1);
        assert_eq!(snapshot.human_reviews, 1);
        assert_eq!(snapshot.validation_failures, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert_eq!(snapshot.timeouts, 1);
        assert_eq!(snapshot.latency_max_ms, 48.0);
    }

    #[test]
    fn percentile_of_small_windows() {
        assert_eq!(percentile(&[], 0.95), 0.0);
        assert_eq!(percentile(&[5.0], 0.95), 5.0);
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&sorted, 0.5), 5.0);
        assert_eq!(percentile(&sorted, 0.95), 10.0);
    }
}
