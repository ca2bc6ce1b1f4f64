//! Topic clustering and trend detection.
//!
//! Stateful: retains a rolling event history, DBSCAN-clusters each incoming
//! batch over TF-IDF/platform/time/engagement features, merges new clusters
//! into known ones, and reports trending topics and volume spikes against a
//! baseline window. Cluster sentiment is aggregated from the sentiment
//! analyzer, never sampled.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::sentiment::SentimentAnalyzer;
use crate::clock::SharedClock;
use crate::config::{DistanceMetric, TopicsConfig};
use crate::models::{Platform, SocialEvent};

const CLUSTER_MERGE_THRESHOLD: f64 = 0.7;
const CLUSTER_STALE_HOURS: i64 = 24;
const SPIKE_STALE_HOURS: i64 = 6;

const STOPWORDS: [&str; 24] = [
    "the", "a", "an", "is", "was", "are", "be", "to", "of", "and", "or", "in", "on", "at", "it",
    "this", "that", "i", "my", "me", "for", "with", "you", "so",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicCluster {
    pub id: String,
    /// Top-3 keywords joined
    pub label: String,
    pub keywords: Vec<String>,
    /// Mean pairwise Jaccard similarity of member texts
    pub coherence: f64,
    /// Mean sentiment score over member events
    pub sentiment_score: f64,
    pub event_count: usize,
    pub platforms: Vec<Platform>,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip)]
    centroid: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingTopic {
    pub cluster_id: String,
    pub label: String,
    pub growth_rate: f64,
    pub event_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicSpike {
    pub topic: String,
    pub intensity: f64,
    pub current_count: usize,
    pub baseline_count: usize,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicBatchOutcome {
    pub clusters: Vec<TopicCluster>,
    pub trending: Vec<TrendingTopic>,
    pub spikes: Vec<TopicSpike>,
}

#[derive(Debug, Clone)]
struct StoredEvent {
    timestamp: DateTime<Utc>,
    tokens: HashSet<String>,
    cluster_id: Option<String>,
    topic_key: Option<String>,
}

pub struct TopicEngine {
    config: TopicsConfig,
    clock: SharedClock,
    sentiment: Arc<SentimentAnalyzer>,
    history: VecDeque<StoredEvent>,
    clusters: Vec<TopicCluster>,
    spikes: Vec<TopicSpike>,
}

impl TopicEngine {
    pub fn new(config: TopicsConfig, clock: SharedClock, sentiment: Arc<SentimentAnalyzer>) -> Self {
        Self {
            config,
            clock,
            sentiment,
            history: VecDeque::new(),
            clusters: Vec::new(),
            spikes: Vec::new(),
        }
    }

    /// Cluster a batch and refresh trends and spikes.
    pub async fn process(&mut self, batch: &[SocialEvent]) -> TopicBatchOutcome {
        let now = self.clock.now();
        self.evict(now);

        if !batch.is_empty() {
            self.cluster_batch(batch, now).await;
        }

        let trending = self.detect_trending(now);
        self.detect_spikes(now);

        TopicBatchOutcome {
            clusters: self.clusters.clone(),
            trending,
            spikes: self.spikes.clone(),
        }
    }

    pub fn clusters(&self) -> &[TopicCluster] {
        &self.clusters
    }

    async fn cluster_batch(&mut self, batch: &[SocialEvent], now: DateTime<Utc>) {
        let features: Vec<Vec<f64>> = extract_features(batch, &self.config.vocabulary);
        let labels = dbscan(
            &features,
            self.config.epsilon,
            self.config.min_points,
            self.config.metric,
        );

        let sentiments = self.sentiment.analyze_batch(batch).await;

        let mut by_cluster: HashMap<usize, Vec<usize>> = HashMap::new();
        for (index, label) in labels.iter().enumerate() {
            if let Some(cluster) = label {
                by_cluster.entry(*cluster).or_default().push(index);
            }
        }

        let mut assigned: HashMap<usize, String> = HashMap::new();
        let mut cluster_ids: Vec<usize> = by_cluster.keys().copied().collect();
        cluster_ids.sort_unstable();

        for cluster_index in cluster_ids {
            let members = &by_cluster[&cluster_index];
            let member_events: Vec<&SocialEvent> =
                members.iter().map(|&i| &batch[i]).collect();

            let keywords = top_keywords(&member_events, self.config.cluster_keywords);
            let label = keywords
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            let coherence = mean_pairwise_jaccard(&member_events);
            let sentiment_score = if members.is_empty() {
                0.0
            } else {
                members
                    .iter()
                    .map(|&i| sentiments[i].overall.score)
                    .sum::<f64>()
                    / members.len() as f64
            };
            let centroid = centroid_of(members.iter().map(|&i| &features[i]));
            let platforms = {
                let mut set: Vec<Platform> = member_events
                    .iter()
                    .map(|e| e.platform)
                    .collect::<HashSet<_>>()
                    .into_iter()
                    .collect();
                set.sort_by_key(|p| p.as_str());
                set
            };

            let candidate = TopicCluster {
                id: Uuid::new_v4().to_string(),
                label,
                keywords,
                coherence,
                sentiment_score,
                event_count: members.len(),
                platforms,
                first_seen: now,
                last_updated: now,
                centroid,
            };

            let merged_id = self.merge_or_insert(candidate, members.len(), now);
            assigned.insert(cluster_index, merged_id);
        }

        for (index, event) in batch.iter().enumerate() {
            let cluster_id = labels[index].and_then(|c| assigned.get(&c).cloned());
            let tokens = tokenize(&event.content.text);
            let topic_key = topic_key_of(&tokens, &self.config.vocabulary);
            self.history.push_back(StoredEvent {
                timestamp: event.timestamp,
                tokens,
                cluster_id,
                topic_key,
            });
        }
    }

    /// Merge a freshly built cluster into an existing one when similar
    /// enough, otherwise keep it as new. Returns the surviving cluster id.
    fn merge_or_insert(
        &mut self,
        candidate: TopicCluster,
        new_events: usize,
        now: DateTime<Utc>,
    ) -> String {
        let mut best: Option<(usize, f64)> = None;
        for (index, existing) in self.clusters.iter().enumerate() {
            let similarity = cluster_similarity(existing, &candidate);
            if similarity > CLUSTER_MERGE_THRESHOLD
                && best.map(|(_, s)| similarity > s).unwrap_or(true)
            {
                best = Some((index, similarity));
            }
        }

        match best {
            Some((index, _)) => {
                let existing = &mut self.clusters[index];
                let total = existing.event_count + new_events;
                let old_share = existing.event_count as f64 / total as f64;
                let new_share = new_events as f64 / total as f64;

                existing.sentiment_score =
                    existing.sentiment_score * old_share + candidate.sentiment_score * new_share;
                existing.coherence =
                    existing.coherence * old_share + candidate.coherence * new_share;
                for (dim, value) in existing.centroid.iter_mut().zip(&candidate.centroid) {
                    *dim = *dim * old_share + value * new_share;
                }
                for keyword in candidate.keywords {
                    if !existing.keywords.contains(&keyword) {
                        existing.keywords.push(keyword);
                    }
                }
                existing.keywords.truncate(self.config.cluster_keywords);
                for platform in candidate.platforms {
                    if !existing.platforms.contains(&platform) {
                        existing.platforms.push(platform);
                    }
                }
                existing.event_count = total;
                existing.last_updated = now;
                existing.id.clone()
            }
            None => {
                let id = candidate.id.clone();
                self.clusters.push(candidate);
                id
            }
        }
    }

    /// Growth of each cluster within the rolling trend window: second half
    /// of the window against the first.
    fn detect_trending(&self, now: DateTime<Utc>) -> Vec<TrendingTopic> {
        let window = Duration::minutes(self.config.trend_window_minutes);
        let window_start = now - window;
        let midpoint = now - window / 2;

        let mut trending = Vec::new();
        for cluster in &self.clusters {
            let mut early = 0usize;
            let mut recent = 0usize;
            for event in &self.history {
                if event.cluster_id.as_deref() != Some(cluster.id.as_str())
                    || event.timestamp < window_start
                {
                    continue;
                }
                if event.timestamp < midpoint {
                    early += 1;
                } else {
                    recent += 1;
                }
            }
            let total = early + recent;
            if total < self.config.trend_min_events {
                continue;
            }
            let growth_rate = recent as f64 / early.max(1) as f64;
            if growth_rate > self.config.trend_growth_threshold {
                trending.push(TrendingTopic {
                    cluster_id: cluster.id.clone(),
                    label: cluster.label.clone(),
                    growth_rate,
                    event_count: total,
                });
            }
        }
        trending.sort_by(|a, b| {
            b.growth_rate
                .partial_cmp(&a.growth_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        trending
    }

    /// Volume spikes per topic key against the preceding baseline window,
    /// rate-normalized to the spike window length.
    fn detect_spikes(&mut self, now: DateTime<Utc>) {
        let spike_window = Duration::minutes(self.config.trend_window_minutes);
        let baseline_window = Duration::minutes(self.config.baseline_window_minutes);
        let spike_start = now - spike_window;
        let baseline_start = spike_start - baseline_window;

        let mut current: HashMap<&str, usize> = HashMap::new();
        let mut baseline: HashMap<&str, usize> = HashMap::new();
        for event in &self.history {
            let Some(topic) = event.topic_key.as_deref() else {
                continue;
            };
            if event.timestamp >= spike_start {
                *current.entry(topic).or_default() += 1;
            } else if event.timestamp >= baseline_start {
                *baseline.entry(topic).or_default() += 1;
            }
        }

        let rate_scale =
            self.config.trend_window_minutes as f64 / self.config.baseline_window_minutes as f64;

        let mut topics: Vec<&str> = current.keys().copied().collect();
        topics.sort_unstable();
        for topic in topics {
            let count = current[topic];
            if count < self.config.spike_min_events {
                continue;
            }
            let baseline_count = baseline.get(topic).copied().unwrap_or(0);
            let expected = (baseline_count as f64 * rate_scale).max(1.0);
            let intensity = count as f64 / expected;
            if intensity < self.config.spike_intensity_threshold {
                continue;
            }
            if self.spikes.iter().any(|s| s.topic == topic) {
                continue;
            }
            self.spikes.push(TopicSpike {
                topic: topic.to_string(),
                intensity,
                current_count: count,
                baseline_count,
                detected_at: now,
            });
        }
    }

    fn evict(&mut self, now: DateTime<Utc>) {
        let retention = Duration::minutes(
            2 * self
                .config
                .trend_window_minutes
                .max(self.config.baseline_window_minutes),
        );
        let cutoff = now - retention;
        while let Some(front) = self.history.front() {
            if front.timestamp < cutoff {
                self.history.pop_front();
            } else {
                break;
            }
        }
        self.clusters
            .retain(|c| now - c.last_updated < Duration::hours(CLUSTER_STALE_HOURS));
        self.spikes
            .retain(|s| now - s.detected_at < Duration::hours(SPIKE_STALE_HOURS));
    }
}

// ---------------------------------------------------------------------------
// Feature extraction
// ---------------------------------------------------------------------------

fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| c.is_ascii_punctuation())
                .to_string()
        })
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Feature vector: TF-IDF over the configured vocabulary ⊕ one-hot platform
/// ⊕ cyclic hour/day-of-week encodings ⊕ log-scaled engagement.
fn extract_features(batch: &[SocialEvent], vocabulary: &[String]) -> Vec<Vec<f64>> {
    // Document frequency across the batch
    let token_sets: Vec<HashSet<String>> = batch
        .par_iter()
        .map(|e| tokenize(&e.content.text))
        .collect();
    let mut document_frequency = vec![0usize; vocabulary.len()];
    for tokens in &token_sets {
        for (v, term) in vocabulary.iter().enumerate() {
            if tokens.contains(term) {
                document_frequency[v] += 1;
            }
        }
    }
    let total_docs = batch.len().max(1) as f64;

    batch
        .par_iter()
        .enumerate()
        .map(|(index, event)| {
            let tokens = &token_sets[index];
            let token_count = tokens.len().max(1) as f64;
            let mut features =
                Vec::with_capacity(vocabulary.len() + Platform::ALL.len() + 5);

            for (v, term) in vocabulary.iter().enumerate() {
                if tokens.contains(term) {
                    let tf = 1.0 / token_count;
                    let idf = (1.0 + total_docs / (1.0 + document_frequency[v] as f64)).ln();
                    features.push(tf * idf);
                } else {
                    features.push(0.0);
                }
            }

            for platform in Platform::ALL {
                features.push(if event.platform == platform { 1.0 } else { 0.0 });
            }

            let hour = event.timestamp.hour() as f64;
            let day = event.timestamp.weekday().num_days_from_monday() as f64;
            let tau = std::f64::consts::TAU;
            features.push((tau * hour / 24.0).sin());
            features.push((tau * hour / 24.0).cos());
            features.push((tau * day / 7.0).sin());
            features.push((tau * day / 7.0).cos());

            let interactions = event.engagement.total_interactions() as f64;
            features.push((1.0 + interactions).ln() / 10.0);

            features
        })
        .collect()
}

fn topic_key_of(tokens: &HashSet<String>, vocabulary: &[String]) -> Option<String> {
    let mut hits: Vec<&str> = vocabulary
        .iter()
        .filter(|term| tokens.contains(term.as_str()))
        .map(String::as_str)
        .collect();
    if hits.is_empty() {
        return None;
    }
    hits.sort_unstable();
    hits.truncate(3);
    Some(hits.join("+"))
}

// ---------------------------------------------------------------------------
// DBSCAN
// ---------------------------------------------------------------------------

fn distance(a: &[f64], b: &[f64], metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Cosine => {
            let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
            let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
            if norm_a == 0.0 || norm_b == 0.0 {
                1.0
            } else {
                1.0 - dot / (norm_a * norm_b)
            }
        }
        DistanceMetric::Jaccard => {
            let mut intersection = 0usize;
            let mut union = 0usize;
            for (x, y) in a.iter().zip(b) {
                let has_x = *x > 0.0;
                let has_y = *y > 0.0;
                if has_x && has_y {
                    intersection += 1;
                }
                if has_x || has_y {
                    union += 1;
                }
            }
            if union == 0 {
                1.0
            } else {
                1.0 - intersection as f64 / union as f64
            }
        }
    }
}

/// Plain DBSCAN; `None` is noise.
fn dbscan(
    points: &[Vec<f64>],
    epsilon: f64,
    min_points: usize,
    metric: DistanceMetric,
) -> Vec<Option<usize>> {
    let n = points.len();
    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut cluster = 0usize;

    let neighbors_of = |i: usize| -> Vec<usize> {
        (0..n)
            .filter(|&j| j != i && distance(&points[i], &points[j], metric) <= epsilon)
            .collect()
    };

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let neighbors = neighbors_of(i);
        if neighbors.len() + 1 < min_points {
            continue; // noise unless adopted by a later cluster
        }

        labels[i] = Some(cluster);
        let mut frontier: VecDeque<usize> = neighbors.into_iter().collect();
        while let Some(j) = frontier.pop_front() {
            if labels[j].is_none() {
                labels[j] = Some(cluster);
            }
            if !visited[j] {
                visited[j] = true;
                let expansion = neighbors_of(j);
                if expansion.len() + 1 >= min_points {
                    frontier.extend(expansion);
                }
            }
        }
        cluster += 1;
    }
    labels
}

// ---------------------------------------------------------------------------
// Cluster descriptors
// ---------------------------------------------------------------------------

fn top_keywords(events: &[&SocialEvent], k: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for event in events {
        for token in tokenize(&event.content.text) {
            *counts.entry(token).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    // Frequency descending, then lexicographic for a stable order
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(k).map(|(token, _)| token).collect()
}

fn mean_pairwise_jaccard(events: &[&SocialEvent]) -> f64 {
    if events.len() < 2 {
        return 1.0;
    }
    let sets: Vec<HashSet<String>> = events.iter().map(|e| tokenize(&e.content.text)).collect();
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            sum += jaccard(&sets[i], &sets[j]);
            pairs += 1;
        }
    }
    sum / pairs as f64
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

fn centroid_of<'a>(members: impl Iterator<Item = &'a Vec<f64>>) -> Vec<f64> {
    let mut centroid: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for features in members {
        if centroid.is_empty() {
            centroid = vec![0.0; features.len()];
        }
        for (dim, value) in centroid.iter_mut().zip(features) {
            *dim += value;
        }
        count += 1;
    }
    if count > 0 {
        for dim in centroid.iter_mut() {
            *dim /= count as f64;
        }
    }
    centroid
}

/// Weighted mix of keyword Jaccard, centroid cosine similarity and platform
/// Jaccard.
fn cluster_similarity(a: &TopicCluster, b: &TopicCluster) -> f64 {
    let keywords_a: HashSet<String> = a.keywords.iter().cloned().collect();
    let keywords_b: HashSet<String> = b.keywords.iter().cloned().collect();
    let keyword_similarity = jaccard(&keywords_a, &keywords_b);

    let centroid_similarity = 1.0 - distance(&a.centroid, &b.centroid, DistanceMetric::Cosine);

    let platforms_a: HashSet<String> =
        a.platforms.iter().map(|p| p.as_str().to_string()).collect();
    let platforms_b: HashSet<String> =
        b.platforms.iter().map(|p| p.as_str().to_string()).collect();
    let platform_similarity = jaccard(&platforms_a, &platforms_b);

    0.5 * keyword_similarity + 0.3 * centroid_similarity + 0.2 * platform_similarity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SentimentConfig;
    use crate::models::{Engagement, Platform};

    fn engine_with_clock(clock: ManualClock, config: TopicsConfig) -> TopicEngine {
        TopicEngine::new(
            config,
            Arc::new(clock),
            Arc::new(SentimentAnalyzer::new(SentimentConfig::default())),
        )
    }

    fn event_at(id: &str, text: &str, at: DateTime<Utc>) -> SocialEvent {
        let mut event = SocialEvent::new(id, Platform::Instagram, text);
        event.timestamp = at;
        event.engagement = Engagement {
            likes: 10,
            shares: 2,
            comments: 3,
            views: 500,
            engagement_rate: 0.03,
        };
        event
    }

    #[tokio::test]
    async fn similar_events_form_a_cluster() {
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let mut engine = engine_with_clock(clock, TopicsConfig::default());

        let batch: Vec<SocialEvent> = (0..5)
            .map(|i| {
                event_at(
                    &format!("e{i}"),
                    "the delivery of my order was slow and the shipping is an issue",
                    now - Duration::minutes(5),
                )
            })
            .collect();

        let outcome = engine.process(&batch).await;
        assert_eq!(outcome.clusters.len(), 1);
        let cluster = &outcome.clusters[0];
        assert_eq!(cluster.event_count, 5);
        assert!(cluster.coherence > 0.9);
        assert!(!cluster.label.is_empty());
        assert!(cluster.sentiment_score < 0.0);
    }

    #[tokio::test]
    async fn repeated_batches_merge_into_one_cluster() {
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let mut engine = engine_with_clock(clock.clone(), TopicsConfig::default());

        let make_batch = |at: DateTime<Utc>| -> Vec<SocialEvent> {
            (0..4)
                .map(|i| {
                    event_at(
                        &format!("e{i}-{at}"),
                        "love the new serum product launch quality is amazing",
                        at,
                    )
                })
                .collect()
        };

        engine.process(&make_batch(now - Duration::minutes(10))).await;
        clock.advance(Duration::minutes(5));
        let outcome = engine.process(&make_batch(now)).await;

        assert_eq!(outcome.clusters.len(), 1);
        assert_eq!(outcome.clusters[0].event_count, 8);
    }

    #[tokio::test]
    async fn spike_detected_against_quiet_baseline() {
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let mut config = TopicsConfig::default();
        config.spike_min_events = 4;
        let mut engine = engine_with_clock(clock, config);

        // One baseline mention hours ago, then a burst in the last minutes
        let mut batch = vec![event_at(
            "old",
            "refund issue with my order",
            now - Duration::minutes(200),
        )];
        for i in 0..6 {
            batch.push(event_at(
                &format!("burst{i}"),
                "refund issue with my order",
                now - Duration::minutes(3),
            ));
        }

        let outcome = engine.process(&batch).await;
        assert_eq!(outcome.spikes.len(), 1);
        let spike = &outcome.spikes[0];
        assert!(spike.intensity >= 3.0);
        assert_eq!(spike.current_count, 6);
    }

    #[tokio::test]
    async fn stale_clusters_and_history_are_evicted() {
        let now = Utc::now();
        let clock = ManualClock::new(now);
        let mut engine = engine_with_clock(clock.clone(), TopicsConfig::default());

        let batch: Vec<SocialEvent> = (0..5)
            .map(|i| {
                event_at(
                    &format!("e{i}"),
                    "support issue with the app update",
                    now - Duration::minutes(1),
                )
            })
            .collect();
        engine.process(&batch).await;
        assert_eq!(engine.clusters().len(), 1);

        clock.advance(Duration::hours(25));
        let outcome = engine.process(&[]).await;
        assert!(outcome.clusters.is_empty());
        assert!(engine.history.is_empty());
    }

    #[test]
    fn dbscan_separates_distant_groups() {
        let mut points = Vec::new();
        for i in 0..4 {
            points.push(vec![0.0 + i as f64 * 0.01, 0.0]);
        }
        for i in 0..4 {
            points.push(vec![10.0 + i as f64 * 0.01, 10.0]);
        }
        let labels = dbscan(&points, 0.5, 3, DistanceMetric::Euclidean);
        assert_eq!(labels[0], labels[3]);
        assert_eq!(labels[4], labels[7]);
        assert_ne!(labels[0], labels[4]);
        assert!(labels.iter().all(|l| l.is_some()));
    }

    #[test]
    fn dbscan_marks_isolated_points_as_noise() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![50.0, 50.0],
        ];
        let labels = dbscan(&points, 0.5, 3, DistanceMetric::Euclidean);
        assert!(labels[3].is_none());
    }

    #[test]
    fn jaccard_distance_on_term_presence() {
        let a = vec![1.0, 0.0, 1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0, 1.0];
        let d = distance(&a, &b, DistanceMetric::Jaccard);
        assert!((d - (1.0 - 1.0 / 3.0)).abs() < 1e-9);
    }
}
