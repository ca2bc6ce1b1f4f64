//! Typed configuration for the decision pipeline and the scheduling engine.
//!
//! Every knob lives in a typed section with a production default. Files are
//! TOML; unknown keys are rejected at parse. `validate()` runs at load and
//! refuses weight tables that do not sum, thresholds out of range, or
//! non-monotone routing ladders.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::decision::rules::Condition;
use crate::error::{CoreError, CoreResult};
use crate::models::{IntentCategory, Platform, UrgencyLevel};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub sentiment: SentimentConfig,
    pub intent: IntentConfig,
    pub topics: TopicsConfig,
    pub priority: PriorityConfig,
    pub routing: RoutingConfig,
    pub engine: EngineConfig,
    pub quality_assurance: QualityAssuranceConfig,
    pub platform_limits: PlatformLimitsConfig,
    pub publishing: PublishingConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load a TOML file, apply environment overrides, validate.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Validation(format!("config read {}: {e}", path.display())))?;
        let mut config: AppConfig = toml::from_str(&raw)
            .map_err(|e| CoreError::Validation(format!("config parse: {e}")))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Defaults + environment overrides, validated.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = AppConfig::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("PULSEBOT_DATABASE_PATH") {
            self.storage.database_path = v;
        }
        if let Ok(v) = std::env::var("PULSEBOT_MAX_CONCURRENT_DECISIONS") {
            self.engine.max_concurrent_decisions =
                v.parse().unwrap_or(self.engine.max_concurrent_decisions);
        }
        if let Ok(v) = std::env::var("PULSEBOT_DECISION_TIMEOUT_MS") {
            self.engine.decision_timeout_ms = v.parse().unwrap_or(self.engine.decision_timeout_ms);
        }
        if let Ok(v) = std::env::var("PULSEBOT_PUBLISH_TICK_SECONDS") {
            self.publishing.tick_seconds = v.parse().unwrap_or(self.publishing.tick_seconds);
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.sentiment.validate()?;
        self.intent.validate()?;
        self.topics.validate()?;
        self.priority.validate()?;
        self.routing.validate()?;
        self.engine.validate()?;
        self.quality_assurance.validate()?;
        self.platform_limits.validate()?;
        self.publishing.validate()?;
        Ok(())
    }
}

fn check_unit(value: f64, name: &str) -> CoreResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be in [0,1], got {value}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sentiment (C1)
// ---------------------------------------------------------------------------

/// Per-platform sentiment tilt. `positive_boost` scales positive scores,
/// `negative_boost` scales negative ones; scores inside the dead zone are
/// flattened to neutral.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformTilt {
    pub positive_boost: f64,
    pub negative_boost: f64,
    pub neutral_dead_zone: f64,
}

impl Default for PlatformTilt {
    fn default() -> Self {
        Self {
            positive_boost: 0.0,
            negative_boost: 0.0,
            neutral_dead_zone: 0.05,
        }
    }
}

/// Confidence tier: |score| ≥ `min_abs_score` ⇒ `confidence`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfidenceTier {
    pub min_abs_score: f64,
    pub confidence: f64,
}

/// A configured aspect with its synonym set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AspectConfig {
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SentimentConfig {
    pub enable_lexical: bool,
    pub enable_emoji: bool,
    pub enable_keyword: bool,
    pub lexical_weight: f64,
    pub emoji_weight: f64,
    pub keyword_weight: f64,
    /// Per-platform tilt; missing platforms fall back to `PlatformTilt::default()`
    pub platform_tilt: HashMap<Platform, PlatformTilt>,
    /// Sorted descending by `min_abs_score` at validation
    pub confidence_tiers: Vec<ConfidenceTier>,
    pub aspects: Vec<AspectConfig>,
    /// Characters taken on each side of an aspect mention
    pub aspect_window_chars: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        let mut platform_tilt = HashMap::new();
        platform_tilt.insert(
            Platform::Instagram,
            PlatformTilt {
                positive_boost: 0.15,
                negative_boost: 0.05,
                neutral_dead_zone: 0.05,
            },
        );
        platform_tilt.insert(
            Platform::Tiktok,
            PlatformTilt {
                positive_boost: 0.20,
                negative_boost: 0.10,
                neutral_dead_zone: 0.05,
            },
        );
        platform_tilt.insert(
            Platform::Facebook,
            PlatformTilt {
                positive_boost: 0.0,
                negative_boost: 0.10,
                neutral_dead_zone: 0.05,
            },
        );
        platform_tilt.insert(
            Platform::Youtube,
            PlatformTilt {
                positive_boost: 0.05,
                negative_boost: 0.10,
                neutral_dead_zone: 0.05,
            },
        );
        platform_tilt.insert(
            Platform::Reddit,
            PlatformTilt {
                positive_boost: -0.05,
                negative_boost: 0.15,
                neutral_dead_zone: 0.10,
            },
        );
        platform_tilt.insert(
            Platform::Rss,
            PlatformTilt {
                positive_boost: 0.0,
                negative_boost: 0.0,
                neutral_dead_zone: 0.10,
            },
        );

        Self {
            enable_lexical: true,
            enable_emoji: true,
            enable_keyword: true,
            lexical_weight: 0.5,
            emoji_weight: 0.2,
            keyword_weight: 0.3,
            platform_tilt,
            confidence_tiers: vec![
                ConfidenceTier {
                    min_abs_score: 0.8,
                    confidence: 0.95,
                },
                ConfidenceTier {
                    min_abs_score: 0.6,
                    confidence: 0.9,
                },
                ConfidenceTier {
                    min_abs_score: 0.4,
                    confidence: 0.8,
                },
                ConfidenceTier {
                    min_abs_score: 0.2,
                    confidence: 0.65,
                },
            ],
            aspects: vec![
                AspectConfig {
                    name: "price".into(),
                    synonyms: vec!["cost".into(), "expensive".into(), "cheap".into()],
                },
                AspectConfig {
                    name: "quality".into(),
                    synonyms: vec!["build".into(), "material".into(), "craftsmanship".into()],
                },
                AspectConfig {
                    name: "service".into(),
                    synonyms: vec!["support".into(), "staff".into(), "help".into()],
                },
                AspectConfig {
                    name: "delivery".into(),
                    synonyms: vec!["shipping".into(), "arrived".into(), "package".into()],
                },
            ],
            aspect_window_chars: 30,
        }
    }
}

impl SentimentConfig {
    /// Tilt for a platform; absent entries behave as no tilt.
    pub fn tilt(&self, platform: Platform) -> PlatformTilt {
        self.platform_tilt
            .get(&platform)
            .cloned()
            .unwrap_or_default()
    }

    /// Confidence for an adjusted score, from the tier ladder.
    pub fn confidence_for(&self, score: f64) -> f64 {
        let magnitude = score.abs();
        for tier in &self.confidence_tiers {
            if magnitude >= tier.min_abs_score {
                return tier.confidence;
            }
        }
        0.5
    }

    fn validate(&self) -> CoreResult<()> {
        for (weight, name) in [
            (self.lexical_weight, "sentiment.lexical_weight"),
            (self.emoji_weight, "sentiment.emoji_weight"),
            (self.keyword_weight, "sentiment.keyword_weight"),
        ] {
            check_unit(weight, name)?;
        }
        if !self.enable_lexical && !self.enable_emoji && !self.enable_keyword {
            return Err(CoreError::Validation(
                "sentiment: at least one model must be enabled".into(),
            ));
        }
        let mut previous = f64::INFINITY;
        for tier in &self.confidence_tiers {
            check_unit(tier.confidence, "sentiment.confidence_tiers.confidence")?;
            check_unit(tier.min_abs_score, "sentiment.confidence_tiers.min_abs_score")?;
            if tier.min_abs_score >= previous {
                return Err(CoreError::Validation(
                    "sentiment.confidence_tiers must be sorted by descending min_abs_score".into(),
                ));
            }
            previous = tier.min_abs_score;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Intent (C2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrgencyConfig {
    /// Base urgency contributed by the primary intent
    pub base_by_intent: HashMap<IntentCategory, f64>,
    /// Additive impact per time keyword found in the text
    pub time_keywords: HashMap<String, f64>,
    /// Additive impact per emotion keyword found in the text
    pub emotion_keywords: HashMap<String, f64>,
    /// Per-platform multiplier; missing platforms default to 1.0
    pub platform_modifiers: HashMap<Platform, f64>,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        let mut base_by_intent = HashMap::new();
        base_by_intent.insert(IntentCategory::Complaint, 0.5);
        base_by_intent.insert(IntentCategory::Question, 0.3);
        base_by_intent.insert(IntentCategory::Praise, 0.05);
        base_by_intent.insert(IntentCategory::PurchaseIntent, 0.4);
        base_by_intent.insert(IntentCategory::Feedback, 0.2);
        base_by_intent.insert(IntentCategory::Spam, 0.0);
        base_by_intent.insert(IntentCategory::Other, 0.1);

        let time_keywords = [
            ("immediately", 0.30),
            ("urgent", 0.30),
            ("asap", 0.30),
            ("right away", 0.30),
            ("now", 0.25),
            ("today", 0.20),
            ("tonight", 0.20),
            ("soon", 0.15),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let emotion_keywords = [
            ("furious", 0.25),
            ("scam", 0.25),
            ("angry", 0.20),
            ("hate", 0.20),
            ("worst", 0.20),
            ("broken", 0.15),
            ("terrible", 0.15),
            ("awful", 0.15),
            ("frustrated", 0.15),
            ("disappointed", 0.15),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            base_by_intent,
            time_keywords,
            emotion_keywords,
            platform_modifiers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntentConfig {
    /// Per-intent weight applied to the accumulated rule score
    pub intent_weights: HashMap<IntentCategory, f64>,
    /// Per-platform multiplier on intent confidence; missing platforms default to 1.0
    pub platform_modifiers: HashMap<Platform, f64>,
    pub urgency: UrgencyConfig,
}

impl Default for IntentConfig {
    fn default() -> Self {
        let mut intent_weights = HashMap::new();
        for intent in IntentCategory::ALL {
            intent_weights.insert(intent, 1.0);
        }
        intent_weights.insert(IntentCategory::Other, 0.5);

        let mut platform_modifiers = HashMap::new();
        platform_modifiers.insert(Platform::Instagram, 1.1);
        platform_modifiers.insert(Platform::Tiktok, 1.05);
        platform_modifiers.insert(Platform::Facebook, 1.0);
        platform_modifiers.insert(Platform::Youtube, 1.0);
        platform_modifiers.insert(Platform::Reddit, 0.95);
        platform_modifiers.insert(Platform::Rss, 0.9);

        Self {
            intent_weights,
            platform_modifiers,
            urgency: UrgencyConfig::default(),
        }
    }
}

impl IntentConfig {
    /// Intent weight; missing intents default to 1.0.
    pub fn weight(&self, intent: IntentCategory) -> f64 {
        self.intent_weights.get(&intent).copied().unwrap_or(1.0)
    }

    /// Platform modifier; missing platforms default to 1.0.
    pub fn platform_modifier(&self, platform: Platform) -> f64 {
        self.platform_modifiers
            .get(&platform)
            .copied()
            .unwrap_or(1.0)
    }

    fn validate(&self) -> CoreResult<()> {
        for (intent, weight) in &self.intent_weights {
            if *weight < 0.0 {
                return Err(CoreError::Validation(format!(
                    "intent.intent_weights.{} must be non-negative",
                    intent.as_str()
                )));
            }
        }
        for (_, base) in &self.urgency.base_by_intent {
            check_unit(*base, "intent.urgency.base_by_intent")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Topics (C3)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
    Jaccard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicsConfig {
    /// Vocabulary the TF-IDF features are computed over
    pub vocabulary: Vec<String>,
    pub epsilon: f64,
    pub min_points: usize,
    pub metric: DistanceMetric,
    pub trend_window_minutes: i64,
    pub trend_growth_threshold: f64,
    pub trend_min_events: usize,
    pub baseline_window_minutes: i64,
    pub spike_intensity_threshold: f64,
    pub spike_min_events: usize,
    /// Keywords reported per cluster
    pub cluster_keywords: usize,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            vocabulary: [
                "product", "order", "refund", "price", "quality", "service", "support",
                "delivery", "shipping", "broken", "love", "recommend", "launch", "sale",
                "discount", "review", "update", "issue", "help", "amazing",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            epsilon: 0.45,
            min_points: 3,
            metric: DistanceMetric::Cosine,
            trend_window_minutes: 60,
            trend_growth_threshold: 2.0,
            trend_min_events: 5,
            baseline_window_minutes: 240,
            spike_intensity_threshold: 3.0,
            spike_min_events: 5,
            cluster_keywords: 8,
        }
    }
}

impl TopicsConfig {
    fn validate(&self) -> CoreResult<()> {
        if self.epsilon <= 0.0 {
            return Err(CoreError::Validation("topics.epsilon must be > 0".into()));
        }
        if self.min_points == 0 {
            return Err(CoreError::Validation("topics.min_points must be ≥ 1".into()));
        }
        if self.trend_window_minutes <= 0 || self.baseline_window_minutes <= 0 {
            return Err(CoreError::Validation(
                "topics windows must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Priority (C4)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriorityWeights {
    pub urgency: f64,
    pub impact: f64,
    pub sentiment: f64,
    pub reach: f64,
    pub brand_risk: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            urgency: 0.30,
            impact: 0.20,
            sentiment: 0.20,
            reach: 0.15,
            brand_risk: 0.15,
        }
    }
}

impl PriorityWeights {
    pub fn sum(&self) -> f64 {
        self.urgency + self.impact + self.sentiment + self.reach + self.brand_risk
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriorityConfig {
    pub weights: PriorityWeights,
    /// decay = decay_base ^ (age_hours / decay_period_hours)
    pub decay_base: f64,
    pub decay_period_hours: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub auto_escalation_threshold: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            weights: PriorityWeights::default(),
            decay_base: 0.9,
            decay_period_hours: 24.0,
            min_score: 0.0,
            max_score: 100.0,
            auto_escalation_threshold: 80.0,
        }
    }
}

impl PriorityConfig {
    fn validate(&self) -> CoreResult<()> {
        let weights = [
            (self.weights.urgency, "priority.weights.urgency"),
            (self.weights.impact, "priority.weights.impact"),
            (self.weights.sentiment, "priority.weights.sentiment"),
            (self.weights.reach, "priority.weights.reach"),
            (self.weights.brand_risk, "priority.weights.brand_risk"),
        ];
        for (weight, name) in weights {
            if weight < 0.0 {
                return Err(CoreError::Validation(format!(
                    "{name} must be non-negative"
                )));
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CoreError::Validation(format!(
                "priority.weights must sum to 1.0 (got {sum})"
            )));
        }
        if !(0.0 < self.decay_base && self.decay_base <= 1.0) {
            return Err(CoreError::Validation(
                "priority.decay_base must be in (0,1]".into(),
            ));
        }
        if self.decay_period_hours <= 0.0 {
            return Err(CoreError::Validation(
                "priority.decay_period_hours must be > 0".into(),
            ));
        }
        if self.min_score >= self.max_score {
            return Err(CoreError::Validation(
                "priority.min_score must be below max_score".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Routing (C5)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfidenceThresholds {
    pub auto_response: f64,
    pub suggestion: f64,
    pub human_review: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            auto_response: 0.80,
            suggestion: 0.55,
            human_review: 0.30,
        }
    }
}

/// Ordered override: first matching condition replaces the overall confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfidenceOverride {
    pub name: String,
    pub condition: Condition,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlwaysHumanReview {
    pub intents: Vec<IntentCategory>,
    pub urgencies: Vec<UrgencyLevel>,
    /// Priority at or above which review is mandatory
    pub priority_threshold: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    pub confidence_thresholds: ConfidenceThresholds,
    pub overrides: Vec<ConfidenceOverride>,
    pub always_human_review: AlwaysHumanReview,
    pub never_auto_respond: Vec<IntentCategory>,
    /// Base used for the estimated wait: base × (11 − priority)/10
    pub base_wait_minutes: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            confidence_thresholds: ConfidenceThresholds::default(),
            overrides: Vec::new(),
            always_human_review: AlwaysHumanReview {
                intents: Vec::new(),
                urgencies: vec![UrgencyLevel::Critical],
                priority_threshold: Some(85.0),
            },
            never_auto_respond: vec![IntentCategory::Complaint, IntentCategory::Spam],
            base_wait_minutes: 60.0,
        }
    }
}

impl RoutingConfig {
    fn validate(&self) -> CoreResult<()> {
        let t = &self.confidence_thresholds;
        check_unit(t.auto_response, "routing.confidence_thresholds.auto_response")?;
        check_unit(t.suggestion, "routing.confidence_thresholds.suggestion")?;
        check_unit(t.human_review, "routing.confidence_thresholds.human_review")?;
        if !(t.auto_response >= t.suggestion && t.suggestion >= t.human_review) {
            return Err(CoreError::Validation(
                "routing thresholds must be monotonically decreasing \
                 (auto_response ≥ suggestion ≥ human_review)"
                    .into(),
            ));
        }
        for rule in &self.overrides {
            check_unit(rule.confidence, "routing.overrides.confidence")?;
        }
        if self.base_wait_minutes <= 0.0 {
            return Err(CoreError::Validation(
                "routing.base_wait_minutes must be > 0".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine (C7) and quality assurance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub max_concurrent_decisions: usize,
    pub decision_timeout_ms: u64,
    pub enable_decision_caching: bool,
    pub cache_expiration_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_decisions: 16,
            decision_timeout_ms: 5_000,
            enable_decision_caching: true,
            cache_expiration_ms: 300_000,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> CoreResult<()> {
        if self.max_concurrent_decisions == 0 {
            return Err(CoreError::Validation(
                "engine.max_concurrent_decisions must be ≥ 1".into(),
            ));
        }
        if self.decision_timeout_ms == 0 {
            return Err(CoreError::Validation(
                "engine.decision_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityAssuranceConfig {
    pub enable_validation: bool,
    pub require_minimum_confidence: f64,
    pub enable_audit_logging: bool,
}

impl Default for QualityAssuranceConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            require_minimum_confidence: 0.3,
            enable_audit_logging: true,
        }
    }
}

impl QualityAssuranceConfig {
    fn validate(&self) -> CoreResult<()> {
        check_unit(
            self.require_minimum_confidence,
            "quality_assurance.require_minimum_confidence",
        )
    }
}

// ---------------------------------------------------------------------------
// Platform limits and publishing (C8/C9)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformLimit {
    pub daily_limit: u32,
    pub hourly_limit: u32,
    pub min_interval_minutes: i64,
}

impl Default for PlatformLimit {
    fn default() -> Self {
        Self {
            daily_limit: 10,
            hourly_limit: 3,
            min_interval_minutes: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformLimitsConfig {
    pub limits: HashMap<Platform, PlatformLimit>,
}

impl Default for PlatformLimitsConfig {
    fn default() -> Self {
        let mut limits = HashMap::new();
        limits.insert(
            Platform::Tiktok,
            PlatformLimit {
                daily_limit: 6,
                hourly_limit: 2,
                min_interval_minutes: 30,
            },
        );
        limits.insert(
            Platform::Instagram,
            PlatformLimit {
                daily_limit: 10,
                hourly_limit: 3,
                min_interval_minutes: 15,
            },
        );
        limits.insert(
            Platform::Facebook,
            PlatformLimit {
                daily_limit: 12,
                hourly_limit: 4,
                min_interval_minutes: 15,
            },
        );
        limits.insert(
            Platform::Youtube,
            PlatformLimit {
                daily_limit: 4,
                hourly_limit: 1,
                min_interval_minutes: 60,
            },
        );
        limits.insert(
            Platform::Reddit,
            PlatformLimit {
                daily_limit: 8,
                hourly_limit: 2,
                min_interval_minutes: 30,
            },
        );
        limits.insert(
            Platform::Rss,
            PlatformLimit {
                daily_limit: 24,
                hourly_limit: 6,
                min_interval_minutes: 5,
            },
        );
        Self { limits }
    }
}

impl PlatformLimitsConfig {
    /// Limit for a platform; missing entries fall back to `PlatformLimit::default()`.
    pub fn limit(&self, platform: Platform) -> PlatformLimit {
        self.limits.get(&platform).copied().unwrap_or_default()
    }

    fn validate(&self) -> CoreResult<()> {
        for (platform, limit) in &self.limits {
            if limit.daily_limit == 0 || limit.hourly_limit == 0 {
                return Err(CoreError::Validation(format!(
                    "platform_limits.{} limits must be ≥ 1",
                    platform.as_str()
                )));
            }
            if limit.min_interval_minutes < 0 {
                return Err(CoreError::Validation(format!(
                    "platform_limits.{}.min_interval_minutes must be ≥ 0",
                    platform.as_str()
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    pub base_secs: u64,
    pub max_secs: u64,
    pub multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_secs: 60,
            max_secs: 3_600,
            multiplier: 2.0,
            jitter_factor: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PublishingConfig {
    pub tick_seconds: u64,
    /// Due schedules loaded per tick
    pub due_page_size: usize,
    pub default_max_retries: u32,
    pub backoff: BackoffConfig,
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 30,
            due_page_size: 50,
            default_max_retries: 3,
            backoff: BackoffConfig::default(),
        }
    }
}

impl PublishingConfig {
    fn validate(&self) -> CoreResult<()> {
        if self.tick_seconds == 0 {
            return Err(CoreError::Validation(
                "publishing.tick_seconds must be > 0".into(),
            ));
        }
        if self.due_page_size == 0 {
            return Err(CoreError::Validation(
                "publishing.due_page_size must be ≥ 1".into(),
            ));
        }
        if self.backoff.base_secs == 0 || self.backoff.base_secs > self.backoff.max_secs {
            return Err(CoreError::Validation(
                "publishing.backoff base must be positive and ≤ max".into(),
            ));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(CoreError::Validation(
                "publishing.backoff.multiplier must be ≥ 1.0".into(),
            ));
        }
        check_unit(self.backoff.jitter_factor, "publishing.backoff.jitter_factor")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "./pulsebot.db".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        AppConfig::default().validate().expect("defaults are valid");
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = AppConfig::default();
        config.priority.weights.urgency = 0.9;
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn thresholds_must_be_monotone() {
        let mut config = AppConfig::default();
        config.routing.confidence_thresholds.suggestion = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let raw = "[engine]\nmax_concurrent_decisions = 4\nturbo_mode = true\n";
        assert!(toml::from_str::<AppConfig>(raw).is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let raw = "[engine]\nmax_concurrent_decisions = 4\n";
        let config: AppConfig = toml::from_str(raw).expect("parse");
        assert_eq!(config.engine.max_concurrent_decisions, 4);
        assert_eq!(config.engine.decision_timeout_ms, 5_000);
        config.validate().expect("valid");
    }

    #[test]
    fn missing_platform_tables_default_to_identity() {
        let config = IntentConfig {
            platform_modifiers: HashMap::new(),
            ..Default::default()
        };
        assert_eq!(config.platform_modifier(Platform::Reddit), 1.0);
    }
}
