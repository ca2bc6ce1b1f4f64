//! Priority scoring.
//!
//! Weighted composite over urgency, impact, sentiment, reach and brand risk.
//! Components are computed raw in [0,1] and reported unweighted; the
//! composite applies each configured weight exactly once, then time decay.

use serde::{Deserialize, Serialize};

use crate::analysis::intent::IntentResult;
use crate::analysis::sentiment::{SentimentLabel, SentimentResult};
use crate::clock::SharedClock;
use crate::config::PriorityConfig;
use crate::models::{BrandContext, IntentCategory, SocialEvent, UrgencyLevel};

pub const SCORER_VERSION: &str = "priority-v1";

/// Confidence haircut for signals the scorer cannot trust
const SHORT_TEXT_CHARS: usize = 10;
const WEAK_SIGNAL_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityComponents {
    pub urgency: f64,
    pub impact: f64,
    pub sentiment: f64,
    pub reach: f64,
    pub brand_risk: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessRules {
    pub auto_escalation: bool,
    /// Multiplicative decay applied to the composite
    pub time_decay: f64,
    pub applied_modifiers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityMetadata {
    pub event_age_hours: f64,
    pub confidence: f64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityScore {
    /// Composite in [min_score, max_score] (nominally 0-100)
    pub overall: f64,
    pub components: PriorityComponents,
    pub factors: Vec<String>,
    pub business_rules: BusinessRules,
    pub metadata: PriorityMetadata,
}

pub struct PriorityScorer {
    config: PriorityConfig,
    clock: SharedClock,
}

impl PriorityScorer {
    pub fn new(config: PriorityConfig, clock: SharedClock) -> Self {
        Self { config, clock }
    }

    pub fn score(
        &self,
        event: &SocialEvent,
        sentiment: &SentimentResult,
        intent: &IntentResult,
        brand: &BrandContext,
    ) -> PriorityScore {
        let now = self.clock.now();
        let mut factors = Vec::new();
        let mut applied_modifiers = Vec::new();

        let urgency = intent.urgency.score;
        factors.push(format!("urgency score {urgency:.3}"));

        let impact = impact_component(event);
        factors.push(format!("impact from engagement {impact:.3}"));

        // Negative sentiment raises priority: -1 maps to 1, +1 maps to 0
        let sentiment_component = ((1.0 - sentiment.overall.score) / 2.0).clamp(0.0, 1.0);
        factors.push(format!(
            "sentiment {} -> component {sentiment_component:.3}",
            sentiment.overall.label.as_str()
        ));

        let reach = reach_component(event);
        factors.push(format!("reach from audience {reach:.3}"));

        let brand_risk = brand_risk_component(event, sentiment, intent, brand, &mut applied_modifiers);
        factors.push(format!("brand risk {brand_risk:.3}"));

        let weights = &self.config.weights;
        let composite = weights.urgency * urgency
            + weights.impact * impact
            + weights.sentiment * sentiment_component
            + weights.reach * reach
            + weights.brand_risk * brand_risk;

        let event_age_hours = event.age_hours(now);
        let time_decay = self
            .config
            .decay_base
            .powf(event_age_hours / self.config.decay_period_hours);
        if time_decay < 1.0 {
            applied_modifiers.push(format!("time_decay {time_decay:.4}"));
        }

        let overall = (composite * 100.0 * time_decay)
            .clamp(self.config.min_score, self.config.max_score);

        let auto_escalation = overall >= self.config.auto_escalation_threshold;
        if auto_escalation {
            applied_modifiers.push("auto_escalation".to_string());
        }

        let confidence = self.confidence(event, sentiment, intent);

        PriorityScore {
            overall,
            components: PriorityComponents {
                urgency,
                impact,
                sentiment: sentiment_component,
                reach,
                brand_risk,
            },
            factors,
            business_rules: BusinessRules {
                auto_escalation,
                time_decay,
                applied_modifiers,
            },
            metadata: PriorityMetadata {
                event_age_hours,
                confidence,
                version: SCORER_VERSION.to_string(),
            },
        }
    }

    /// Product of the input confidences, reduced for weak signals.
    fn confidence(
        &self,
        event: &SocialEvent,
        sentiment: &SentimentResult,
        intent: &IntentResult,
    ) -> f64 {
        let mut confidence = sentiment.overall.confidence * intent.primary.confidence;
        if event.content.text.chars().count() < SHORT_TEXT_CHARS {
            confidence *= WEAK_SIGNAL_FACTOR;
        }
        if event.author.follower_count == 0 {
            confidence *= WEAK_SIGNAL_FACTOR;
        }
        confidence.clamp(0.0, 1.0)
    }
}

fn impact_component(event: &SocialEvent) -> f64 {
    let interactions = event.engagement.total_interactions() as f64;
    let interaction_norm = ((1.0 + interactions).log10() / 6.0).clamp(0.0, 1.0);
    let rate = event.engagement.engagement_rate.clamp(0.0, 1.0);
    (0.6 * rate + 0.4 * interaction_norm).clamp(0.0, 1.0)
}

fn reach_component(event: &SocialEvent) -> f64 {
    let follower_norm =
        ((1.0 + event.author.follower_count as f64).log10() / 7.0).clamp(0.0, 1.0);
    let view_norm = ((1.0 + event.engagement.views as f64).log10() / 8.0).clamp(0.0, 1.0);
    (0.7 * follower_norm + 0.3 * view_norm).clamp(0.0, 1.0)
}

/// Fixed factor table; each hit is recorded as an applied modifier.
fn brand_risk_component(
    event: &SocialEvent,
    sentiment: &SentimentResult,
    intent: &IntentResult,
    brand: &BrandContext,
    applied_modifiers: &mut Vec<String>,
) -> f64 {
    let mut risk: f64 = 0.2;

    if intent.primary.intent == IntentCategory::Complaint {
        risk += 0.3;
        applied_modifiers.push("risk_complaint".to_string());
    }
    if sentiment.overall.label == SentimentLabel::Negative {
        risk += 0.2;
        applied_modifiers.push("risk_negative_sentiment".to_string());
    }
    if intent.urgency.level >= UrgencyLevel::High {
        risk += 0.2;
        applied_modifiers.push("risk_high_urgency".to_string());
    }
    if event.author.verified {
        risk += 0.1;
        applied_modifiers.push("risk_verified_author".to_string());
    }

    let text = event.content.text.to_lowercase();
    if brand
        .playbook
        .rules
        .iter()
        .any(|rule| !rule.is_empty() && text.contains(&rule.to_lowercase()))
    {
        risk += 0.15;
        applied_modifiers.push("risk_playbook_rule_match".to_string());
    }

    risk.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::intent::IntentClassifier;
    use crate::analysis::sentiment::SentimentAnalyzer;
    use crate::clock::ManualClock;
    use crate::config::{IntentConfig, SentimentConfig};
    use crate::models::{Author, Engagement, Platform};
    use chrono::Duration;
    use std::sync::Arc;

    async fn analyzed(
        event: &SocialEvent,
    ) -> (SentimentResult, IntentResult) {
        let sentiment = SentimentAnalyzer::new(SentimentConfig::default())
            .analyze(event)
            .await;
        let intent = IntentClassifier::new(IntentConfig::default())
            .detect(event)
            .await;
        (sentiment, intent)
    }

    fn scorer(clock: ManualClock) -> PriorityScorer {
        PriorityScorer::new(PriorityConfig::default(), Arc::new(clock))
    }

    #[tokio::test]
    async fn praise_scores_low() {
        let mut event = SocialEvent::new(
            "e1",
            Platform::Instagram,
            "I love this product! Best serum ever.",
        );
        event.author = Author {
            id: "a1".into(),
            display_name: "Fan".into(),
            follower_count: 50_000,
            verified: true,
        };
        event.engagement = Engagement {
            engagement_rate: 0.08,
            ..Default::default()
        };
        let (sentiment, intent) = analyzed(&event).await;
        let clock = ManualClock::new(event.timestamp);
        let score = scorer(clock).score(&event, &sentiment, &intent, &BrandContext::new("b1"));

        assert!(score.overall < 40.0, "overall {}", score.overall);
        assert!(!score.business_rules.auto_escalation);
        assert!((0.0..=100.0).contains(&score.overall));
    }

    #[tokio::test]
    async fn critical_complaint_scores_high() {
        let event = SocialEvent::new(
            "e2",
            Platform::Facebook,
            "This is completely broken, I need a refund immediately!",
        );
        let (sentiment, intent) = analyzed(&event).await;
        let clock = ManualClock::new(event.timestamp);
        let score = scorer(clock).score(&event, &sentiment, &intent, &BrandContext::new("b1"));

        assert!(score.overall >= 60.0, "overall {}", score.overall);
        assert!(score
            .business_rules
            .applied_modifiers
            .contains(&"risk_complaint".to_string()));
    }

    #[tokio::test]
    async fn components_stay_in_unit_range() {
        let event = SocialEvent::new("e3", Platform::Reddit, "worst scam ever!!! refund now");
        let (sentiment, intent) = analyzed(&event).await;
        let clock = ManualClock::new(event.timestamp);
        let score = scorer(clock).score(&event, &sentiment, &intent, &BrandContext::new("b1"));

        for component in [
            score.components.urgency,
            score.components.impact,
            score.components.sentiment,
            score.components.reach,
            score.components.brand_risk,
        ] {
            assert!((0.0..=1.0).contains(&component));
        }
    }

    #[tokio::test]
    async fn time_decay_lowers_old_events() {
        let event = SocialEvent::new("e4", Platform::Facebook, "terrible support, awful service");
        let (sentiment, intent) = analyzed(&event).await;

        let fresh_clock = ManualClock::new(event.timestamp);
        let fresh = scorer(fresh_clock).score(&event, &sentiment, &intent, &BrandContext::new("b1"));

        let late_clock = ManualClock::new(event.timestamp + Duration::hours(48));
        let late = scorer(late_clock).score(&event, &sentiment, &intent, &BrandContext::new("b1"));

        assert!(late.overall < fresh.overall);
        assert!(late.business_rules.time_decay < 1.0);
        assert!((fresh.business_rules.time_decay - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn priority_is_monotone_in_components() {
        // Same event, but a bigger audience must not lower the score
        let base = SocialEvent::new("e5", Platform::Instagram, "this product stopped working");
        let mut bigger = base.clone();
        bigger.author.follower_count = 1_000_000;

        let (sentiment, intent) = analyzed(&base).await;
        let clock = ManualClock::new(base.timestamp);
        let scorer = scorer(clock);
        let brand = BrandContext::new("b1");

        let low = scorer.score(&base, &sentiment, &intent, &brand);
        let high = scorer.score(&bigger, &sentiment, &intent, &brand);
        assert!(high.overall >= low.overall);
        assert!(high.components.reach > low.components.reach);
    }

    #[tokio::test]
    async fn playbook_rule_match_raises_risk() {
        let event = SocialEvent::new("e6", Platform::Facebook, "is the recall still happening?");
        let (sentiment, intent) = analyzed(&event).await;
        let clock = ManualClock::new(event.timestamp);

        let mut brand = BrandContext::new("b1");
        brand.playbook.rules.push("recall".to_string());
        let flagged = scorer(clock.clone()).score(&event, &sentiment, &intent, &brand);
        assert!(flagged
            .business_rules
            .applied_modifiers
            .contains(&"risk_playbook_rule_match".to_string()));

        let plain = scorer(clock).score(&event, &sentiment, &intent, &BrandContext::new("b1"));
        assert!(flagged.components.brand_risk > plain.components.brand_risk);
    }

    #[tokio::test]
    async fn weak_signals_reduce_confidence() {
        let short = SocialEvent::new("e7", Platform::Rss, "bad");
        let (sentiment, intent) = analyzed(&short).await;
        let clock = ManualClock::new(short.timestamp);
        let score = scorer(clock).score(&short, &sentiment, &intent, &BrandContext::new("b1"));
        // Short text and zero followers both apply
        let expected =
            sentiment.overall.confidence * intent.primary.confidence * 0.8 * 0.8;
        assert!((score.metadata.confidence - expected).abs() < 1e-12);
    }
}
