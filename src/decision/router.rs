//! Confidence-based decision routing.
//!
//! Combines the analysis confidences into one routing confidence, applies
//! ordered override rules and the mandatory-review guards, then picks the
//! route and generates its action set.

use serde::{Deserialize, Serialize};

use crate::analysis::intent::IntentResult;
use crate::analysis::sentiment::SentimentResult;
use crate::config::RoutingConfig;
use crate::decision::priority::PriorityScore;
use crate::decision::rules::RuleContext;
use crate::models::{BrandContext, IntentCategory, SocialEvent, UrgencyLevel};

const SENTIMENT_CONFIDENCE_WEIGHT: f64 = 0.3;
const INTENT_CONFIDENCE_WEIGHT: f64 = 0.4;
const PRIORITY_CONFIDENCE_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    AutoResponse,
    Suggestion,
    HumanReview,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::AutoResponse => "auto_response",
            Route::Suggestion => "suggestion",
            Route::HumanReview => "human_review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Respond,
    Suggest,
    Escalate,
    Monitor,
    Notify,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Respond => "respond",
            ActionType::Suggest => "suggest",
            ActionType::Escalate => "escalate",
            ActionType::Monitor => "monitor",
            ActionType::Notify => "notify",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub action_type: ActionType,
    pub template: Option<String>,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
    pub confidence: f64,
    pub automated: bool,
    pub requires_approval: bool,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueAssignment {
    pub queue: String,
    pub priority: u8,
    pub estimated_wait_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationPlan {
    pub required: bool,
    pub level: u8,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringPlan {
    pub follow_up_required: bool,
    pub follow_up_minutes: Option<i64>,
    pub kpis: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route: Route,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub actions: Vec<PlannedAction>,
    pub queue: Option<QueueAssignment>,
    pub escalation: EscalationPlan,
    pub monitoring: MonitoringPlan,
}

pub struct DecisionRouter {
    config: RoutingConfig,
}

impl DecisionRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn route(
        &self,
        event: &SocialEvent,
        sentiment: &SentimentResult,
        intent: &IntentResult,
        priority: &PriorityScore,
        brand: &BrandContext,
    ) -> RoutingDecision {
        let mut reasoning = Vec::new();

        let mut confidence = SENTIMENT_CONFIDENCE_WEIGHT * sentiment.overall.confidence
            + INTENT_CONFIDENCE_WEIGHT * intent.primary.confidence
            + PRIORITY_CONFIDENCE_WEIGHT * priority.metadata.confidence;
        reasoning.push(format!("combined confidence {confidence:.3}"));

        let rule_context = RuleContext {
            platform: event.platform,
            intent: intent.primary.intent,
            urgency: intent.urgency.level,
            priority: priority.overall,
            follower_count: event.author.follower_count,
            verified: event.author.verified,
            engagement_rate: event.engagement.engagement_rate,
        };
        // Ordered overrides: first match wins
        for rule in &self.config.overrides {
            if rule.condition.evaluate(&rule_context) {
                reasoning.push(format!(
                    "override '{}' set confidence {:.3} -> {:.3}",
                    rule.name, confidence, rule.confidence
                ));
                confidence = rule.confidence;
                break;
            }
        }

        if let Some(reason) = self.mandatory_review_reason(intent, priority) {
            reasoning.push(reason.clone());
            return self.human_review_decision(
                event, intent, priority, brand, confidence, reasoning, Some(reason),
            );
        }

        let thresholds = &self.config.confidence_thresholds;
        if self
            .config
            .never_auto_respond
            .contains(&intent.primary.intent)
        {
            reasoning.push(format!(
                "intent {} never auto-responds",
                intent.primary.intent.as_str()
            ));
            if confidence >= thresholds.suggestion {
                return self.suggestion_decision(
                    event, intent, priority, brand, confidence, reasoning,
                );
            }
            return self.human_review_decision(
                event, intent, priority, brand, confidence, reasoning, None,
            );
        }

        if confidence >= thresholds.auto_response {
            reasoning.push(format!(
                "confidence {confidence:.3} ≥ auto threshold {:.3}",
                thresholds.auto_response
            ));
            self.auto_decision(event, intent, priority, brand, confidence, reasoning)
        } else if confidence >= thresholds.suggestion {
            reasoning.push(format!(
                "confidence {confidence:.3} ≥ suggestion threshold {:.3}",
                thresholds.suggestion
            ));
            self.suggestion_decision(event, intent, priority, brand, confidence, reasoning)
        } else {
            reasoning.push(format!(
                "confidence {confidence:.3} below suggestion threshold {:.3}",
                thresholds.suggestion
            ));
            self.human_review_decision(event, intent, priority, brand, confidence, reasoning, None)
        }
    }

    fn mandatory_review_reason(
        &self,
        intent: &IntentResult,
        priority: &PriorityScore,
    ) -> Option<String> {
        let rules = &self.config.always_human_review;
        if rules.intents.contains(&intent.primary.intent) {
            return Some(format!(
                "mandatory review: intent {}",
                intent.primary.intent.as_str()
            ));
        }
        if rules.urgencies.contains(&intent.urgency.level) {
            return Some(format!(
                "mandatory review: urgency {}",
                intent.urgency.level.as_str()
            ));
        }
        if let Some(threshold) = rules.priority_threshold {
            if priority.overall >= threshold {
                return Some(format!(
                    "mandatory review: priority {:.1} ≥ {threshold:.1}",
                    priority.overall
                ));
            }
        }
        None
    }

    fn auto_decision(
        &self,
        event: &SocialEvent,
        intent: &IntentResult,
        priority: &PriorityScore,
        brand: &BrandContext,
        confidence: f64,
        reasoning: Vec<String>,
    ) -> RoutingDecision {
        let queue_priority = queue_priority(priority.overall, intent.urgency.level);
        let template = response_template(intent.primary.intent);
        let parameters = serde_json::json!({
            "event_id": event.id,
            "platform": event.platform.as_str(),
            "persona": brand.default_persona(),
            "playbook_version": brand.playbook.version,
        });

        let actions = vec![
            PlannedAction {
                action_type: ActionType::Respond,
                template: Some(template.to_string()),
                priority: queue_priority,
                confidence,
                automated: true,
                requires_approval: false,
                parameters: parameters.clone(),
            },
            PlannedAction {
                action_type: ActionType::Monitor,
                template: None,
                priority: 1,
                confidence,
                automated: true,
                requires_approval: false,
                parameters,
            },
        ];

        RoutingDecision {
            route: Route::AutoResponse,
            confidence,
            reasoning,
            actions,
            queue: None,
            escalation: EscalationPlan {
                required: false,
                level: 0,
                reason: None,
            },
            monitoring: MonitoringPlan {
                follow_up_required: true,
                follow_up_minutes: Some(60),
                kpis: vec![
                    "response_sentiment".to_string(),
                    "engagement_delta".to_string(),
                ],
            },
        }
    }

    fn suggestion_decision(
        &self,
        event: &SocialEvent,
        intent: &IntentResult,
        priority: &PriorityScore,
        brand: &BrandContext,
        confidence: f64,
        reasoning: Vec<String>,
    ) -> RoutingDecision {
        let queue_priority = queue_priority(priority.overall, intent.urgency.level);
        let template = response_template(intent.primary.intent);
        let parameters = serde_json::json!({
            "event_id": event.id,
            "platform": event.platform.as_str(),
            "persona": brand.default_persona(),
        });

        // Candidate responses for the reviewer to pick from
        let actions = vec![
            PlannedAction {
                action_type: ActionType::Suggest,
                template: Some(template.to_string()),
                priority: queue_priority,
                confidence,
                automated: false,
                requires_approval: true,
                parameters: parameters.clone(),
            },
            PlannedAction {
                action_type: ActionType::Suggest,
                template: Some(format!("{template}_alt")),
                priority: queue_priority.saturating_sub(1).max(1),
                confidence: (confidence * 0.9).clamp(0.0, 1.0),
                automated: false,
                requires_approval: true,
                parameters,
            },
        ];

        RoutingDecision {
            route: Route::Suggestion,
            confidence,
            reasoning,
            actions,
            queue: Some(self.queue_assignment("suggestions", queue_priority)),
            escalation: EscalationPlan {
                required: false,
                level: 0,
                reason: None,
            },
            monitoring: MonitoringPlan {
                follow_up_required: false,
                follow_up_minutes: None,
                kpis: vec!["reviewer_acceptance".to_string()],
            },
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn human_review_decision(
        &self,
        event: &SocialEvent,
        intent: &IntentResult,
        priority: &PriorityScore,
        brand: &BrandContext,
        confidence: f64,
        reasoning: Vec<String>,
        mandatory_reason: Option<String>,
    ) -> RoutingDecision {
        let queue_priority = queue_priority(priority.overall, intent.urgency.level);
        let escalation_required =
            mandatory_reason.is_some() || intent.urgency.level >= UrgencyLevel::High;

        let recommendations: Vec<String> = intent
            .next_actions
            .iter()
            .map(|a| a.action.clone())
            .collect();
        let parameters = serde_json::json!({
            "event_id": event.id,
            "platform": event.platform.as_str(),
            "brand_id": brand.brand_id,
            "urgency": intent.urgency.level.as_str(),
            "recommendations": recommendations,
        });

        let actions = vec![PlannedAction {
            action_type: ActionType::Escalate,
            template: None,
            priority: queue_priority,
            confidence,
            automated: false,
            requires_approval: false,
            parameters,
        }];

        RoutingDecision {
            route: Route::HumanReview,
            confidence,
            reasoning,
            actions,
            queue: Some(self.queue_assignment("human_review", queue_priority)),
            escalation: EscalationPlan {
                required: escalation_required,
                level: if intent.urgency.level == UrgencyLevel::Critical {
                    2
                } else if escalation_required {
                    1
                } else {
                    0
                },
                reason: mandatory_reason,
            },
            monitoring: MonitoringPlan {
                follow_up_required: escalation_required,
                follow_up_minutes: if escalation_required { Some(30) } else { None },
                kpis: vec!["time_to_review".to_string()],
            },
        }
    }

    fn queue_assignment(&self, queue: &str, priority: u8) -> QueueAssignment {
        QueueAssignment {
            queue: queue.to_string(),
            priority,
            estimated_wait_minutes: self.config.base_wait_minutes * (11 - priority) as f64 / 10.0,
        }
    }
}

/// Queue priority in [1,10]: score ceiling with an urgency floor
fn queue_priority(overall: f64, urgency: UrgencyLevel) -> u8 {
    let from_score = (overall / 10.0).ceil().clamp(1.0, 10.0) as u8;
    from_score.max(urgency.queue_floor())
}

fn response_template(intent: IntentCategory) -> &'static str {
    match intent {
        IntentCategory::Praise => "thank_you",
        IntentCategory::Question => "answer_faq",
        IntentCategory::PurchaseIntent => "product_info",
        IntentCategory::Feedback => "acknowledge_feedback",
        IntentCategory::Complaint => "apology_with_followup",
        IntentCategory::Spam => "no_reply",
        IntentCategory::Other => "generic_acknowledgement",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::intent::IntentClassifier;
    use crate::analysis::sentiment::SentimentAnalyzer;
    use crate::clock::ManualClock;
    use crate::config::{
        ConfidenceOverride, IntentConfig, PriorityConfig, SentimentConfig,
    };
    use crate::decision::priority::PriorityScorer;
    use crate::decision::rules::{Condition, Field, FieldValue};
    use crate::models::{Author, Engagement, Platform};
    use std::sync::Arc;

    async fn pipeline(
        event: &SocialEvent,
    ) -> (SentimentResult, IntentResult, PriorityScore) {
        let sentiment = SentimentAnalyzer::new(SentimentConfig::default())
            .analyze(event)
            .await;
        let intent = IntentClassifier::new(IntentConfig::default())
            .detect(event)
            .await;
        let clock = ManualClock::new(event.timestamp);
        let priority = PriorityScorer::new(PriorityConfig::default(), Arc::new(clock)).score(
            event,
            &sentiment,
            &intent,
            &BrandContext::new("b1"),
        );
        (sentiment, intent, priority)
    }

    fn praise_event() -> SocialEvent {
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
        event
    }

    #[tokio::test]
    async fn praise_routes_to_auto_response() {
        let event = praise_event();
        let (sentiment, intent, priority) = pipeline(&event).await;
        let decision = DecisionRouter::new(RoutingConfig::default()).route(
            &event,
            &sentiment,
            &intent,
            &priority,
            &BrandContext::new("b1"),
        );

        assert_eq!(decision.route, Route::AutoResponse);
        assert!(decision.confidence >= 0.8);
        let respond = &decision.actions[0];
        assert_eq!(respond.action_type, ActionType::Respond);
        assert_eq!(respond.template.as_deref(), Some("thank_you"));
        assert!(decision
            .actions
            .iter()
            .any(|a| a.action_type == ActionType::Monitor));
    }

    #[tokio::test]
    async fn critical_complaint_routes_to_human_review() {
        let event = SocialEvent::new(
            "e2",
            Platform::Facebook,
            "This is completely broken, I need a refund immediately!",
        );
        let (sentiment, intent, priority) = pipeline(&event).await;
        let decision = DecisionRouter::new(RoutingConfig::default()).route(
            &event,
            &sentiment,
            &intent,
            &priority,
            &BrandContext::new("b1"),
        );

        assert_eq!(decision.route, Route::HumanReview);
        assert!(decision.escalation.required);
        assert_eq!(decision.escalation.level, 2);
        let queue = decision.queue.expect("review queue");
        assert!(queue.priority >= 7);
        assert_eq!(decision.actions[0].action_type, ActionType::Escalate);
    }

    #[tokio::test]
    async fn non_critical_complaint_becomes_suggestion() {
        let event = SocialEvent::new("e3", Platform::Reddit, "pretty disappointed with my order");
        let (sentiment, intent, priority) = pipeline(&event).await;
        assert!(intent.urgency.level < UrgencyLevel::Critical);
        let decision = DecisionRouter::new(RoutingConfig::default()).route(
            &event,
            &sentiment,
            &intent,
            &priority,
            &BrandContext::new("b1"),
        );

        // Complaints never auto-respond
        assert_ne!(decision.route, Route::AutoResponse);
        if decision.route == Route::Suggestion {
            assert!(decision.actions.len() >= 2);
            assert!(decision.actions.iter().all(|a| a.requires_approval));
        }
    }

    #[tokio::test]
    async fn override_rule_rewrites_confidence() {
        let event = praise_event();
        let (sentiment, intent, priority) = pipeline(&event).await;

        let mut config = RoutingConfig::default();
        config.overrides.push(ConfidenceOverride {
            name: "distrust_unverified_reach".into(),
            condition: Condition::Eq {
                field: Field::Platform,
                value: FieldValue::Text("instagram".into()),
            },
            confidence: 0.4,
        });
        let decision = DecisionRouter::new(config).route(
            &event,
            &sentiment,
            &intent,
            &priority,
            &BrandContext::new("b1"),
        );

        assert_eq!(decision.confidence, 0.4);
        assert_ne!(decision.route, Route::AutoResponse);
    }

    #[tokio::test]
    async fn routing_is_monotone_in_confidence() {
        // Same analysis, progressively higher combined confidence can only
        // move the route toward automation
        let event = praise_event();
        let (sentiment, intent, priority) = pipeline(&event).await;
        let brand = BrandContext::new("b1");

        let rank = |route: Route| match route {
            Route::HumanReview => 0,
            Route::Suggestion => 1,
            Route::AutoResponse => 2,
        };

        let mut previous_rank = 0;
        for confidence in [0.1, 0.4, 0.6, 0.85, 0.99] {
            let mut config = RoutingConfig::default();
            config.overrides.push(ConfidenceOverride {
                name: "pin".into(),
                condition: Condition::Ge {
                    field: Field::Priority,
                    value: 0.0,
                },
                confidence,
            });
            let decision = DecisionRouter::new(config).route(
                &event, &sentiment, &intent, &priority, &brand,
            );
            let current = rank(decision.route);
            assert!(current >= previous_rank, "route regressed at {confidence}");
            previous_rank = current;
        }
    }

    #[tokio::test]
    async fn queue_priority_respects_urgency_floor() {
        assert_eq!(queue_priority(5.0, UrgencyLevel::Critical), 9);
        assert_eq!(queue_priority(95.0, UrgencyLevel::Minimal), 10);
        assert_eq!(queue_priority(0.0, UrgencyLevel::Minimal), 1);
        assert_eq!(queue_priority(35.0, UrgencyLevel::Medium), 4);
    }

    #[tokio::test]
    async fn estimated_wait_shrinks_with_priority() {
        let router = DecisionRouter::new(RoutingConfig::default());
        let urgent = router.queue_assignment("q", 10);
        let relaxed = router.queue_assignment("q", 1);
        assert!(urgent.estimated_wait_minutes < relaxed.estimated_wait_minutes);
        assert!((urgent.estimated_wait_minutes - 6.0).abs() < 1e-9);
        assert!((relaxed.estimated_wait_minutes - 60.0).abs() < 1e-9);
    }
}
