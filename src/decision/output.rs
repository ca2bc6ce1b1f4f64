//! Canonical decision output.
//!
//! The stable schema handed to downstream integrations. Field names are part
//! of the contract; extend, never rename.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::intent::{IntentResult, NextAction};
use crate::analysis::sentiment::SentimentResult;
use crate::decision::priority::PriorityScore;
use crate::decision::router::{PlannedAction, Route, RoutingDecision};
use crate::models::{BrandContext, BrandImpact, SocialEvent, UrgencyLevel};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputBrandContext {
    pub brand_id: String,
    pub playbook_version: String,
    pub matched_persona: String,
    pub compliance_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSentiment {
    pub label: String,
    pub score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputIntent {
    pub intent: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAnalysis {
    pub sentiment: OutputSentiment,
    pub intent: OutputIntent,
    pub topics: Vec<String>,
    pub urgency: UrgencyLevel,
    pub brand_impact: BrandImpact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAction {
    pub action: String,
    pub template: Option<String>,
    pub priority: u8,
    pub automated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDecision {
    pub primary_action: OutputAction,
    pub secondary_actions: Vec<OutputAction>,
    pub confidence: f64,
    pub reasoning: Vec<String>,
    pub human_review_required: bool,
    pub escalation_level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecommendedAction {
    pub action: String,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMonitoring {
    pub tracking_id: String,
    pub kpis: Vec<String>,
    pub follow_up_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutput {
    pub id: String,
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub brand_context: OutputBrandContext,
    pub analysis: OutputAnalysis,
    pub decision: OutputDecision,
    pub recommended_actions: Vec<OutputRecommendedAction>,
    pub webhooks: Vec<String>,
    pub monitoring: OutputMonitoring,
}

fn output_action(action: &PlannedAction) -> OutputAction {
    OutputAction {
        action: action.action_type.as_str().to_string(),
        template: action.template.clone(),
        priority: action.priority,
        automated: action.automated,
    }
}

fn brand_impact_of(priority: &PriorityScore) -> BrandImpact {
    let risk = priority.components.brand_risk;
    if risk < 0.33 {
        BrandImpact::Low
    } else if risk < 0.66 {
        BrandImpact::Medium
    } else {
        BrandImpact::High
    }
}

/// Assemble the canonical output from the pipeline stages.
pub fn build_output(
    event: &SocialEvent,
    brand: &BrandContext,
    sentiment: &SentimentResult,
    intent: &IntentResult,
    topics: Vec<String>,
    priority: &PriorityScore,
    routing: &RoutingDecision,
    now: DateTime<Utc>,
) -> DecisionOutput {
    let human_review_required = routing.route == Route::HumanReview;
    let compliance_status = if human_review_required {
        "review_required"
    } else {
        "compliant"
    };

    let mut actions = routing.actions.iter();
    let primary_action = actions
        .next()
        .map(output_action)
        .unwrap_or(OutputAction {
            action: "monitor".to_string(),
            template: None,
            priority: 1,
            automated: true,
        });
    let secondary_actions: Vec<OutputAction> = actions.map(output_action).collect();

    let recommended_actions = intent
        .next_actions
        .iter()
        .map(|NextAction { action, priority }| OutputRecommendedAction {
            action: action.clone(),
            priority: *priority,
        })
        .collect();

    let follow_up_date = routing
        .monitoring
        .follow_up_minutes
        .map(|minutes| now + Duration::minutes(minutes));

    DecisionOutput {
        id: Uuid::new_v4().to_string(),
        event_id: event.id.clone(),
        timestamp: now,
        brand_context: OutputBrandContext {
            brand_id: brand.brand_id.clone(),
            playbook_version: brand.playbook.version.clone(),
            matched_persona: brand.default_persona().to_string(),
            compliance_status: compliance_status.to_string(),
        },
        analysis: OutputAnalysis {
            sentiment: OutputSentiment {
                label: sentiment.overall.label.as_str().to_string(),
                score: sentiment.overall.score,
                confidence: sentiment.overall.confidence,
            },
            intent: OutputIntent {
                intent: intent.primary.intent.as_str().to_string(),
                confidence: intent.primary.confidence,
            },
            topics,
            urgency: intent.urgency.level,
            brand_impact: brand_impact_of(priority),
        },
        decision: OutputDecision {
            primary_action,
            secondary_actions,
            confidence: routing.confidence,
            reasoning: routing.reasoning.clone(),
            human_review_required,
            escalation_level: routing.escalation.level,
        },
        recommended_actions,
        webhooks: Vec::new(),
        monitoring: OutputMonitoring {
            tracking_id: Uuid::new_v4().to_string(),
            kpis: routing.monitoring.kpis.clone(),
            follow_up_required: routing.monitoring.follow_up_required,
            follow_up_date,
        },
    }
}
