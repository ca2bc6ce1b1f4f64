//! Decision engine.
//!
//! Orchestrates the full pipeline for one event: cache lookup, admission
//! under the concurrency bound, concurrent sentiment/intent analysis,
//! priority scoring, routing, conditional execution, the quality gate and
//! the audit trail. The whole pipeline runs under one deadline; on expiry a
//! degraded human-review decision is returned with `validation_passed =
//! false` and a timeout audit entry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::analysis::intent::{IntentClassifier, IntentPrediction, IntentResult, UrgencyAssessment};
use crate::analysis::sentiment::{
    OverallSentiment, PlatformAdjusted, SentimentAnalyzer, SentimentLabel, SentimentMetadata,
    SentimentResult,
};
use crate::analysis::topics::TopicEngine;
use crate::clock::SharedClock;
use crate::config::AppConfig;
use crate::decision::executor::{ActionExecutor, ExecutionContext, ExecutionResult, ExecutionStatus};
use crate::decision::output::{build_output, DecisionOutput};
use crate::decision::priority::PriorityScorer;
use crate::decision::router::{
    ActionType, DecisionRouter, EscalationPlan, MonitoringPlan, PlannedAction, QueueAssignment,
    Route, RoutingDecision,
};
use crate::error::{CoreError, CoreResult};
use crate::metrics::PipelineMetrics;
use crate::models::{BrandContext, IntentCategory, SocialEvent, UrgencyLevel};
use crate::storage::DecisionRepository;

/// Auto-responses below this routing confidence fail the quality gate
const AUTO_RESPONSE_GATE: f64 = 0.8;

/// One ordered step of the pipeline's audit trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

/// Persisted form of a finished decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub id: String,
    pub event_id: String,
    pub output: DecisionOutput,
    pub audit_trail: Vec<AuditEntry>,
    pub validation_passed: bool,
    pub elapsed_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEngineResult {
    pub output: DecisionOutput,
    pub routing: RoutingDecision,
    pub execution: Vec<ExecutionResult>,
    pub validation_passed: bool,
    pub audit_trail: Vec<AuditEntry>,
    pub from_cache: bool,
    pub elapsed_ms: u64,
}

struct CacheSlot {
    result: DecisionEngineResult,
    inserted_at: DateTime<Utc>,
}

pub struct DecisionEngine {
    config: AppConfig,
    sentiment: Arc<SentimentAnalyzer>,
    intent: Arc<IntentClassifier>,
    priority: PriorityScorer,
    router: DecisionRouter,
    executor: Option<Arc<ActionExecutor>>,
    topics: Option<Arc<tokio::sync::Mutex<TopicEngine>>>,
    decisions: Option<Arc<dyn DecisionRepository>>,
    clock: SharedClock,
    // Shared state, lock order: cache < active < cluster
    cache: Mutex<HashMap<String, CacheSlot>>,
    active: Mutex<HashSet<String>>,
    semaphore: Arc<Semaphore>,
    metrics: Arc<PipelineMetrics>,
}

impl DecisionEngine {
    pub fn new(config: AppConfig, clock: SharedClock) -> Self {
        let sentiment = Arc::new(SentimentAnalyzer::new(config.sentiment.clone()));
        let intent = Arc::new(IntentClassifier::new(config.intent.clone()));
        let priority = PriorityScorer::new(config.priority.clone(), clock.clone());
        let router = DecisionRouter::new(config.routing.clone());
        let semaphore = Arc::new(Semaphore::new(config.engine.max_concurrent_decisions));

        Self {
            config,
            sentiment,
            intent,
            priority,
            router,
            executor: None,
            topics: None,
            decisions: None,
            clock,
            cache: Mutex::new(HashMap::new()),
            active: Mutex::new(HashSet::new()),
            semaphore,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    pub fn with_executor(mut self, executor: Arc<ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_topic_engine(mut self, topics: Arc<tokio::sync::Mutex<TopicEngine>>) -> Self {
        self.topics = Some(topics);
        self
    }

    pub fn with_audit_repository(mut self, decisions: Arc<dyn DecisionRepository>) -> Self {
        self.decisions = Some(decisions);
        self
    }

    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    pub fn active_decisions(&self) -> usize {
        self.active.lock().len()
    }

    /// Run the full pipeline for one event.
    pub async fn process(
        &self,
        event: &SocialEvent,
        brand: &BrandContext,
    ) -> CoreResult<DecisionEngineResult> {
        if self.config.engine.enable_decision_caching {
            if let Some(cached) = self.cache_lookup(&event.id) {
                self.metrics.record_cache_hit();
                return Ok(cached);
            }
            self.metrics.record_cache_miss();
        }

        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                self.metrics.record_capacity_rejection();
                let max = self.config.engine.max_concurrent_decisions;
                tracing::warn!(event_id = %event.id, max, "decision pool full, rejecting");
                return Err(CoreError::CapacityExceeded {
                    in_flight: max,
                    max,
                });
            }
        };

        self.active.lock().insert(event.id.clone());
        let started = Instant::now();

        let timeout = std::time::Duration::from_millis(self.config.engine.decision_timeout_ms);
        let outcome = tokio::time::timeout(timeout, self.run_pipeline(event, brand)).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let mut result = match outcome {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_timeout();
                tracing::warn!(
                    event_id = %event.id,
                    timeout_ms = self.config.engine.decision_timeout_ms,
                    "decision pipeline deadline exceeded"
                );
                self.timeout_fallback(event, brand)
            }
        };
        result.elapsed_ms = elapsed_ms;

        self.active.lock().remove(&event.id);
        drop(permit);

        self.metrics
            .record_decision(result.routing.route, elapsed_ms as f64, result.validation_passed);

        if self.config.quality_assurance.enable_audit_logging {
            if let Some(repo) = &self.decisions {
                let record = DecisionRecord {
                    id: result.output.id.clone(),
                    event_id: event.id.clone(),
                    output: result.output.clone(),
                    audit_trail: result.audit_trail.clone(),
                    validation_passed: result.validation_passed,
                    elapsed_ms,
                    created_at: self.clock.now(),
                };
                if let Err(err) = repo.record_decision(&record).await {
                    tracing::error!(decision_id = %record.id, error = %err,
                        "failed to persist decision audit");
                }
            }
        }

        if self.config.engine.enable_decision_caching {
            self.cache_store(&event.id, &result);
        }

        Ok(result)
    }

    /// Batch processing. Topic state is refreshed once per batch; each
    /// decision is then identical to a standalone `process` call.
    pub async fn process_batch(
        &self,
        events: &[SocialEvent],
        brand: &BrandContext,
    ) -> Vec<CoreResult<DecisionEngineResult>> {
        if let Some(topics) = &self.topics {
            topics.lock().await.process(events).await;
        }
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            results.push(self.process(event, brand).await);
        }
        results
    }

    async fn run_pipeline(
        &self,
        event: &SocialEvent,
        brand: &BrandContext,
    ) -> DecisionEngineResult {
        let mut audit = Vec::new();
        self.audit(&mut audit, "new", format!("event {} accepted", event.id));

        // C1 and C2 run concurrently inside the decision
        let analysis_started = Instant::now();
        let (sentiment, intent) =
            tokio::join!(self.sentiment.analyze(event), self.intent.detect(event));
        self.audit(
            &mut audit,
            "analyzed",
            format!(
                "sentiment {} ({:.2}), intent {} ({:.2}), urgency {} in {}ms",
                sentiment.overall.label.as_str(),
                sentiment.overall.score,
                intent.primary.intent.as_str(),
                intent.primary.confidence,
                intent.urgency.level.as_str(),
                analysis_started.elapsed().as_millis(),
            ),
        );

        let priority = self.priority.score(event, &sentiment, &intent, brand);
        self.audit(
            &mut audit,
            "prioritized",
            format!(
                "priority {:.1}, auto_escalation {}",
                priority.overall, priority.business_rules.auto_escalation
            ),
        );

        let routing = self.router.route(event, &sentiment, &intent, &priority, brand);
        self.audit(
            &mut audit,
            "routed",
            format!(
                "route {} confidence {:.3}",
                routing.route.as_str(),
                routing.confidence
            ),
        );

        let execution = self.execute_if_eligible(event, brand, &routing, &mut audit).await;

        let validation_passed = self.quality_gate(&routing, &execution, &mut audit);

        let topics = self.topic_labels(event).await;
        let output = build_output(
            event,
            brand,
            &sentiment,
            &intent,
            topics,
            &priority,
            &routing,
            self.clock.now(),
        );
        self.audit(&mut audit, "closed", format!("decision {}", output.id));

        DecisionEngineResult {
            output,
            routing,
            execution,
            validation_passed,
            audit_trail: audit,
            from_cache: false,
            elapsed_ms: 0,
        }
    }

    async fn execute_if_eligible(
        &self,
        event: &SocialEvent,
        brand: &BrandContext,
        routing: &RoutingDecision,
        audit: &mut Vec<AuditEntry>,
    ) -> Vec<ExecutionResult> {
        let Some(executor) = &self.executor else {
            self.audit(audit, "queued", "no executor attached".to_string());
            return Vec::new();
        };
        match routing.route {
            Route::AutoResponse | Route::HumanReview => {
                let execution = executor
                    .execute(
                        routing,
                        &ExecutionContext {
                            event,
                            brand,
                            approved: false,
                        },
                    )
                    .await;
                let succeeded = execution
                    .iter()
                    .filter(|r| r.status == ExecutionStatus::Success)
                    .count();
                self.audit(
                    audit,
                    "executed",
                    format!("{succeeded}/{} actions succeeded", execution.len()),
                );
                execution
            }
            Route::Suggestion => {
                // Suggestions wait for reviewer approval
                self.audit(audit, "queued", "awaiting reviewer approval".to_string());
                Vec::new()
            }
        }
    }

    /// Quality gate; a failing gate flags the decision but never drops it.
    fn quality_gate(
        &self,
        routing: &RoutingDecision,
        execution: &[ExecutionResult],
        audit: &mut Vec<AuditEntry>,
    ) -> bool {
        let qa = &self.config.quality_assurance;
        if !qa.enable_validation {
            return true;
        }
        let mut failures = Vec::new();

        if routing.confidence < qa.require_minimum_confidence {
            failures.push(format!(
                "confidence {:.3} below minimum {:.3}",
                routing.confidence, qa.require_minimum_confidence
            ));
        }
        if routing.route == Route::AutoResponse && routing.confidence < AUTO_RESPONSE_GATE {
            failures.push(format!(
                "auto-response confidence {:.3} below {AUTO_RESPONSE_GATE}",
                routing.confidence
            ));
        }
        let escalation_failed = execution.iter().any(|r| {
            r.action_type == ActionType::Escalate
                && r.status == ExecutionStatus::Failed
                && !r.recoverable
        });
        if escalation_failed {
            failures.push("escalation handoff failed terminally".to_string());
        }

        if failures.is_empty() {
            true
        } else {
            self.audit(audit, "validation", failures.join("; "));
            false
        }
    }

    /// Degraded decision when the deadline expires: everything defaults to
    /// human review with zero confidence.
    fn timeout_fallback(&self, event: &SocialEvent, brand: &BrandContext) -> DecisionEngineResult {
        let now = self.clock.now();
        let mut audit = Vec::new();
        self.audit(
            &mut audit,
            "timeout",
            format!(
                "pipeline exceeded {}ms deadline",
                self.config.engine.decision_timeout_ms
            ),
        );

        let sentiment = neutral_sentiment();
        let intent = unknown_intent();
        let priority = self.priority.score(event, &sentiment, &intent, brand);
        let routing = timeout_routing();
        let output = build_output(
            event, brand, &sentiment, &intent, Vec::new(), &priority, &routing, now,
        );

        DecisionEngineResult {
            output,
            routing,
            execution: Vec::new(),
            validation_passed: false,
            audit_trail: audit,
            from_cache: false,
            elapsed_ms: 0,
        }
    }

    async fn topic_labels(&self, event: &SocialEvent) -> Vec<String> {
        let Some(topics) = &self.topics else {
            return Vec::new();
        };
        let engine = topics.lock().await;
        let text = event.content.text.to_lowercase();
        engine
            .clusters()
            .iter()
            .filter(|cluster| {
                cluster
                    .keywords
                    .iter()
                    .filter(|keyword| text.contains(keyword.as_str()))
                    .count()
                    >= 2
            })
            .map(|cluster| cluster.label.clone())
            .collect()
    }

    fn cache_lookup(&self, event_id: &str) -> Option<DecisionEngineResult> {
        let ttl = chrono::Duration::milliseconds(self.config.engine.cache_expiration_ms as i64);
        let now = self.clock.now();
        let mut cache = self.cache.lock();
        match cache.get(event_id) {
            Some(slot) if now - slot.inserted_at < ttl => {
                let mut result = slot.result.clone();
                result.from_cache = true;
                Some(result)
            }
            Some(_) => {
                cache.remove(event_id);
                None
            }
            None => None,
        }
    }

    fn cache_store(&self, event_id: &str, result: &DecisionEngineResult) {
        self.cache.lock().insert(
            event_id.to_string(),
            CacheSlot {
                result: result.clone(),
                inserted_at: self.clock.now(),
            },
        );
    }

    fn audit(&self, trail: &mut Vec<AuditEntry>, stage: &str, details: String) {
        trail.push(AuditEntry {
            stage: stage.to_string(),
            timestamp: self.clock.now(),
            details,
        });
    }
}

fn neutral_sentiment() -> SentimentResult {
    SentimentResult {
        overall: OverallSentiment {
            label: SentimentLabel::Neutral,
            score: 0.0,
            confidence: 0.0,
        },
        model_scores: Vec::new(),
        model_errors: vec!["pipeline timeout".to_string()],
        aspect_sentiments: Vec::new(),
        platform_adjusted: PlatformAdjusted {
            original_score: 0.0,
            adjusted_score: 0.0,
            adjustment_factor: 1.0,
        },
        metadata: SentimentMetadata {
            analyzer_version: crate::analysis::sentiment::ANALYZER_VERSION.to_string(),
            token_count: 0,
            models_run: 0,
            fallback_used: true,
        },
    }
}

fn unknown_intent() -> IntentResult {
    IntentResult {
        primary: IntentPrediction {
            intent: IntentCategory::Other,
            confidence: 0.0,
            reasoning: vec!["pipeline timeout".to_string()],
        },
        secondary: None,
        entities: Vec::new(),
        urgency: UrgencyAssessment {
            level: UrgencyLevel::Medium,
            score: 0.5,
            factors: vec!["timeout default".to_string()],
        },
        next_actions: Vec::new(),
        fallback_used: true,
    }
}

fn timeout_routing() -> RoutingDecision {
    RoutingDecision {
        route: Route::HumanReview,
        confidence: 0.0,
        reasoning: vec!["pipeline deadline exceeded".to_string()],
        actions: vec![PlannedAction {
            action_type: ActionType::Escalate,
            template: None,
            priority: 5,
            confidence: 0.0,
            automated: false,
            requires_approval: false,
            parameters: serde_json::json!({"reason": "timeout"}),
        }],
        queue: Some(QueueAssignment {
            queue: "human_review".to_string(),
            priority: 5,
            estimated_wait_minutes: 36.0,
        }),
        escalation: EscalationPlan {
            required: true,
            level: 1,
            reason: Some("pipeline deadline exceeded".to_string()),
        },
        monitoring: MonitoringPlan {
            follow_up_required: true,
            follow_up_minutes: Some(30),
            kpis: vec!["time_to_review".to_string()],
        },
    }
}
