//! Action execution.
//!
//! Dispatches a routed decision's actions to the reply publisher and the
//! escalation notifier. Only `auto_response` decisions execute unprompted;
//! `suggestion` decisions need an explicit approval. Transient dispatch
//! failures are recoverable; validation failures are terminal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decision::router::{ActionType, PlannedAction, Route, RoutingDecision};
use crate::error::{CoreError, CoreResult};
use crate::models::{BrandContext, SocialEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action_type: ActionType,
    pub status: ExecutionStatus,
    pub detail: Option<String>,
    /// Whether a retry might succeed
    pub recoverable: bool,
}

/// Outbound reply seam; network clients live outside the core.
#[async_trait::async_trait]
pub trait ReplyPublisher: Send + Sync {
    /// Returns the platform-side post id of the published reply.
    async fn publish_reply(
        &self,
        event: &SocialEvent,
        template: &str,
        parameters: &serde_json::Value,
    ) -> CoreResult<String>;
}

/// Escalation/notification seam for review handoffs.
#[async_trait::async_trait]
pub trait EscalationNotifier: Send + Sync {
    async fn notify(&self, queue: &str, payload: &serde_json::Value) -> CoreResult<()>;
}

pub struct ExecutionContext<'a> {
    pub event: &'a SocialEvent,
    pub brand: &'a BrandContext,
    /// Reviewer approval for suggestion decisions
    pub approved: bool,
}

pub struct ActionExecutor {
    publisher: Arc<dyn ReplyPublisher>,
    notifier: Arc<dyn EscalationNotifier>,
}

impl ActionExecutor {
    pub fn new(publisher: Arc<dyn ReplyPublisher>, notifier: Arc<dyn EscalationNotifier>) -> Self {
        Self {
            publisher,
            notifier,
        }
    }

    pub async fn execute(
        &self,
        routing: &RoutingDecision,
        context: &ExecutionContext<'_>,
    ) -> Vec<ExecutionResult> {
        let executable = match routing.route {
            Route::AutoResponse => true,
            Route::Suggestion => context.approved,
            Route::HumanReview => false,
        };

        let mut results = Vec::with_capacity(routing.actions.len());
        for action in &routing.actions {
            if !executable && action.action_type != ActionType::Escalate {
                results.push(ExecutionResult {
                    action_type: action.action_type,
                    status: ExecutionStatus::Skipped,
                    detail: Some("route not executable".to_string()),
                    recoverable: false,
                });
                continue;
            }
            if action.requires_approval && !context.approved {
                results.push(ExecutionResult {
                    action_type: action.action_type,
                    status: ExecutionStatus::Skipped,
                    detail: Some("approval required".to_string()),
                    recoverable: false,
                });
                continue;
            }
            results.push(self.execute_action(action, routing, context).await);
        }
        results
    }

    async fn execute_action(
        &self,
        action: &PlannedAction,
        routing: &RoutingDecision,
        context: &ExecutionContext<'_>,
    ) -> ExecutionResult {
        if let Err(err) = validate_action(action) {
            return ExecutionResult {
                action_type: action.action_type,
                status: ExecutionStatus::Failed,
                detail: Some(err.to_string()),
                recoverable: false,
            };
        }

        let outcome: CoreResult<Option<String>> = match action.action_type {
            ActionType::Respond | ActionType::Suggest => {
                let template = action.template.as_deref().unwrap_or_default();
                self.publisher
                    .publish_reply(context.event, template, &action.parameters)
                    .await
                    .map(Some)
            }
            ActionType::Escalate | ActionType::Notify => {
                let queue = routing
                    .queue
                    .as_ref()
                    .map(|q| q.queue.as_str())
                    .unwrap_or("default");
                self.notifier
                    .notify(queue, &action.parameters)
                    .await
                    .map(|_| None)
            }
            ActionType::Monitor => Ok(Some("monitoring registered".to_string())),
        };

        match outcome {
            Ok(detail) => {
                tracing::debug!(
                    action = action.action_type.as_str(),
                    event_id = %context.event.id,
                    "action executed"
                );
                ExecutionResult {
                    action_type: action.action_type,
                    status: ExecutionStatus::Success,
                    detail,
                    recoverable: false,
                }
            }
            Err(err) => {
                let recoverable = err.is_retryable();
                tracing::warn!(
                    action = action.action_type.as_str(),
                    event_id = %context.event.id,
                    error = %err,
                    recoverable,
                    "action failed"
                );
                ExecutionResult {
                    action_type: action.action_type,
                    status: ExecutionStatus::Failed,
                    detail: Some(err.to_string()),
                    recoverable,
                }
            }
        }
    }
}

fn validate_action(action: &PlannedAction) -> CoreResult<()> {
    match action.action_type {
        ActionType::Respond | ActionType::Suggest => {
            let template = action.template.as_deref().unwrap_or_default();
            if template.is_empty() {
                return Err(CoreError::Validation(
                    "response action without template".into(),
                ));
            }
            if template == "no_reply" {
                return Err(CoreError::Validation(
                    "template forbids replying".into(),
                ));
            }
        }
        ActionType::Escalate | ActionType::Notify | ActionType::Monitor => {}
    }
    if !(1..=10).contains(&action.priority) {
        return Err(CoreError::Validation(format!(
            "action priority {} out of range",
            action.priority
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::router::{EscalationPlan, MonitoringPlan, QueueAssignment};
    use crate::models::Platform;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        replies: Mutex<Vec<String>>,
        fail_with: Mutex<Option<CoreError>>,
    }

    #[async_trait::async_trait]
    impl ReplyPublisher for RecordingPublisher {
        async fn publish_reply(
            &self,
            _event: &SocialEvent,
            template: &str,
            _parameters: &serde_json::Value,
        ) -> CoreResult<String> {
            if let Some(err) = self.fail_with.lock().take() {
                return Err(err);
            }
            self.replies.lock().push(template.to_string());
            Ok(format!("post-{template}"))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notifications: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl EscalationNotifier for RecordingNotifier {
        async fn notify(&self, queue: &str, _payload: &serde_json::Value) -> CoreResult<()> {
            self.notifications.lock().push(queue.to_string());
            Ok(())
        }
    }

    fn respond_action(template: &str) -> PlannedAction {
        PlannedAction {
            action_type: ActionType::Respond,
            template: Some(template.to_string()),
            priority: 3,
            confidence: 0.9,
            automated: true,
            requires_approval: false,
            parameters: serde_json::json!({}),
        }
    }

    fn decision(route: Route, actions: Vec<PlannedAction>) -> RoutingDecision {
        RoutingDecision {
            route,
            confidence: 0.9,
            reasoning: vec![],
            actions,
            queue: Some(QueueAssignment {
                queue: "human_review".into(),
                priority: 5,
                estimated_wait_minutes: 30.0,
            }),
            escalation: EscalationPlan {
                required: false,
                level: 0,
                reason: None,
            },
            monitoring: MonitoringPlan {
                follow_up_required: false,
                follow_up_minutes: None,
                kpis: vec![],
            },
        }
    }

    fn harness() -> (Arc<RecordingPublisher>, Arc<RecordingNotifier>, ActionExecutor) {
        let publisher = Arc::new(RecordingPublisher::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let executor = ActionExecutor::new(publisher.clone(), notifier.clone());
        (publisher, notifier, executor)
    }

    fn context<'a>(
        event: &'a SocialEvent,
        brand: &'a BrandContext,
        approved: bool,
    ) -> ExecutionContext<'a> {
        ExecutionContext {
            event,
            brand,
            approved,
        }
    }

    #[tokio::test]
    async fn auto_response_publishes_reply() {
        let (publisher, _, executor) = harness();
        let event = SocialEvent::new("e1", Platform::Instagram, "love it");
        let brand = BrandContext::new("b1");
        let routing = decision(Route::AutoResponse, vec![respond_action("thank_you")]);

        let results = executor
            .execute(&routing, &context(&event, &brand, false))
            .await;
        assert_eq!(results[0].status, ExecutionStatus::Success);
        assert_eq!(results[0].detail.as_deref(), Some("post-thank_you"));
        assert_eq!(publisher.replies.lock().as_slice(), ["thank_you"]);
    }

    #[tokio::test]
    async fn unapproved_suggestion_is_skipped() {
        let (publisher, _, executor) = harness();
        let event = SocialEvent::new("e1", Platform::Instagram, "love it");
        let brand = BrandContext::new("b1");
        let mut action = respond_action("thank_you");
        action.action_type = ActionType::Suggest;
        action.requires_approval = true;
        let routing = decision(Route::Suggestion, vec![action]);

        let results = executor
            .execute(&routing, &context(&event, &brand, false))
            .await;
        assert_eq!(results[0].status, ExecutionStatus::Skipped);
        assert!(publisher.replies.lock().is_empty());
    }

    #[tokio::test]
    async fn approved_suggestion_executes() {
        let (publisher, _, executor) = harness();
        let event = SocialEvent::new("e1", Platform::Instagram, "love it");
        let brand = BrandContext::new("b1");
        let mut action = respond_action("thank_you");
        action.action_type = ActionType::Suggest;
        action.requires_approval = true;
        let routing = decision(Route::Suggestion, vec![action]);

        let results = executor
            .execute(&routing, &context(&event, &brand, true))
            .await;
        assert_eq!(results[0].status, ExecutionStatus::Success);
        assert_eq!(publisher.replies.lock().len(), 1);
    }

    #[tokio::test]
    async fn escalation_notifies_review_queue() {
        let (_, notifier, executor) = harness();
        let event = SocialEvent::new("e1", Platform::Facebook, "broken");
        let brand = BrandContext::new("b1");
        let routing = decision(
            Route::HumanReview,
            vec![PlannedAction {
                action_type: ActionType::Escalate,
                template: None,
                priority: 8,
                confidence: 0.4,
                automated: false,
                requires_approval: false,
                parameters: serde_json::json!({"reason": "urgent"}),
            }],
        );

        let results = executor
            .execute(&routing, &context(&event, &brand, false))
            .await;
        assert_eq!(results[0].status, ExecutionStatus::Success);
        assert_eq!(notifier.notifications.lock().as_slice(), ["human_review"]);
    }

    #[tokio::test]
    async fn transient_failure_is_recoverable() {
        let (publisher, _, executor) = harness();
        *publisher.fail_with.lock() =
            Some(CoreError::TransientUpstream("rate limited".into()));
        let event = SocialEvent::new("e1", Platform::Instagram, "love it");
        let brand = BrandContext::new("b1");
        let routing = decision(Route::AutoResponse, vec![respond_action("thank_you")]);

        let results = executor
            .execute(&routing, &context(&event, &brand, false))
            .await;
        assert_eq!(results[0].status, ExecutionStatus::Failed);
        assert!(results[0].recoverable);
    }

    #[tokio::test]
    async fn validation_failure_is_terminal() {
        let (_, _, executor) = harness();
        let event = SocialEvent::new("e1", Platform::Instagram, "love it");
        let brand = BrandContext::new("b1");
        let mut action = respond_action("thank_you");
        action.template = None;
        let routing = decision(Route::AutoResponse, vec![action]);

        let results = executor
            .execute(&routing, &context(&event, &brand, false))
            .await;
        assert_eq!(results[0].status, ExecutionStatus::Failed);
        assert!(!results[0].recoverable);
    }
}
