//! Structured routing conditions.
//!
//! Override rules are data, not code: a small expression tree over a fixed
//! set of decision fields, deserialized from configuration and evaluated
//! against a `RuleContext`. Unknown fields or operators fail at config load.

use serde::{Deserialize, Serialize};

use crate::models::{IntentCategory, Platform, UrgencyLevel};

/// Fields a condition may reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Platform,
    Intent,
    Urgency,
    Priority,
    FollowerCount,
    Verified,
    EngagementRate,
}

/// A literal a condition compares against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

/// Condition expression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Eq { field: Field, value: FieldValue },
    Ne { field: Field, value: FieldValue },
    Lt { field: Field, value: f64 },
    Le { field: Field, value: f64 },
    Gt { field: Field, value: f64 },
    Ge { field: Field, value: f64 },
    In { field: Field, values: Vec<FieldValue> },
    And { all: Vec<Condition> },
    Or { any: Vec<Condition> },
    Not { inner: Box<Condition> },
}

/// Snapshot of the decision fields a rule may look at
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub platform: Platform,
    pub intent: IntentCategory,
    pub urgency: UrgencyLevel,
    /// Priority overall score in [0,100]
    pub priority: f64,
    pub follower_count: u64,
    pub verified: bool,
    pub engagement_rate: f64,
}

impl RuleContext {
    /// Numeric view of a field, when one exists. Urgency compares by rank.
    fn numeric(&self, field: Field) -> Option<f64> {
        match field {
            Field::Priority => Some(self.priority),
            Field::FollowerCount => Some(self.follower_count as f64),
            Field::EngagementRate => Some(self.engagement_rate),
            Field::Urgency => Some(match self.urgency {
                UrgencyLevel::Minimal => 0.0,
                UrgencyLevel::Low => 1.0,
                UrgencyLevel::Medium => 2.0,
                UrgencyLevel::High => 3.0,
                UrgencyLevel::Critical => 4.0,
            }),
            Field::Platform | Field::Intent | Field::Verified => None,
        }
    }

    fn matches_value(&self, field: Field, value: &FieldValue) -> bool {
        match (field, value) {
            (Field::Platform, FieldValue::Text(s)) => {
                Platform::parse(s) == Some(self.platform)
            }
            (Field::Intent, FieldValue::Text(s)) => {
                s.eq_ignore_ascii_case(self.intent.as_str())
            }
            (Field::Urgency, FieldValue::Text(s)) => {
                s.eq_ignore_ascii_case(self.urgency.as_str())
            }
            (Field::Verified, FieldValue::Flag(b)) => self.verified == *b,
            (_, FieldValue::Number(n)) => self
                .numeric(field)
                .map(|v| (v - n).abs() < f64::EPSILON)
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl Condition {
    pub fn evaluate(&self, ctx: &RuleContext) -> bool {
        match self {
            Condition::Eq { field, value } => ctx.matches_value(*field, value),
            Condition::Ne { field, value } => !ctx.matches_value(*field, value),
            Condition::Lt { field, value } => {
                ctx.numeric(*field).map(|v| v < *value).unwrap_or(false)
            }
            Condition::Le { field, value } => {
                ctx.numeric(*field).map(|v| v <= *value).unwrap_or(false)
            }
            Condition::Gt { field, value } => {
                ctx.numeric(*field).map(|v| v > *value).unwrap_or(false)
            }
            Condition::Ge { field, value } => {
                ctx.numeric(*field).map(|v| v >= *value).unwrap_or(false)
            }
            Condition::In { field, values } => {
                values.iter().any(|value| ctx.matches_value(*field, value))
            }
            Condition::And { all } => all.iter().all(|c| c.evaluate(ctx)),
            Condition::Or { any } => any.iter().any(|c| c.evaluate(ctx)),
            Condition::Not { inner } => !inner.evaluate(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RuleContext {
        RuleContext {
            platform: Platform::Instagram,
            intent: IntentCategory::Complaint,
            urgency: UrgencyLevel::High,
            priority: 72.0,
            follower_count: 50_000,
            verified: true,
            engagement_rate: 0.08,
        }
    }

    #[test]
    fn compound_condition_evaluates() {
        let condition = Condition::And {
            all: vec![
                Condition::Eq {
                    field: Field::Platform,
                    value: FieldValue::Text("instagram".into()),
                },
                Condition::Ge {
                    field: Field::FollowerCount,
                    value: 10_000.0,
                },
                Condition::Not {
                    inner: Box::new(Condition::Eq {
                        field: Field::Intent,
                        value: FieldValue::Text("spam".into()),
                    }),
                },
            ],
        };
        assert!(condition.evaluate(&ctx()));
    }

    #[test]
    fn urgency_compares_by_rank() {
        let condition = Condition::Ge {
            field: Field::Urgency,
            value: 3.0,
        };
        assert!(condition.evaluate(&ctx()));
        let condition = Condition::Lt {
            field: Field::Urgency,
            value: 3.0,
        };
        assert!(!condition.evaluate(&ctx()));
    }

    #[test]
    fn in_operator_over_intents() {
        let condition = Condition::In {
            field: Field::Intent,
            values: vec![
                FieldValue::Text("complaint".into()),
                FieldValue::Text("question".into()),
            ],
        };
        assert!(condition.evaluate(&ctx()));
    }

    #[test]
    fn conditions_deserialize_from_config_data() {
        let raw = r#"{"op":"and","all":[
            {"op":"eq","field":"verified","value":true},
            {"op":"gt","field":"engagement_rate","value":0.05}
        ]}"#;
        let condition: Condition = serde_json::from_str(raw).expect("parse");
        assert!(condition.evaluate(&ctx()));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let raw = r#"{"op":"exec","field":"platform","value":"instagram"}"#;
        assert!(serde_json::from_str::<Condition>(raw).is_err());
    }
}
