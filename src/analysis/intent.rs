//! Intent detection.
//!
//! Rule-engine classifier: per-category keyword/pattern/context scoring with
//! platform modifiers, fixed-pattern entity extraction, an urgency ladder and
//! a next-action table. An optional primary model can sit in front; when it
//! errors the rule engine answers and `fallback_used` is set.

use std::collections::HashSet;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::IntentConfig;
use crate::error::CoreResult;
use crate::models::{IntentCategory, Platform, SocialEvent, UrgencyLevel};

const KEYWORD_POINTS: f64 = 0.3;
const PATTERN_POINTS: f64 = 0.4;
const CONTEXT_POINTS: f64 = 0.2;
const SECONDARY_THRESHOLD: f64 = 0.3;
/// Urgency bonus when at least one time entity is present
const TIME_ENTITY_BONUS: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Product,
    Price,
    Time,
    Email,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: EntityType,
    pub value: String,
    pub confidence: f64,
    /// Byte offset into the original text
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub intent: IntentCategory,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyAssessment {
    pub level: UrgencyLevel,
    pub score: f64,
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextAction {
    pub action: String,
    /// 1 (lowest) to 10 (highest)
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub primary: IntentPrediction,
    pub secondary: Option<IntentPrediction>,
    pub entities: Vec<Entity>,
    pub urgency: UrgencyAssessment,
    pub next_actions: Vec<NextAction>,
    pub fallback_used: bool,
}

/// Optional primary classifier in front of the rule engine (model serving is
/// an external collaborator)
#[async_trait::async_trait]
pub trait IntentModel: Send + Sync {
    async fn classify(&self, text: &str, platform: Platform) -> CoreResult<IntentPrediction>;
}

struct IntentRules {
    intent: IntentCategory,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
    context_clues: &'static [&'static str],
}

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("intent rule pattern")
}

lazy_static! {
    static ref INTENT_RULES: Vec<IntentRules> = vec![
        IntentRules {
            intent: IntentCategory::Complaint,
            keywords: &[
                "broken", "refund", "terrible", "awful", "worst", "disappointed",
                "damaged", "defective", "complaint", "unacceptable", "useless",
            ],
            patterns: vec![
                rx(r"(want|need|demand)\s+(a\s+)?refund"),
                rx(r"(doesn'?t|does\s+not|won'?t|stopped)\s+work"),
                rx(r"completely\s+(broken|useless|ruined)"),
            ],
            context_clues: &["never buying", "money back", "return it", "last time"],
        },
        IntentRules {
            intent: IntentCategory::Question,
            keywords: &["question", "wondering", "curious", "confused"],
            patterns: vec![
                rx(r"\?"),
                rx(r"^(how|what|when|where|why|which|who)\b"),
                rx(r"(can|could|would)\s+(you|someone|anyone)\b"),
                rx(r"does\s+(it|this|anyone)\b"),
            ],
            context_clues: &["anyone know", "help me understand", "not sure"],
        },
        IntentRules {
            intent: IntentCategory::Praise,
            keywords: &[
                "love", "amazing", "best", "awesome", "perfect", "excellent",
                "fantastic", "wonderful", "great", "incredible",
            ],
            patterns: vec![
                rx(r"love\s+(this|it|your)"),
                rx(r"best\s+\w+\s+ever"),
                rx(r"highly\s+recommend"),
            ],
            context_clues: &["thank you", "so happy", "five stars", "made my day"],
        },
        IntentRules {
            intent: IntentCategory::PurchaseIntent,
            keywords: &[
                "buy", "purchase", "order", "price", "cost", "shipping",
                "available", "stock", "restock",
            ],
            patterns: vec![
                rx(r"where\s+(can|do)\s+i\s+(buy|get|order)"),
                rx(r"how\s+much\s+(is|does|for)"),
                rx(r"add(ed)?\s+to\s+cart"),
            ],
            context_clues: &["take my money", "link in bio", "discount code", "ship to"],
        },
        IntentRules {
            intent: IntentCategory::Feedback,
            keywords: &[
                "suggestion", "suggest", "improve", "feature", "wish", "idea",
                "feedback",
            ],
            patterns: vec![
                rx(r"(would|could)\s+be\s+(better|great|nice)\s+if"),
                rx(r"you\s+should\s+(add|make|consider|try)"),
            ],
            context_clues: &["just saying", "my two cents", "for what it's worth"],
        },
        IntentRules {
            intent: IntentCategory::Spam,
            keywords: &[
                "followers", "giveaway", "promo", "subscribe", "crypto", "jackpot",
            ],
            patterns: vec![
                rx(r"(check|click)\s+(out\s+)?(my|this)\s+(link|page|profile|bio)"),
                rx(r"free\s+(money|followers|gift|iphone)"),
                rx(r"\bdm\s+me\b"),
            ],
            context_clues: &["limited offer", "act now", "100% guaranteed"],
        },
    ];

    static ref PRODUCT_ENTITY: Regex =
        rx(r"\b(serum|cream|lotion|moisturizer|product|device|app|order|subscription|item|kit|bundle)\b");
    static ref PRICE_ENTITY: Regex =
        rx(r"\$\d+(?:\.\d{1,2})?|\b\d+\s?(?:dollars|usd|eur|euros|bucks)\b");
    static ref TIME_ENTITY: Regex = rx(
        r"\b(?:today|tomorrow|tonight|yesterday|now|immediately|asap|\d{1,2}(?::\d{2})?\s?(?:am|pm))\b"
    );
    static ref EMAIL_ENTITY: Regex = rx(r"[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}");
}

pub struct IntentClassifier {
    config: IntentConfig,
    primary_model: Option<Arc<dyn IntentModel>>,
}

impl IntentClassifier {
    pub fn new(config: IntentConfig) -> Self {
        Self {
            config,
            primary_model: None,
        }
    }

    pub fn with_primary_model(mut self, model: Arc<dyn IntentModel>) -> Self {
        self.primary_model = Some(model);
        self
    }

    /// Detect intent for one event. Deterministic for a fixed configuration.
    pub async fn detect(&self, event: &SocialEvent) -> IntentResult {
        let text = event.content.text.to_lowercase();

        let (primary, secondary, fallback_used) = match &self.primary_model {
            Some(model) => match model.classify(&text, event.platform).await {
                Ok(prediction) => {
                    let (_, rule_secondary) = self.rank_intents(&text, event.platform);
                    (prediction, rule_secondary, false)
                }
                Err(err) => {
                    tracing::warn!(error = %err, event_id = %event.id,
                        "primary intent model failed, using rule engine");
                    let (rule_primary, rule_secondary) =
                        self.rank_intents(&text, event.platform);
                    (rule_primary, rule_secondary, true)
                }
            },
            None => {
                let (rule_primary, rule_secondary) = self.rank_intents(&text, event.platform);
                (rule_primary, rule_secondary, false)
            }
        };

        let entities = extract_entities(&text);
        let urgency = self.assess_urgency(&text, primary.intent, &entities, event.platform);
        let next_actions = next_actions_for(primary.intent, urgency.level);

        IntentResult {
            primary,
            secondary,
            entities,
            urgency,
            next_actions,
            fallback_used,
        }
    }

    /// Score every category and return (primary, secondary)
    fn rank_intents(
        &self,
        text: &str,
        platform: Platform,
    ) -> (IntentPrediction, Option<IntentPrediction>) {
        let tokens: HashSet<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()))
            .filter(|t| !t.is_empty())
            .collect();
        // Per-platform modifiers are total over the enum; missing entries
        // default to 1.0
        let platform_modifier = self.config.platform_modifier(platform);

        let mut scored: Vec<IntentPrediction> = INTENT_RULES
            .iter()
            .map(|rules| {
                let mut score = 0.0;
                let mut reasoning = Vec::new();

                for keyword in rules.keywords {
                    if tokens.contains(keyword) {
                        score += KEYWORD_POINTS;
                        reasoning.push(format!("keyword '{keyword}' (+{KEYWORD_POINTS})"));
                    }
                }
                for pattern in &rules.patterns {
                    if pattern.is_match(text) {
                        score += PATTERN_POINTS;
                        reasoning.push(format!("pattern /{}/ (+{PATTERN_POINTS})", pattern));
                    }
                }
                for clue in rules.context_clues {
                    if text.contains(clue) {
                        score += CONTEXT_POINTS;
                        reasoning.push(format!("context '{clue}' (+{CONTEXT_POINTS})"));
                    }
                }

                let weighted =
                    (score * self.config.weight(rules.intent) * platform_modifier).clamp(0.0, 1.0);
                IntentPrediction {
                    intent: rules.intent,
                    confidence: weighted,
                    reasoning,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let top = scored.remove(0);
        if top.confidence == 0.0 {
            return (
                IntentPrediction {
                    intent: IntentCategory::Other,
                    confidence: 0.1,
                    reasoning: vec!["no intent signals matched".to_string()],
                },
                None,
            );
        }

        let secondary = scored
            .into_iter()
            .next()
            .filter(|p| p.confidence > SECONDARY_THRESHOLD);
        (top, secondary)
    }

    fn assess_urgency(
        &self,
        text: &str,
        intent: IntentCategory,
        entities: &[Entity],
        platform: Platform,
    ) -> UrgencyAssessment {
        let urgency = &self.config.urgency;
        let mut factors = Vec::new();

        let base = urgency.base_by_intent.get(&intent).copied().unwrap_or(0.1);
        let mut score = base;
        factors.push(format!("intent {} base {base:.2}", intent.as_str()));

        // Deterministic iteration: sorted keyword order
        let mut time_hits: Vec<(&String, &f64)> = urgency
            .time_keywords
            .iter()
            .filter(|(keyword, _)| text.contains(keyword.as_str()))
            .collect();
        time_hits.sort_by(|a, b| a.0.cmp(b.0));
        for (keyword, impact) in time_hits {
            score += impact;
            factors.push(format!("time keyword '{keyword}' +{impact:.2}"));
        }

        let mut emotion_hits: Vec<(&String, &f64)> = urgency
            .emotion_keywords
            .iter()
            .filter(|(keyword, _)| text.contains(keyword.as_str()))
            .collect();
        emotion_hits.sort_by(|a, b| a.0.cmp(b.0));
        for (keyword, impact) in emotion_hits {
            score += impact;
            factors.push(format!("emotion keyword '{keyword}' +{impact:.2}"));
        }

        if entities
            .iter()
            .any(|e| e.entity_type == EntityType::Time)
        {
            score += TIME_ENTITY_BONUS;
            factors.push(format!("time entity present +{TIME_ENTITY_BONUS:.2}"));
        }

        // Missing platforms default to 1.0
        let modifier = urgency
            .platform_modifiers
            .get(&platform)
            .copied()
            .unwrap_or(1.0);
        let score = (score * modifier).clamp(0.0, 1.0);

        UrgencyAssessment {
            level: UrgencyLevel::from_score(score),
            score,
            factors,
        }
    }
}

fn extract_entities(text: &str) -> Vec<Entity> {
    let mut entities = Vec::new();
    let specs: [(&Regex, EntityType, f64); 4] = [
        (&EMAIL_ENTITY, EntityType::Email, 0.95),
        (&PRICE_ENTITY, EntityType::Price, 0.9),
        (&TIME_ENTITY, EntityType::Time, 0.8),
        (&PRODUCT_ENTITY, EntityType::Product, 0.6),
    ];
    for (pattern, entity_type, confidence) in specs {
        for found in pattern.find_iter(text) {
            entities.push(Entity {
                entity_type,
                value: found.as_str().to_string(),
                confidence,
                position: found.start(),
            });
        }
    }
    entities.sort_by_key(|e| e.position);
    entities
}

/// Fixed next-action table, nudged ±1 priority by urgency
fn next_actions_for(intent: IntentCategory, urgency: UrgencyLevel) -> Vec<NextAction> {
    let base: &[(&str, u8)] = match intent {
        IntentCategory::Complaint => &[
            ("respond_with_apology", 8),
            ("escalate_to_support", 7),
            ("follow_up", 5),
        ],
        IntentCategory::Question => &[("answer_question", 6), ("link_documentation", 4)],
        IntentCategory::Praise => &[("thank_author", 3), ("amplify_post", 2)],
        IntentCategory::PurchaseIntent => &[("send_product_link", 6), ("notify_sales", 5)],
        IntentCategory::Feedback => &[("log_feature_request", 4), ("acknowledge", 3)],
        IntentCategory::Spam => &[("hide_or_report", 2)],
        IntentCategory::Other => &[("monitor", 1)],
    };

    let adjustment: i8 = match urgency {
        UrgencyLevel::High | UrgencyLevel::Critical => 1,
        UrgencyLevel::Minimal | UrgencyLevel::Low => -1,
        UrgencyLevel::Medium => 0,
    };

    base.iter()
        .map(|(action, priority)| NextAction {
            action: action.to_string(),
            priority: (*priority as i8 + adjustment).clamp(1, 10) as u8,
        })
        .collect()
}
