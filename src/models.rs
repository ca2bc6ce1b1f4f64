use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Social platforms the pipeline understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Tiktok,
    Instagram,
    Facebook,
    Youtube,
    Reddit,
    Rss,
}

impl Platform {
    /// Every platform, in a fixed order. Used to validate per-platform
    /// tables for totality.
    pub const ALL: [Platform; 6] = [
        Platform::Tiktok,
        Platform::Instagram,
        Platform::Facebook,
        Platform::Youtube,
        Platform::Reddit,
        Platform::Rss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::Youtube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Rss => "rss",
        }
    }

    pub fn parse(s: &str) -> Option<Platform> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tiktok" => Some(Platform::Tiktok),
            "instagram" => Some(Platform::Instagram),
            "facebook" => Some(Platform::Facebook),
            "youtube" => Some(Platform::Youtube),
            "reddit" => Some(Platform::Reddit),
            "rss" => Some(Platform::Rss),
            _ => None,
        }
    }
}

/// Intent categories recognized by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    Complaint,
    Question,
    Praise,
    PurchaseIntent,
    Feedback,
    Spam,
    Other,
}

impl IntentCategory {
    pub const ALL: [IntentCategory; 7] = [
        IntentCategory::Complaint,
        IntentCategory::Question,
        IntentCategory::Praise,
        IntentCategory::PurchaseIntent,
        IntentCategory::Feedback,
        IntentCategory::Spam,
        IntentCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentCategory::Complaint => "complaint",
            IntentCategory::Question => "question",
            IntentCategory::Praise => "praise",
            IntentCategory::PurchaseIntent => "purchase_intent",
            IntentCategory::Feedback => "feedback",
            IntentCategory::Spam => "spam",
            IntentCategory::Other => "other",
        }
    }
}

/// Urgency ladder shared by the intent classifier, priority scorer and router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Minimal => "minimal",
            UrgencyLevel::Low => "low",
            UrgencyLevel::Medium => "medium",
            UrgencyLevel::High => "high",
            UrgencyLevel::Critical => "critical",
        }
    }

    /// Map a score in [0,1] onto the ladder (thresholds 0.2/0.4/0.6/0.8)
    pub fn from_score(score: f64) -> UrgencyLevel {
        if score >= 0.8 {
            UrgencyLevel::Critical
        } else if score >= 0.6 {
            UrgencyLevel::High
        } else if score >= 0.4 {
            UrgencyLevel::Medium
        } else if score >= 0.2 {
            UrgencyLevel::Low
        } else {
            UrgencyLevel::Minimal
        }
    }

    /// Queue-priority floor in [1,10] used by the router
    pub fn queue_floor(&self) -> u8 {
        match self {
            UrgencyLevel::Minimal => 1,
            UrgencyLevel::Low => 2,
            UrgencyLevel::Medium => 4,
            UrgencyLevel::High => 7,
            UrgencyLevel::Critical => 9,
        }
    }
}

/// Coarse brand-impact classification surfaced in the decision output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandImpact {
    Low,
    Medium,
    High,
}

/// Text payload of an inbound event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContent {
    pub text: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
}

/// Author of an inbound event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub display_name: String,
    pub follower_count: u64,
    pub verified: bool,
}

/// Engagement counters at ingest time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Engagement {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    pub views: u64,
    /// Fraction in [0,1]
    pub engagement_rate: f64,
}

impl Engagement {
    pub fn total_interactions(&self) -> u64 {
        self.likes + self.shares + self.comments
    }
}

/// An inbound social-media event. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialEvent {
    pub id: String,
    pub platform: Platform,
    pub timestamp: DateTime<Utc>,
    pub content: EventContent,
    pub author: Author,
    pub engagement: Engagement,
}

impl SocialEvent {
    pub fn new(id: impl Into<String>, platform: Platform, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform,
            timestamp: Utc::now(),
            content: EventContent {
                text: text.into(),
                ..Default::default()
            },
            author: Author::default(),
            engagement: Engagement::default(),
        }
    }

    /// Age of the event in hours relative to the injected clock
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.timestamp).num_milliseconds() as f64 / 1000.0;
        (secs / 3600.0).max(0.0)
    }
}

/// Brand playbook: voice, tone and response rules with a version stamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playbook {
    pub voice: String,
    pub tone: String,
    #[serde(default)]
    pub rules: Vec<String>,
    pub version: String,
}

/// A response persona. The first persona in a brand context is the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Brand operating context. Loaded on demand and cached by playbook version;
/// the pipeline is a read-only consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandContext {
    pub brand_id: String,
    pub playbook: Playbook,
    pub personas: Vec<Persona>,
    #[serde(default)]
    pub assets: Vec<String>,
}

impl BrandContext {
    pub fn new(brand_id: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
            playbook: Playbook {
                voice: "friendly".to_string(),
                tone: "professional".to_string(),
                rules: Vec::new(),
                version: "v1".to_string(),
            },
            personas: vec![Persona {
                name: "default".to_string(),
                description: String::new(),
            }],
            assets: Vec::new(),
        }
    }

    /// The persona replies are authored as. First entry wins.
    pub fn default_persona(&self) -> &str {
        self.personas
            .first()
            .map(|p| p.name.as_str())
            .unwrap_or("default")
    }
}
