//! Ensemble sentiment analysis.
//!
//! Deterministic: the same event, platform and configuration always produce
//! bit-identical output. Models that cannot contribute (no emoji present, no
//! strong phrase) are skipped and the ensemble renormalizes over the rest;
//! a model error is recorded and never aborts the analysis.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};

use crate::analysis::lexicon::{
    EMOJI_SCORES, EMOJI_TOKENS, EXCLAMATION_EMPHASIS, INTENSIFIERS, MAX_PUNCTUATION_EMPHASIS,
    NEGATIONS, NEGATION_WINDOW, QUESTION_DAMPENING, STRONG_PHRASES, WORD_SCORES,
};
use crate::config::SentimentConfig;
use crate::error::CoreResult;
use crate::models::{Platform, SocialEvent};

pub const ANALYZER_VERSION: &str = "sentiment-v1";

/// Label thresholds on the adjusted score
const LABEL_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }

    fn from_score(score: f64) -> SentimentLabel {
        if score > LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if score < -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallSentiment {
    pub label: SentimentLabel,
    /// Platform-adjusted score in [-1, 1]
    pub score: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: String,
    pub score: f64,
    /// Normalized ensemble weight this model contributed with
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectSentiment {
    pub aspect: String,
    pub mention_count: usize,
    pub score: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformAdjusted {
    pub original_score: f64,
    pub adjusted_score: f64,
    pub adjustment_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentMetadata {
    pub analyzer_version: String,
    pub token_count: usize,
    pub models_run: usize,
    pub fallback_used: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub overall: OverallSentiment,
    pub model_scores: Vec<ModelScore>,
    pub model_errors: Vec<String>,
    pub aspect_sentiments: Vec<AspectSentiment>,
    pub platform_adjusted: PlatformAdjusted,
    pub metadata: SentimentMetadata,
}

/// Preprocessed view of an event's text shared by all models
#[derive(Debug, Clone)]
pub struct PreparedText {
    /// Original text, untouched (emoji model reads this)
    pub original: String,
    /// Lowercased, URL/mention-stripped, emoji-tokenized text
    pub cleaned: String,
    pub tokens: Vec<String>,
    pub exclamations: usize,
    pub questions: usize,
}

/// Strip URLs and @mentions, keep hashtag text, map emoji to lexicon tokens,
/// collapse whitespace, lowercase.
pub fn preprocess(text: &str) -> PreparedText {
    let exclamations = text.matches('!').count();
    let questions = text.matches('?').count();

    let mut cleaned = String::with_capacity(text.len());
    for raw_token in text.split_whitespace() {
        if raw_token.starts_with("http://")
            || raw_token.starts_with("https://")
            || raw_token.starts_with("www.")
        {
            continue;
        }
        if raw_token.starts_with('@') {
            continue;
        }
        let token = raw_token.strip_prefix('#').unwrap_or(raw_token);
        if !cleaned.is_empty() {
            cleaned.push(' ');
        }
        for ch in token.chars() {
            if let Some(mapped) = EMOJI_TOKENS.get(&ch) {
                cleaned.push(' ');
                cleaned.push_str(mapped);
                cleaned.push(' ');
            } else {
                cleaned.push(ch);
            }
        }
    }
    let cleaned = cleaned.to_lowercase();

    let tokens: Vec<String> = cleaned
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation() && c != '\'').to_string())
        .filter(|t| !t.is_empty())
        .collect();

    PreparedText {
        original: text.to_string(),
        cleaned: tokens.join(" "),
        tokens,
        exclamations,
        questions,
    }
}

/// Lexical scoring over a token slice: lexicon hits with intensifier
/// multipliers and a 3-token negation window, normalized by the number of
/// scored tokens, with punctuation emphasis.
fn lexical_score_tokens(tokens: &[String], exclamations: usize, questions: usize) -> f64 {
    let mut sum = 0.0;
    let mut scored = 0usize;

    for (i, token) in tokens.iter().enumerate() {
        let Some(&base) = WORD_SCORES.get(token.as_str()) else {
            continue;
        };
        let mut value = base;

        if i > 0 {
            if let Some(&factor) = INTENSIFIERS.get(tokens[i - 1].as_str()) {
                value *= factor;
            }
        }

        let window_start = i.saturating_sub(NEGATION_WINDOW);
        if tokens[window_start..i]
            .iter()
            .any(|t| NEGATIONS.contains(t.as_str()))
        {
            value = -value;
        }

        sum += value;
        scored += 1;
    }

    if scored == 0 {
        return 0.0;
    }

    let mut score = sum / scored as f64;
    let emphasis =
        (exclamations as f64 * EXCLAMATION_EMPHASIS).min(MAX_PUNCTUATION_EMPHASIS);
    let dampening = (questions as f64 * QUESTION_DAMPENING).min(MAX_PUNCTUATION_EMPHASIS);
    score += emphasis * score.signum();
    score -= dampening * score.signum();
    score.clamp(-1.0, 1.0)
}

/// A member of the sentiment ensemble. `Ok(None)` means the model has no
/// signal for this text and is excluded from the weighted average.
trait SentimentModel: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, text: &PreparedText) -> CoreResult<Option<f64>>;
}

struct LexicalModel;

impl SentimentModel for LexicalModel {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn score(&self, text: &PreparedText) -> CoreResult<Option<f64>> {
        Ok(Some(lexical_score_tokens(
            &text.tokens,
            text.exclamations,
            text.questions,
        )))
    }
}

struct EmojiModel;

impl SentimentModel for EmojiModel {
    fn name(&self) -> &'static str {
        "emoji"
    }

    fn score(&self, text: &PreparedText) -> CoreResult<Option<f64>> {
        let mut sum = 0.0;
        let mut hits = 0usize;
        for ch in text.original.chars() {
            if let Some(&score) = EMOJI_SCORES.get(&ch) {
                sum += score;
                hits += 1;
            }
        }
        if hits == 0 {
            return Ok(None);
        }
        Ok(Some((sum / hits as f64).clamp(-1.0, 1.0)))
    }
}

struct KeywordModel;

impl SentimentModel for KeywordModel {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn score(&self, text: &PreparedText) -> CoreResult<Option<f64>> {
        let mut sum = 0.0;
        let mut hits = 0usize;
        for (phrase, score) in STRONG_PHRASES {
            if text.cleaned.contains(phrase) {
                sum += score;
                hits += 1;
            }
        }
        if hits == 0 {
            return Ok(None);
        }
        Ok(Some((sum / hits as f64).clamp(-1.0, 1.0)))
    }
}

pub struct SentimentAnalyzer {
    config: SentimentConfig,
}

impl SentimentAnalyzer {
    pub fn new(config: SentimentConfig) -> Self {
        Self { config }
    }

    /// Analyze one event. Pure function of (content, platform, config).
    pub async fn analyze(&self, event: &SocialEvent) -> SentimentResult {
        let prepared = preprocess(&event.content.text);

        let mut models: Vec<(Box<dyn SentimentModel>, f64)> = Vec::with_capacity(3);
        if self.config.enable_lexical {
            models.push((Box::new(LexicalModel), self.config.lexical_weight));
        }
        if self.config.enable_emoji {
            models.push((Box::new(EmojiModel), self.config.emoji_weight));
        }
        if self.config.enable_keyword {
            models.push((Box::new(KeywordModel), self.config.keyword_weight));
        }

        let runs = join_all(models.iter().map(|(model, weight)| {
            let prepared = &prepared;
            async move { (model.name(), *weight, model.score(prepared)) }
        }))
        .await;

        let mut model_errors = Vec::new();
        let mut contributions: Vec<(&'static str, f64, f64)> = Vec::new();
        for (name, weight, outcome) in runs {
            match outcome {
                Ok(Some(score)) => contributions.push((name, score, weight)),
                Ok(None) => {}
                Err(err) => {
                    tracing::debug!(model = name, error = %err, "sentiment model failed");
                    model_errors.push(format!("{name}: {err}"));
                }
            }
        }
        let models_run = models.len();

        let mut fallback_used = false;
        if contributions.is_empty() {
            // Every model failed or had no signal: lexical-only fallback
            fallback_used = true;
            let score =
                lexical_score_tokens(&prepared.tokens, prepared.exclamations, prepared.questions);
            contributions.push(("lexical_fallback", score, 1.0));
        }

        let weight_sum: f64 = contributions.iter().map(|(_, _, w)| w).sum();
        let raw_score = if weight_sum > 0.0 {
            contributions
                .iter()
                .map(|(_, score, weight)| score * weight / weight_sum)
                .sum::<f64>()
        } else {
            0.0
        };

        let model_scores = contributions
            .iter()
            .map(|&(model, score, weight)| ModelScore {
                model: model.to_string(),
                score,
                weight: if weight_sum > 0.0 {
                    weight / weight_sum
                } else {
                    0.0
                },
            })
            .collect();

        let platform_adjusted = self.apply_platform_tilt(raw_score, event.platform);
        let adjusted = platform_adjusted.adjusted_score;

        let overall = OverallSentiment {
            label: SentimentLabel::from_score(adjusted),
            score: adjusted,
            confidence: self.config.confidence_for(adjusted),
        };

        let aspect_sentiments = self.aspect_sentiments(&prepared);

        SentimentResult {
            overall,
            model_scores,
            model_errors,
            aspect_sentiments,
            platform_adjusted,
            metadata: SentimentMetadata {
                analyzer_version: ANALYZER_VERSION.to_string(),
                token_count: prepared.tokens.len(),
                models_run,
                fallback_used,
            },
        }
    }

    /// Batch analysis. Equivalent to element-wise `analyze`.
    pub async fn analyze_batch(&self, events: &[SocialEvent]) -> Vec<SentimentResult> {
        join_all(events.iter().map(|event| self.analyze(event))).await
    }

    fn apply_platform_tilt(&self, score: f64, platform: Platform) -> PlatformAdjusted {
        let tilt = self.config.tilt(platform);
        let boost = if score >= 0.0 {
            tilt.positive_boost
        } else {
            tilt.negative_boost
        };
        let factor = 1.0 + boost;
        let mut adjusted = (score * factor).clamp(-1.0, 1.0);
        if adjusted.abs() < tilt.neutral_dead_zone {
            adjusted = 0.0;
        }
        PlatformAdjusted {
            original_score: score,
            adjusted_score: adjusted,
            adjustment_factor: factor,
        }
    }

    /// Windowed lexical scoring around configured aspect mentions
    fn aspect_sentiments(&self, prepared: &PreparedText) -> Vec<AspectSentiment> {
        let window = self.config.aspect_window_chars;
        let cleaned = &prepared.cleaned;
        let chars: Vec<char> = cleaned.chars().collect();

        let mut results = Vec::new();
        for aspect in &self.config.aspects {
            let mut terms: Vec<&str> = vec![aspect.name.as_str()];
            terms.extend(aspect.synonyms.iter().map(String::as_str));

            let mut mention_count = 0usize;
            let mut window_sum = 0.0;
            for term in terms {
                let mut search_from = 0usize;
                while let Some(byte_pos) = cleaned[search_from..].find(term) {
                    let abs_byte = search_from + byte_pos;
                    let char_pos = cleaned[..abs_byte].chars().count();
                    let start = char_pos.saturating_sub(window);
                    let end = (char_pos + term.chars().count() + window).min(chars.len());
                    let snippet: String = chars[start..end].iter().collect();
                    let tokens: Vec<String> =
                        snippet.split_whitespace().map(str::to_string).collect();
                    window_sum += lexical_score_tokens(&tokens, 0, 0);
                    mention_count += 1;
                    search_from = abs_byte + term.len();
                }
            }

            if mention_count > 0 {
                let score = (window_sum / mention_count as f64).clamp(-1.0, 1.0);
                results.push(AspectSentiment {
                    aspect: aspect.name.clone(),
                    mention_count,
                    score,
                    label: SentimentLabel::from_score(score),
                });
            }
        }
        results
    }
}
