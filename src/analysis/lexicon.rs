//! Fixed scoring tables for the lexical sentiment models.
//!
//! All tables are static and versioned with the crate; scoring must stay
//! bit-identical across runs for the same input.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

lazy_static! {
    /// Scored sentiment lexicon. Values in [-1, 1].
    pub static ref WORD_SCORES: HashMap<&'static str, f64> = {
        let entries: [(&str, f64); 58] = [
            ("love", 0.75),
            ("loved", 0.75),
            ("adore", 0.8),
            ("amazing", 0.8),
            ("awesome", 0.75),
            ("excellent", 0.8),
            ("fantastic", 0.8),
            ("wonderful", 0.75),
            ("great", 0.6),
            ("good", 0.5),
            ("best", 0.65),
            ("perfect", 0.8),
            ("beautiful", 0.6),
            ("happy", 0.55),
            ("glad", 0.5),
            ("thanks", 0.4),
            ("thank", 0.4),
            ("recommend", 0.6),
            ("impressed", 0.6),
            ("favorite", 0.6),
            ("enjoy", 0.5),
            ("enjoyed", 0.5),
            ("works", 0.3),
            ("fast", 0.3),
            ("helpful", 0.5),
            ("nice", 0.45),
            ("smooth", 0.35),
            ("quality", 0.25),
            ("win", 0.4),
            ("hate", -0.75),
            ("hated", -0.75),
            ("terrible", -0.8),
            ("horrible", -0.8),
            ("awful", -0.75),
            ("worst", -0.8),
            ("bad", -0.5),
            ("poor", -0.5),
            ("broken", -0.6),
            ("broke", -0.55),
            ("useless", -0.7),
            ("disappointed", -0.6),
            ("disappointing", -0.6),
            ("angry", -0.6),
            ("furious", -0.75),
            ("refund", -0.4),
            ("scam", -0.85),
            ("fraud", -0.85),
            ("slow", -0.35),
            ("late", -0.35),
            ("waste", -0.6),
            ("never", -0.2),
            ("problem", -0.4),
            ("issue", -0.35),
            ("fail", -0.55),
            ("failed", -0.55),
            ("wrong", -0.45),
            ("cheap", -0.2),
            ("expensive", -0.3),
        ];
        entries.into_iter().collect()
    };

    /// Multipliers applied when the preceding token intensifies
    pub static ref INTENSIFIERS: HashMap<&'static str, f64> = {
        let entries: [(&str, f64); 9] = [
            ("very", 1.3),
            ("really", 1.25),
            ("so", 1.2),
            ("extremely", 1.5),
            ("absolutely", 1.4),
            ("completely", 1.35),
            ("totally", 1.3),
            ("super", 1.3),
            ("incredibly", 1.45),
        ];
        entries.into_iter().collect()
    };

    /// Tokens that flip the sign of a scored word within the negation window
    pub static ref NEGATIONS: HashSet<&'static str> = {
        ["not", "no", "never", "dont", "don't", "cant", "can't", "wont", "won't", "isnt",
         "isn't", "wasnt", "wasn't", "didnt", "didn't", "nothing", "hardly", "barely"]
            .into_iter()
            .collect()
    };

    /// Fixed emoji table mapped to sentiment scores
    pub static ref EMOJI_SCORES: HashMap<char, f64> = {
        let entries: [(char, f64); 18] = [
            ('😍', 0.9),
            ('🥰', 0.9),
            ('😊', 0.6),
            ('😀', 0.5),
            ('😃', 0.5),
            ('👍', 0.5),
            ('❤', 0.8),
            ('🔥', 0.6),
            ('🎉', 0.6),
            ('💯', 0.7),
            ('🙏', 0.3),
            ('😡', -0.8),
            ('😠', -0.7),
            ('👎', -0.5),
            ('😢', -0.5),
            ('😭', -0.6),
            ('🤮', -0.8),
            ('😤', -0.5),
        ];
        entries.into_iter().collect()
    };

    /// Emoji mapped to lexicon tokens during preprocessing, so downstream
    /// tokenized models see them as words
    pub static ref EMOJI_TOKENS: HashMap<char, &'static str> = {
        let entries: [(char, &str); 10] = [
            ('😍', "love"),
            ('🥰', "love"),
            ('😊', "happy"),
            ('👍', "good"),
            ('❤', "love"),
            ('🎉', "happy"),
            ('😡', "angry"),
            ('😠', "angry"),
            ('👎', "bad"),
            ('😭', "awful"),
        ];
        entries.into_iter().collect()
    };
}

/// Strong phrases with near-unambiguous polarity. Ordered so that scoring
/// sums in a fixed sequence.
pub const STRONG_PHRASES: [(&str, f64); 12] = [
    ("highly recommend", 0.9),
    ("best ever", 0.85),
    ("love it", 0.8),
    ("love this", 0.8),
    ("changed my life", 0.85),
    ("five stars", 0.8),
    ("never again", -0.8),
    ("do not buy", -0.85),
    ("waste of money", -0.85),
    ("completely broken", -0.8),
    ("want a refund", -0.7),
    ("false advertising", -0.8),
];

/// Negation look-back window, in tokens
pub const NEGATION_WINDOW: usize = 3;

/// Additive emphasis per exclamation mark, applied in the direction of the sign
pub const EXCLAMATION_EMPHASIS: f64 = 0.05;

/// Dampening applied per question mark (questions read less assertive)
pub const QUESTION_DAMPENING: f64 = 0.03;

/// Cap on total punctuation emphasis
pub const MAX_PUNCTUATION_EMPHASIS: f64 = 0.2;
