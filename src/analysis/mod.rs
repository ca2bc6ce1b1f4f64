//! Event analysis: sentiment, intent and topic/trend detection.

pub mod intent;
pub mod lexicon;
pub mod sentiment;
pub mod topics;
