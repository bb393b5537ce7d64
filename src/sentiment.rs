//! Keyword sentiment tagging for submitted feedback
//!
//! Messages are lowercased and checked for positive keywords first, then
//! negative ones; anything else is neutral. Matching is plain substring
//! search, so "goodness" counts as positive.

use crate::types::Sentiment;
use rand::Rng;
use serde::Serialize;
use std::ops::Range;

const DEFAULT_POSITIVE: [&str; 3] = ["good", "great", "excellent"];
const DEFAULT_NEGATIVE: [&str; 3] = ["bad", "terrible", "awful"];

/// Confidence scores are drawn from this range
pub const CONFIDENCE_RANGE: Range<f64> = 0.7..1.0;

/// Label and confidence assigned to a message
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub confidence: f64,
}

/// Assigns a sentiment label to free text
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> SentimentResult;
}

/// Substring keyword matcher
#[derive(Debug, Clone)]
pub struct KeywordAnalyzer {
    positive: Vec<String>,
    negative: Vec<String>,
}

impl KeywordAnalyzer {
    /// Create an analyzer with custom keyword lists
    ///
    /// Keywords are lowercased; empty entries are dropped since they would
    /// match every message.
    pub fn new<I, S>(positive: I, negative: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            positive: normalize(positive),
            negative: normalize(negative),
        }
    }

    /// Deterministic part of the analysis
    pub fn classify(&self, text: &str) -> Sentiment {
        let text = text.to_lowercase();

        if self.positive.iter().any(|k| text.contains(k.as_str())) {
            Sentiment::Positive
        } else if self.negative.iter().any(|k| text.contains(k.as_str())) {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl Default for KeywordAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_POSITIVE, DEFAULT_NEGATIVE)
    }
}

impl SentimentAnalyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> SentimentResult {
        SentimentResult {
            sentiment: self.classify(text),
            confidence: rand::thread_rng().gen_range(CONFIDENCE_RANGE),
        }
    }
}

fn normalize<I, S>(words: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_keywords() {
        let analyzer = KeywordAnalyzer::default();

        assert_eq!(analyzer.classify("The support was GREAT"), Sentiment::Positive);
        assert_eq!(analyzer.classify("Awful checkout flow"), Sentiment::Negative);
        assert_eq!(analyzer.classify("Shipping took four days"), Sentiment::Neutral);
        assert_eq!(analyzer.classify(""), Sentiment::Neutral);
    }

    #[test]
    fn test_positive_checked_first() {
        let analyzer = KeywordAnalyzer::default();
        assert_eq!(
            analyzer.classify("Good product, terrible packaging"),
            Sentiment::Positive
        );
    }

    #[test]
    fn test_substring_matching() {
        let analyzer = KeywordAnalyzer::default();
        // "badge" contains "bad"
        assert_eq!(analyzer.classify("Where is my badge?"), Sentiment::Negative);
        assert_eq!(analyzer.classify("Goodbye"), Sentiment::Positive);
    }

    #[test]
    fn test_custom_keywords() {
        let analyzer = KeywordAnalyzer::new(vec!["Love", " "], vec!["hate"]);
        assert_eq!(analyzer.classify("I love it"), Sentiment::Positive);
        assert_eq!(analyzer.classify("I hate it"), Sentiment::Negative);
        assert_eq!(analyzer.classify("it is great"), Sentiment::Neutral);
    }

    proptest! {
        #[test]
        fn prop_confidence_in_range(text in ".{0,200}") {
            let result = KeywordAnalyzer::default().analyze(&text);
            prop_assert!(CONFIDENCE_RANGE.contains(&result.confidence));
        }

        #[test]
        fn prop_without_keywords_is_neutral(text in "[cdfhijkmnpqsuvwxyz ]{0,80}") {
            prop_assert_eq!(KeywordAnalyzer::default().classify(&text), Sentiment::Neutral);
        }
    }
}
