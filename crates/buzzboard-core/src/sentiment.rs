//! Sentiment scoring.
//!
//! The [`Scorer`] trait maps message text to a polarity in `[-1, 1]`.
//! [`LexiconScorer`] is a small pattern-style analyzer: it averages the
//! polarity of known sentiment words, scaled by a preceding intensifier
//! ("very good") and flipped and damped by a preceding negation
//! ("not good"). Text with no sentiment words scores neutral.

use crate::error::ScoreError;

/// Score returned for text with no sentiment-bearing words.
pub const NEUTRAL_SCORE: f64 = 0.0;

/// Multiplier applied to a negated sentiment word.
const NEGATION_FACTOR: f64 = -0.5;

/// How many tokens a negation reaches forward ("not a very good day").
const NEGATION_WINDOW: u8 = 3;

/// Maps message text to a sentiment polarity in `[-1, 1]`.
///
/// Implementations must degrade to a neutral score on empty or odd input
/// rather than failing. The error path exists for scorers backed by
/// something fallible (a model server, an FFI library).
pub trait Scorer {
    /// Score one message.
    fn score(&self, text: &str) -> Result<f64, ScoreError>;
}

impl<F> Scorer for F
where
    F: Fn(&str) -> Result<f64, ScoreError>,
{
    fn score(&self, text: &str) -> Result<f64, ScoreError> {
        self(text)
    }
}

/// Lexicon-based polarity scorer. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    /// Create a lexicon scorer.
    pub const fn new() -> Self {
        Self
    }

    /// Polarity of `text`, infallibly.
    pub fn polarity(text: &str) -> f64 {
        let lowered = text.to_lowercase();
        let mut contributions: Vec<f64> = Vec::new();
        let mut intensity: Option<f64> = None;
        let mut negation_left: u8 = 0;

        for token in tokens(&lowered) {
            if is_negation(token) {
                negation_left = NEGATION_WINDOW;
                continue;
            }
            if let Some(factor) = intensifier(token) {
                intensity = Some(intensity.unwrap_or(1.0) * factor);
                continue;
            }
            if let Some(polarity) = word_polarity(token) {
                let mut value = polarity * intensity.unwrap_or(1.0);
                if negation_left > 0 {
                    value *= NEGATION_FACTOR;
                }
                contributions.push(value.clamp(-1.0, 1.0));
                negation_left = 0;
            } else {
                negation_left = negation_left.saturating_sub(1);
            }
            intensity = None;
        }

        mean(&contributions).map_or(NEUTRAL_SCORE, |m| m.clamp(-1.0, 1.0))
    }
}

impl Scorer for LexiconScorer {
    fn score(&self, text: &str) -> Result<f64, ScoreError> {
        Ok(Self::polarity(text))
    }
}

/// Split lower-cased text into word tokens, keeping apostrophes.
fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty())
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn is_negation(token: &str) -> bool {
    token.ends_with("n't")
        || matches!(
            token,
            "not"
                | "no"
                | "never"
                | "neither"
                | "nor"
                | "nothing"
                | "nobody"
                | "cannot"
                | "without"
                | "dont"
                | "doesnt"
                | "didnt"
                | "isnt"
                | "wasnt"
                | "cant"
                | "wont"
        )
}

fn intensifier(token: &str) -> Option<f64> {
    let factor = match token {
        "extremely" | "incredibly" | "absolutely" => 1.5,
        "very" | "really" | "super" | "totally" => 1.3,
        "so" | "too" => 1.2,
        "quite" => 1.1,
        "somewhat" => 0.7,
        "slightly" => 0.5,
        "barely" => 0.4,
        _ => return None,
    };
    Some(factor)
}

fn word_polarity(token: &str) -> Option<f64> {
    let polarity = match token {
        // positive
        "excellent" | "awesome" | "best" | "perfect" | "wonderful" | "superb" => 1.0,
        "brilliant" | "outstanding" => 0.9,
        "beautiful" | "delightful" => 0.85,
        "great" | "happy" | "thrilled" => 0.8,
        "good" | "loved" | "impressive" => 0.7,
        "nice" | "amazing" | "elegant" => 0.6,
        "love" | "glad" | "better" | "ok" | "okay" | "enjoyed" | "interesting" | "excited" => 0.5,
        "fantastic" | "enjoy" | "fine" | "clean" | "fast" | "easy" => 0.4,
        "cool" | "fun" | "exciting" | "helpful" | "useful" => 0.3,
        "positive" | "like" | "likes" => 0.2,
        // negative
        "terrible" | "awful" | "horrible" | "worst" | "boring" | "disgusting" => -1.0,
        "hated" | "miserable" => -0.9,
        "hate" | "annoying" | "stupid" | "furious" => -0.8,
        "disappointed" | "frustrated" => -0.75,
        "bad" | "ugly" | "painful" => -0.7,
        "disappointing" | "crazy" | "confusing" => -0.6,
        "sad" | "angry" | "wrong" | "failed" | "fail" | "unfortunately" | "difficult" => -0.5,
        "worse" | "poor" | "broken" | "buggy" => -0.4,
        "slow" | "negative" | "hard" | "tired" => -0.3,
        _ => return None,
    };
    Some(polarity)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_text_is_neutral() {
        assert!(approx(LexiconScorer::polarity(""), NEUTRAL_SCORE));
        assert!(approx(LexiconScorer::new().score("   ").unwrap(), NEUTRAL_SCORE));
    }

    #[test]
    fn text_without_sentiment_words_is_neutral() {
        assert!(approx(LexiconScorer::polarity("the build ran at noon"), 0.0));
        assert!(approx(LexiconScorer::polarity("{\"x\": 12} ### @@"), 0.0));
    }

    #[test]
    fn single_words_use_lexicon_polarity() {
        assert!(approx(LexiconScorer::polarity("great"), 0.8));
        assert!(approx(LexiconScorer::polarity("This is BAD!!!"), -0.7));
    }

    #[test]
    fn negation_flips_and_damps() {
        assert!(approx(LexiconScorer::polarity("not great"), -0.4));
        assert!(approx(LexiconScorer::polarity("this isn't bad"), 0.35));
        assert!(approx(LexiconScorer::polarity("not a good day"), -0.35));
    }

    #[test]
    fn negation_window_expires() {
        // "not" is four tokens away from "good".
        assert!(approx(
            LexiconScorer::polarity("not that it was a good day"),
            0.7
        ));
    }

    #[test]
    fn intensifiers_scale_and_clamp() {
        assert!(approx(LexiconScorer::polarity("very good"), 0.91));
        assert!(approx(LexiconScorer::polarity("extremely excellent"), 1.0));
        assert!(approx(LexiconScorer::polarity("slightly bad"), -0.35));
    }

    #[test]
    fn mixed_text_averages_contributions() {
        assert!(approx(LexiconScorer::polarity("good but bad"), 0.0));
        assert!(approx(LexiconScorer::polarity("great, great, sad"), 0.366_666_666_666_666_7));
    }

    #[test]
    fn score_always_in_range() {
        for text in [
            "extremely extremely excellent best perfect",
            "extremely extremely terrible worst awful",
            "not not not",
            "🙂🙃 ünïcødé wörds",
        ] {
            let score = LexiconScorer::polarity(text);
            assert!((-1.0..=1.0).contains(&score), "{text} scored {score}");
        }
    }

    #[test]
    fn closures_are_scorers() {
        let fixed = |_: &str| Ok::<f64, ScoreError>(0.25);
        assert!(approx(fixed.score("anything").unwrap(), 0.25));

        let failing = |_: &str| Err::<f64, ScoreError>(ScoreError::new("model offline"));
        assert!(failing.score("anything").is_err());
    }
}
