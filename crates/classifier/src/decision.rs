//! Margin-based decision over two-class scores
//!
//! Pure and deterministic: identical input scores always produce identical
//! output. The confidence reported to callers is always the raw meme-class
//! score, not the winning class's score.

use model_runtime::ClassScore;

/// Winner score at or above this is trusted outright
pub const HIGH_CONFIDENCE: f32 = 0.8;
/// Winner score below this means a near-uniform distribution
pub const LOW_CONFIDENCE: f32 = 0.6;
/// Score gaps smaller than this are treated as ambiguous
pub const SMALL_MARGIN: f32 = 0.3;

/// Final verdict for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub is_meme: bool,
    /// Raw meme-class score, regardless of which class won
    pub confidence: f32,
}

/// Decide meme/not-meme from raw inference output
pub fn decide(raw: &[ClassScore]) -> Verdict {
    let (meme_score, not_meme_score) = resolve_scores(raw);
    Verdict {
        is_meme: decide_scores(meme_score, not_meme_score),
        confidence: meme_score,
    }
}

/// Resolve the meme and not-meme scores from raw label/score pairs
///
/// Labels match by case-insensitive substring: a label containing both
/// "meme" and "not" is the negative class, any other label containing
/// "meme" is the positive class. First match wins per class; a class the
/// backend omitted scores 0.0.
fn resolve_scores(raw: &[ClassScore]) -> (f32, f32) {
    let mut meme = None;
    let mut not_meme = None;

    for entry in raw {
        let label = entry.label.to_lowercase();
        if !label.contains("meme") {
            continue;
        }
        if label.contains("not") {
            if not_meme.is_none() {
                not_meme = Some(entry.score);
            }
        } else if meme.is_none() {
            meme = Some(entry.score);
        }
    }

    (meme.unwrap_or(0.0), not_meme.unwrap_or(0.0))
}

/// The decision rule over resolved scores
///
/// A confident winner is trusted. A near-uniform distribution leans meme,
/// as does a moderate winner with only a small margin over the loser.
fn decide_scores(meme_score: f32, not_meme_score: f32) -> bool {
    let winner = meme_score.max(not_meme_score);
    let margin = (meme_score - not_meme_score).abs();
    let meme_is_winner = meme_score > not_meme_score;

    if winner >= HIGH_CONFIDENCE {
        meme_is_winner
    } else if winner < LOW_CONFIDENCE {
        true
    } else if margin < SMALL_MARGIN {
        true
    } else {
        meme_is_winner
    }
}
