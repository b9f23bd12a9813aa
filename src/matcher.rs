//! Track identity policies.
//!
//! The engine only ever asks a [`Matcher`] whether two tracks are the same
//! song. The baseline [`ExactKeyMatcher`] compares [`NormalizedKey`]s for
//! equality; [`SimilarityMatcher`] additionally accepts near-equal keys.
//! Neither looks at `native_id` or duration.

use crate::models::{NormalizedKey, Track};
use serde::Deserialize;
use std::sync::Arc;

pub trait Matcher: Send + Sync {
    fn matches(&self, a: &Track, b: &Track) -> bool;

    /// When identity is exactly key equality, the key to index by. Callers use
    /// it for hash lookups instead of pairwise `matches` calls.
    fn identity_key<'t>(&self, _track: &'t Track) -> Option<&'t NormalizedKey> {
        None
    }
}

/// Same song iff the normalized `(title, artist)` keys are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactKeyMatcher;

impl Matcher for ExactKeyMatcher {
    fn matches(&self, a: &Track, b: &Track) -> bool {
        a.key() == b.key()
    }

    fn identity_key<'t>(&self, track: &'t Track) -> Option<&'t NormalizedKey> {
        Some(track.key())
    }
}

/// Same song iff both the title keys and the artist keys are at least
/// `threshold` similar (Jaro-Winkler). Equal keys always match.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl SimilarityMatcher {
    /// `threshold` is clamped into `(0, 1]`.
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() { 1.0 } else { threshold.clamp(f64::EPSILON, 1.0) };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Matcher for SimilarityMatcher {
    fn matches(&self, a: &Track, b: &Track) -> bool {
        let (ka, kb) = (a.key(), b.key());
        if ka == kb {
            return true;
        }
        strsim::jaro_winkler(&ka.title, &kb.title) >= self.threshold
            && strsim::jaro_winkler(&ka.artist, &kb.artist) >= self.threshold
    }
}

/// Configured matching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    #[default]
    Exact,
    Similarity,
}

impl MatchPolicy {
    pub fn build(self, similarity_threshold: f64) -> Arc<dyn Matcher> {
        match self {
            MatchPolicy::Exact => Arc::new(ExactKeyMatcher),
            MatchPolicy::Similarity => Arc::new(SimilarityMatcher::new(similarity_threshold)),
        }
    }
}
