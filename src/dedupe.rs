use crate::matcher::Matcher;
use crate::models::{NormalizedKey, Track};
use std::collections::HashMap;

/// Groups tracks into identity classes under a [`Matcher`]. The first track
/// seen for a class becomes its representative.
///
/// Keyed matchers are served by a hash lookup on the normalized key; other
/// matchers fall back to comparing against every representative.
pub struct IdentityIndex<'m> {
    matcher: &'m dyn Matcher,
    by_key: HashMap<NormalizedKey, usize>,
    representatives: Vec<Track>,
}

impl<'m> IdentityIndex<'m> {
    pub fn new(matcher: &'m dyn Matcher) -> Self {
        Self {
            matcher,
            by_key: HashMap::new(),
            representatives: Vec::new(),
        }
    }

    /// Class of `track`, if one exists already.
    pub fn find(&self, track: &Track) -> Option<usize> {
        match self.matcher.identity_key(track) {
            Some(key) => self.by_key.get(key).copied(),
            None => self
                .representatives
                .iter()
                .position(|rep| self.matcher.matches(rep, track)),
        }
    }

    /// Class of `track`, creating one with `track` as representative when
    /// none matches. The flag is true when a new class was created.
    pub fn classify(&mut self, track: Track) -> (usize, bool) {
        if let Some(class) = self.find(&track) {
            return (class, false);
        }
        let class = self.representatives.len();
        self.by_key.insert(track.key().clone(), class);
        self.representatives.push(track);
        (class, true)
    }

    pub fn representative(&self, class: usize) -> &Track {
        &self.representatives[class]
    }

    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// Representatives in first-seen order.
    pub fn into_representatives(self) -> Vec<Track> {
        self.representatives
    }
}

/// First-occurrence-wins deduplication. A track is kept iff no previously
/// kept track matches it; kept tracks stay in their original relative order.
pub fn dedupe(tracks: Vec<Track>, matcher: &dyn Matcher) -> Vec<Track> {
    let mut index = IdentityIndex::new(matcher);
    for track in tracks {
        index.classify(track);
    }
    index.into_representatives()
}
