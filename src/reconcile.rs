//! Convert, merge and compare over already-fetched track lists.
//!
//! Everything here is pure: no I/O, no shared state. Ordering follows the
//! first-seen source unless stated otherwise.

use crate::dedupe::{dedupe, IdentityIndex};
use crate::error::ReconcileError;
use crate::matcher::Matcher;
use crate::models::{Comparison, PartialOverlap, Platform, Playlist, ReconciliationResult, SourceListing, Track};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Explicit request passed into the engine, one variant per mode.
#[derive(Debug, Clone)]
pub enum ReconcileRequest {
    Convert { name: String, tracks: Vec<Track> },
    Merge { name: String, sources: Vec<SourceListing> },
    Compare { sources: Vec<SourceListing> },
}

pub fn reconcile(request: ReconcileRequest, matcher: &dyn Matcher) -> Result<ReconciliationResult, ReconcileError> {
    match request {
        ReconcileRequest::Convert { name, tracks } => Ok(ReconciliationResult::Playlist(convert(name, tracks, matcher))),
        ReconcileRequest::Merge { name, sources } => Ok(ReconciliationResult::Playlist(merge(name, sources, matcher))),
        ReconcileRequest::Compare { sources } => compare(sources, matcher).map(ReconciliationResult::Comparison),
    }
}

/// Stage a single source for creation elsewhere: deduplicated, same order.
pub fn convert(name: impl Into<String>, tracks: Vec<Track>, matcher: &dyn Matcher) -> Playlist {
    let input = tracks.len();
    let kept = dedupe(tracks, matcher);
    debug!(input, kept = kept.len(), "convert");
    Playlist::unbound(name, kept, 1)
}

/// Concatenate sources in the order supplied, then deduplicate. A song present
/// on several platforms keeps the earliest-supplied platform's representation.
pub fn merge(name: impl Into<String>, sources: Vec<SourceListing>, matcher: &dyn Matcher) -> Playlist {
    let source_count = sources.len();
    let all: Vec<Track> = sources.into_iter().flat_map(|s| s.tracks).collect();
    let input = all.len();
    let kept = dedupe(all, matcher);
    debug!(source_count, input, kept = kept.len(), "merge");
    Playlist::unbound(name, kept, source_count)
}

/// Classify every song by the set of platforms holding it: all of them
/// (`common`), exactly one (`unique_by_platform`), or some (`partial_overlap`).
///
/// Requires at least two sources on distinct platforms. Every supplied
/// platform gets a unique bucket, possibly empty.
pub fn compare(sources: Vec<SourceListing>, matcher: &dyn Matcher) -> Result<Comparison, ReconcileError> {
    if sources.len() < 2 {
        return Err(ReconcileError::InvalidRequest(format!(
            "compare needs at least 2 sources, got {}",
            sources.len()
        )));
    }
    let mut platforms = BTreeSet::new();
    for s in &sources {
        if !platforms.insert(s.platform) {
            return Err(ReconcileError::InvalidRequest(format!(
                "platform {} supplied more than once",
                s.platform
            )));
        }
    }
    let n = sources.len();

    let mut index = IdentityIndex::new(matcher);
    let mut holders: Vec<BTreeSet<Platform>> = Vec::new();
    for listing in sources {
        let platform = listing.platform;
        for track in listing.tracks {
            let (class, created) = index.classify(track);
            if created {
                holders.push(BTreeSet::new());
            }
            holders[class].insert(platform);
        }
    }

    let mut common = Vec::new();
    let mut unique_by_platform: BTreeMap<Platform, Vec<Track>> =
        platforms.iter().map(|p| (*p, Vec::new())).collect();
    let mut partial_overlap = Vec::new();

    for (track, held) in index.into_representatives().into_iter().zip(holders) {
        if held.len() == n {
            common.push(track);
        } else if held.len() == 1 {
            if let Some(bucket) = held.iter().next().and_then(|p| unique_by_platform.get_mut(p)) {
                bucket.push(track);
            }
        } else {
            partial_overlap.push(PartialOverlap { track, platforms: held });
        }
    }

    debug!(
        common = common.len(),
        partial = partial_overlap.len(),
        "compare over {} platforms",
        n
    );
    Ok(Comparison { common, unique_by_platform, partial_overlap })
}
