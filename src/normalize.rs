use crate::error::ReconcileError;
use crate::models::{NormalizedKey, Platform, RawTrack, Track};
use tracing::warn;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonical comparison form of a display string: NFKD-decomposed with
/// combining marks dropped ("Beyoncé" and "Beyonce\u{301}" both fold to
/// "beyonce"), lower-cased, every remaining character that is neither
/// alphanumeric nor whitespace removed, whitespace runs collapsed to a single
/// space and trimmed.
pub fn canonical_text(s: &str) -> String {
    let stripped: String = s
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity key of a `(title, artist)` pair, or `None` if either side is
/// empty after canonicalization.
pub fn normalized_key(title: &str, artist: &str) -> Option<NormalizedKey> {
    let title = canonical_text(title);
    let artist = canonical_text(artist);
    if title.is_empty() || artist.is_empty() {
        return None;
    }
    Some(NormalizedKey { title, artist })
}

/// Turn a platform-native record into a [`Track`]. Display strings are kept as
/// supplied (trimmed); only the derived key is canonicalized. A list of
/// artists collapses to its first entry.
pub fn normalize(platform: Platform, raw: RawTrack) -> Result<Track, ReconcileError> {
    let artist = raw.artists.into_iter().next().unwrap_or_default();
    let title = raw.title;

    let key_title = canonical_text(&title);
    if key_title.is_empty() {
        return Err(ReconcileError::MalformedTrack {
            platform,
            reason: format!("empty title (raw {:?})", title),
        });
    }
    let key_artist = canonical_text(&artist);
    if key_artist.is_empty() {
        return Err(ReconcileError::MalformedTrack {
            platform,
            reason: format!("empty artist for {:?}", title),
        });
    }

    let album = raw
        .album
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    Ok(Track::from_parts(
        title.trim().to_string(),
        artist.trim().to_string(),
        album,
        raw.duration_ms,
        platform,
        raw.native_id,
        NormalizedKey { title: key_title, artist: key_artist },
    ))
}

/// Normalize a whole listing, dropping (and logging) malformed entries.
/// Returns the kept tracks in input order and the number dropped.
pub fn normalize_listing(platform: Platform, raw: Vec<RawTrack>) -> (Vec<Track>, usize) {
    let mut dropped = 0usize;
    let mut tracks = Vec::with_capacity(raw.len());
    for (position, r) in raw.into_iter().enumerate() {
        match normalize(platform, r) {
            Ok(t) => tracks.push(t),
            Err(e) => {
                dropped += 1;
                warn!(position, "dropping track: {}", e);
            }
        }
    }
    (tracks, dropped)
}
