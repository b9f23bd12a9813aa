use crate::models::Track;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Summary figures for one playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistStats {
    pub name: String,
    pub total_tracks: usize,
    /// Sum of known durations; tracks without one count as zero.
    pub total_duration: Duration,
    pub tracks_without_duration: usize,
    /// `(artist, track count)`, most frequent first.
    pub top_artists: Vec<(String, usize)>,
}

/// Compute stats over `tracks`, keeping the `top_n` most frequent artists.
/// Artists are grouped by their normalized form; the first spelling seen is
/// reported. Ties keep first-appearance order.
pub fn playlist_stats(name: &str, tracks: &[Track], top_n: usize) -> PlaylistStats {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut total_ms: u64 = 0;
    let mut without = 0usize;

    for t in tracks {
        match t.duration_ms() {
            Some(ms) => total_ms = total_ms.saturating_add(ms),
            None => without += 1,
        }
        let i = *slot.entry(t.key().artist.as_str()).or_insert_with(|| {
            order.push((t.artist().to_string(), 0));
            order.len() - 1
        });
        order[i].1 += 1;
    }

    // stable sort keeps first appearance among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.truncate(top_n);

    PlaylistStats {
        name: name.to_string(),
        total_tracks: tracks.len(),
        total_duration: Duration::from_millis(total_ms),
        tracks_without_duration: without,
        top_artists: order,
    }
}

/// `m:ss`, or `h:mm:ss` from one hour up.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}
