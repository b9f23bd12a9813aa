use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Streaming platforms the engine reconciles between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Spotify,
    AppleMusic,
    YoutubeMusic,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Spotify, Platform::AppleMusic, Platform::YoutubeMusic];

    /// Human readable name, as shown to users.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Spotify => "Spotify",
            Platform::AppleMusic => "Apple Music",
            Platform::YoutubeMusic => "YouTube Music",
        }
    }

    /// Short identifier used for file names and CLI arguments.
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::AppleMusic => "apple-music",
            Platform::YoutubeMusic => "youtube-music",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match folded.as_str() {
            "spotify" => Ok(Platform::Spotify),
            "applemusic" | "apple" => Ok(Platform::AppleMusic),
            "youtubemusic" | "youtube" | "ytmusic" => Ok(Platform::YoutubeMusic),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// Platform-native track record, as returned by a provider before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawTrack {
    pub title: String,
    /// Credited artists; only the first one takes part in identity.
    pub artists: Vec<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub native_id: String,
}

impl RawTrack {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artists: vec![artist.into()],
            ..Default::default()
        }
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_native_id(mut self, native_id: impl Into<String>) -> Self {
        self.native_id = native_id.into();
        self
    }
}

/// Canonical `(title, artist)` identity of a track: case-folded,
/// punctuation-stripped and whitespace-collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NormalizedKey {
    pub title: String,
    pub artist: String,
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.title, self.artist)
    }
}

/// A normalized, immutable track. Built only through [`crate::normalize::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    title: String,
    artist: String,
    album: Option<String>,
    duration_ms: Option<u64>,
    platform: Platform,
    native_id: String,
    #[serde(skip)]
    key: NormalizedKey,
}

impl Track {
    pub(crate) fn from_parts(
        title: String,
        artist: String,
        album: Option<String>,
        duration_ms: Option<u64>,
        platform: Platform,
        native_id: String,
        key: NormalizedKey,
    ) -> Self {
        Self { title, artist, album, duration_ms, platform, native_id, key }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Opaque outside the resolver; never used for identity.
    pub fn native_id(&self) -> &str {
        &self.native_id
    }

    pub fn key(&self) -> &NormalizedKey {
        &self.key
    }

    /// Back to the collaborator-facing shape, e.g. for backups or `createPlaylist`.
    pub fn to_raw(&self) -> RawTrack {
        RawTrack {
            title: self.title.clone(),
            artists: vec![self.artist.clone()],
            album: self.album.clone(),
            duration_ms: self.duration_ms,
            native_id: self.native_id.clone(),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.artist)
    }
}

/// Ordered, deduplicated track list. `platform` is `None` while the playlist is
/// an in-memory result not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    name: String,
    platform: Option<Platform>,
    remote_id: Option<String>,
    tracks: Vec<Track>,
    source_count: usize,
}

impl Playlist {
    /// `tracks` must already be deduplicated.
    pub(crate) fn unbound(name: impl Into<String>, tracks: Vec<Track>, source_count: usize) -> Self {
        Self {
            name: name.into(),
            platform: None,
            remote_id: None,
            tracks,
            source_count,
        }
    }

    /// The same playlist as it now exists on `platform` under `remote_id`.
    pub(crate) fn bound(self, platform: Platform, remote_id: impl Into<String>) -> Self {
        Self {
            platform: Some(platform),
            remote_id: Some(remote_id.into()),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn platform(&self) -> Option<Platform> {
        self.platform
    }

    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn source_count(&self) -> usize {
        self.source_count
    }
}

/// One platform's already-fetched track list, as fed to merge/compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceListing {
    pub platform: Platform,
    pub tracks: Vec<Track>,
}

impl SourceListing {
    pub fn new(platform: Platform, tracks: Vec<Track>) -> Self {
        Self { platform, tracks }
    }
}

/// A track held by more than one, but not every, compared platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialOverlap {
    pub track: Track,
    pub platforms: BTreeSet<Platform>,
}

/// Result of `compare`. `common`, every `unique_by_platform` bucket and
/// `partial_overlap` are pairwise disjoint by [`NormalizedKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub common: Vec<Track>,
    pub unique_by_platform: BTreeMap<Platform, Vec<Track>>,
    pub partial_overlap: Vec<PartialOverlap>,
}

impl Comparison {
    pub fn unique_to(&self, platform: Platform) -> &[Track] {
        self.unique_by_platform
            .get(&platform)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Platforms holding `key` when it is a partial overlap.
    pub fn overlap_for(&self, key: &NormalizedKey) -> Option<&BTreeSet<Platform>> {
        self.partial_overlap
            .iter()
            .find(|p| p.track.key() == key)
            .map(|p| &p.platforms)
    }
}

/// Output of the set reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReconciliationResult {
    Playlist(Playlist),
    Comparison(Comparison),
}

/// What a batch operation is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BatchTarget {
    Platform(Platform),
    Playlist { platform: Platform, reference: String },
}

impl BatchTarget {
    pub fn platform(&self) -> Platform {
        match self {
            BatchTarget::Platform(p) => *p,
            BatchTarget::Playlist { platform, .. } => *platform,
        }
    }
}

impl fmt::Display for BatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchTarget::Platform(p) => write!(f, "{}", p),
            BatchTarget::Playlist { platform, reference } => write!(f, "{}:{}", platform, reference),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Success,
    Partial,
    Failed,
}

/// What a successful unit of work hands back to the orchestrator.
#[derive(Debug, Clone)]
pub struct WorkReport {
    pub playlist: Playlist,
    /// Tracks that could not be placed on the target.
    pub unresolved: Vec<Track>,
}

impl WorkReport {
    pub fn complete(playlist: Playlist) -> Self {
        Self { playlist, unresolved: Vec::new() }
    }
}

/// Per-target record of a batch operation. `error` is present iff the status is
/// not `Success`; `playlist` is present iff the status is not `Failed`.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    target: BatchTarget,
    status: BatchStatus,
    error: Option<BatchError>,
    playlist: Option<Playlist>,
    unresolved: Vec<Track>,
}

impl BatchOutcome {
    pub fn from_result(target: BatchTarget, result: Result<WorkReport, BatchError>) -> Self {
        match result {
            Ok(report) if report.unresolved.is_empty() => Self {
                target,
                status: BatchStatus::Success,
                error: None,
                playlist: Some(report.playlist),
                unresolved: Vec::new(),
            },
            Ok(report) => {
                let unresolved = report.unresolved.len();
                let total = report.playlist.len() + unresolved;
                Self {
                    target,
                    status: BatchStatus::Partial,
                    error: Some(BatchError::Incomplete { unresolved, total }),
                    playlist: Some(report.playlist),
                    unresolved: report.unresolved,
                }
            }
            Err(e) => Self::failed(target, e),
        }
    }

    pub fn failed(target: BatchTarget, error: BatchError) -> Self {
        Self {
            target,
            status: BatchStatus::Failed,
            error: Some(error),
            playlist: None,
            unresolved: Vec::new(),
        }
    }

    pub fn target(&self) -> &BatchTarget {
        &self.target
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn error(&self) -> Option<&BatchError> {
        self.error.as_ref()
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn into_playlist(self) -> Option<Playlist> {
        self.playlist
    }

    pub fn unresolved(&self) -> &[Track] {
        &self.unresolved
    }

    pub fn is_success(&self) -> bool {
        self.status == BatchStatus::Success
    }
}
