//! Persisted backup schema. Field names follow the tool's existing backup
//! files (`name`/`artist`/`album` per track, `tracks_count` per playlist) so
//! older files still restore; newer fields are optional.

use crate::models::{Platform, Playlist, RawTrack, Track};
use crate::normalize::normalize_listing;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupTrack {
    pub name: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_id: Option<String>,
}

impl From<&Track> for BackupTrack {
    fn from(t: &Track) -> Self {
        Self {
            name: t.title().to_string(),
            artist: t.artist().to_string(),
            album: t.album().map(str::to_string),
            duration_ms: t.duration_ms(),
            native_id: Some(t.native_id().to_string()).filter(|id| !id.is_empty()),
        }
    }
}

impl From<&BackupTrack> for RawTrack {
    fn from(b: &BackupTrack) -> Self {
        RawTrack {
            title: b.name.clone(),
            artists: vec![b.artist.clone()],
            album: b.album.clone(),
            duration_ms: b.duration_ms,
            native_id: b.native_id.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupPlaylist {
    pub id: String,
    pub name: String,
    /// Missing in older files; restore then treats tracks as foreign to every platform.
    #[serde(default)]
    pub platform: Option<Platform>,
    pub tracks_count: usize,
    pub tracks: Vec<BackupTrack>,
}

impl BackupPlaylist {
    pub fn from_playlist(id: &str, platform: Platform, playlist: &Playlist) -> Self {
        Self {
            id: id.to_string(),
            name: playlist.name().to_string(),
            platform: Some(platform),
            tracks_count: playlist.len(),
            tracks: playlist.tracks().iter().map(BackupTrack::from).collect(),
        }
    }

    /// Normalized tracks of this record, malformed entries dropped.
    /// `fallback` is used as the tracks' platform when the record has none.
    pub fn to_tracks(&self, fallback: Platform) -> Vec<Track> {
        let platform = self.platform.unwrap_or(fallback);
        let raw: Vec<RawTrack> = self
            .tracks
            .iter()
            .map(|t| {
                let mut raw = RawTrack::from(t);
                if self.platform.is_none() {
                    // ids from an unknown platform cannot be reused
                    raw.native_id.clear();
                }
                raw
            })
            .collect();
        normalize_listing(platform, raw).0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDocument {
    /// RFC 3339 when written by this crate; older files carry a naive ISO timestamp.
    pub backup_date: String,
    pub total_playlists: usize,
    pub playlists: Vec<BackupPlaylist>,
}

impl BackupDocument {
    pub fn new(playlists: Vec<BackupPlaylist>) -> Self {
        Self {
            backup_date: Utc::now().to_rfc3339(),
            total_playlists: playlists.len(),
            playlists,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("reading backup {}", path.display()))?;
        let doc = serde_json::from_str(&s).with_context(|| format!("parsing backup {}", path.display()))?;
        Ok(doc)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("writing backup {}", path.display()))?;
        Ok(())
    }

    /// Default file name: `backup_summary_<timestamp>.json`.
    pub fn file_name(&self) -> String {
        let date = DateTime::parse_from_rfc3339(&self.backup_date)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        format!("backup_summary_{}.json", date.format("%Y%m%d_%H%M%S"))
    }
}
