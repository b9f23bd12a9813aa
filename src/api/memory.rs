use super::{PlaylistSummary, Provider};
use crate::error::ProviderError;
use crate::models::{Platform, RawTrack};
use crate::normalize::normalized_key;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

/// Collaborator calls a [`MemoryProvider`] can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Fetch,
    Create,
    Search,
    List,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
}

/// On-disk form of one platform's library, used by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibraryFile {
    #[serde(default)]
    pub playlists: Vec<StoredPlaylist>,
    /// Searchable catalog; absent means every search finds a match.
    #[serde(default)]
    pub catalog: Option<Vec<RawTrack>>,
}

struct MemoryState {
    playlists: Vec<StoredPlaylist>,
    catalog: Option<Vec<RawTrack>>,
    failures: HashMap<Call, VecDeque<ProviderError>>,
    calls: HashMap<Call, usize>,
    next_id: u64,
}

/// An in-memory platform: playlists and catalog held in process, with
/// scripted failures and artificial latency for tests. Backs the CLI through
/// [`LibraryFile`]s when no live client is wired in.
pub struct MemoryProvider {
    platform: Platform,
    authenticated: bool,
    latency: Option<Duration>,
    state: Mutex<MemoryState>,
}

impl MemoryProvider {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            authenticated: true,
            latency: None,
            state: Mutex::new(MemoryState {
                playlists: Vec::new(),
                catalog: None,
                failures: HashMap::new(),
                calls: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    pub fn from_library(platform: Platform, library: LibraryFile) -> Self {
        let provider = Self::new(platform);
        {
            let mut state = provider.lock();
            state.playlists = library.playlists;
            state.catalog = library.catalog;
            state.next_id = state.playlists.len() as u64 + 1;
        }
        provider
    }

    /// Load `<dir>/<platform slug>.json`, or start empty if it does not exist.
    pub fn load(platform: Platform, dir: &Path) -> Result<Self> {
        let path = dir.join(format!("{}.json", platform.slug()));
        if !path.exists() {
            return Ok(Self::new(platform));
        }
        let s = std::fs::read_to_string(&path).with_context(|| format!("reading library {}", path.display()))?;
        let library: LibraryFile =
            serde_json::from_str(&s).with_context(|| format!("parsing library {}", path.display()))?;
        Ok(Self::from_library(platform, library))
    }

    /// Write the current state back to `<dir>/<platform slug>.json`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", self.platform.slug()));
        let library = {
            let state = self.lock();
            LibraryFile {
                playlists: state.playlists.clone(),
                catalog: state.catalog.clone(),
            }
        };
        std::fs::write(&path, serde_json::to_string_pretty(&library)?)
            .with_context(|| format!("writing library {}", path.display()))?;
        Ok(())
    }

    pub fn with_playlist(self, id: &str, name: &str, tracks: Vec<RawTrack>) -> Self {
        self.lock().playlists.push(StoredPlaylist {
            id: id.to_string(),
            name: name.to_string(),
            tracks,
        });
        self
    }

    /// Restrict searches to `catalog`.
    pub fn with_catalog(self, catalog: Vec<RawTrack>) -> Self {
        self.lock().catalog = Some(catalog);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Fail the next `times` calls of kind `call` with `error`.
    pub fn fail_times(&self, call: Call, error: ProviderError, times: usize) {
        let mut state = self.lock();
        let queue = state.failures.entry(call).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// How many calls of kind `call` were made so far.
    pub fn calls(&self, call: Call) -> usize {
        self.lock().calls.get(&call).copied().unwrap_or(0)
    }

    pub fn playlists(&self) -> Vec<StoredPlaylist> {
        self.lock().playlists.clone()
    }

    pub fn playlist_named(&self, name: &str) -> Option<StoredPlaylist> {
        self.lock().playlists.iter().find(|p| p.name == name).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count the call and hand back a scripted failure, if any.
    async fn enter(&self, call: Call) -> Result<(), ProviderError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.lock();
        *state.calls.entry(call).or_insert(0) += 1;
        if !self.authenticated {
            return Err(ProviderError::AuthExpired { platform: self.platform });
        }
        match state.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<RawTrack>, ProviderError> {
        self.enter(Call::Fetch).await?;
        let state = self.lock();
        state
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .map(|p| p.tracks.clone())
            .ok_or_else(|| ProviderError::PlaylistNotFound {
                platform: self.platform,
                reference: playlist_id.to_string(),
            })
    }

    async fn create_playlist(&self, name: &str, tracks: &[RawTrack]) -> Result<String, ProviderError> {
        self.enter(Call::Create).await?;
        let mut state = self.lock();
        let id = format!("{}-playlist-{}", self.platform.slug(), state.next_id);
        state.next_id += 1;
        state.playlists.push(StoredPlaylist {
            id: id.clone(),
            name: name.to_string(),
            tracks: tracks.to_vec(),
        });
        info!("MemoryProvider[{}]: created {} ({}) with {} tracks", self.platform, name, id, tracks.len());
        Ok(id)
    }

    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<RawTrack>, ProviderError> {
        self.enter(Call::Search).await?;
        let state = self.lock();
        let Some(catalog) = state.catalog.as_ref() else {
            let native_id = format!("{}:track:{}:{}", self.platform.slug(), title, artist);
            return Ok(Some(RawTrack::new(title, artist).with_native_id(native_id)));
        };
        let wanted = normalized_key(title, artist);
        Ok(catalog
            .iter()
            .find(|c| {
                let artist = c.artists.first().map(String::as_str).unwrap_or("");
                wanted.is_some() && normalized_key(&c.title, artist) == wanted
            })
            .cloned())
    }

    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, ProviderError> {
        self.enter(Call::List).await?;
        Ok(self
            .lock()
            .playlists
            .iter()
            .map(|p| PlaylistSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                tracks_count: p.tracks.len(),
            })
            .collect())
    }
}
