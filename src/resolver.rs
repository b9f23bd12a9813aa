use crate::api::{PlaylistSummary, Provider};
use crate::batch::CallPolicy;
use crate::db;
use crate::dedupe::dedupe;
use crate::error::{BatchError, ProviderError};
use crate::matcher::Matcher;
use crate::models::{NormalizedKey, Platform, Playlist, RawTrack, Track, WorkReport};
use crate::normalize::{normalize, normalize_listing};
use crate::util::extract_playlist_id;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Platform-facing façade. Every call to a collaborator goes through here,
/// wrapped by the shared [`CallPolicy`]; everything upstream works on
/// in-memory tracks only.
pub struct Resolver {
    providers: HashMap<Platform, Arc<dyn Provider>>,
    calls: CallPolicy,
    cache_path: Option<PathBuf>,
}

impl Resolver {
    pub fn new(calls: CallPolicy) -> Self {
        Self {
            providers: HashMap::new(),
            calls,
            cache_path: None,
        }
    }

    /// Register `provider` for its platform, replacing any previous one.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        if !provider.is_authenticated() {
            log::warn!("Provider {} is not authenticated; its calls will fail", provider.name());
        }
        self.providers.insert(provider.platform(), provider);
        self
    }

    /// Cache search resolutions in the sqlite database at `path`.
    pub fn with_cache(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut v: Vec<Platform> = self.providers.keys().copied().collect();
        v.sort();
        v
    }

    pub fn call_policy(&self) -> &CallPolicy {
        &self.calls
    }

    fn provider(&self, platform: Platform) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .get(&platform)
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable {
                platform,
                message: "no provider configured".into(),
            })
    }

    /// Fetch and normalize a playlist. `reference` may be an id or a share URL.
    /// Malformed tracks are dropped and logged.
    pub async fn fetch_playlist(&self, platform: Platform, reference: &str) -> Result<Vec<Track>, ProviderError> {
        let provider = self.provider(platform)?;
        let provider = provider.as_ref();
        let id = extract_playlist_id(platform, reference);
        let id = id.as_str();
        log::info!("Fetching playlist from {}: {}", platform, id);
        let start = std::time::Instant::now();

        let raw = self.calls.call(platform, "fetch_tracks", || provider.fetch_tracks(id)).await?;
        let fetched = raw.len();
        let (tracks, dropped) = normalize_listing(platform, raw);
        if dropped > 0 {
            log::warn!("Dropped {} malformed tracks from {} playlist {}", dropped, platform, id);
        }
        log::info!(
            "Retrieved {} tracks ({} kept) from {} in {:.1} s",
            fetched,
            tracks.len(),
            platform,
            start.elapsed().as_secs_f64()
        );
        Ok(tracks)
    }

    pub async fn list_playlists(&self, platform: Platform) -> Result<Vec<PlaylistSummary>, ProviderError> {
        let provider = self.provider(platform)?;
        let provider = provider.as_ref();
        self.calls.call(platform, "list_playlists", || provider.list_playlists()).await
    }

    /// Create `playlist` on `platform`. Tracks already native to the platform
    /// are used as-is; others are resolved through the cache, then a catalog
    /// search. Unresolvable tracks are skipped and reported in the
    /// [`WorkReport`].
    pub async fn write_playlist(
        &self,
        platform: Platform,
        playlist: &Playlist,
        matcher: &dyn Matcher,
    ) -> Result<WorkReport, BatchError> {
        let provider = self.provider(platform)?;
        let provider = provider.as_ref();
        let total = playlist.len();
        log::info!("Start creating playlist '{}' on {} ({} tracks)", playlist.name(), platform, total);

        let mut resolved: Vec<Track> = Vec::with_capacity(total);
        let mut unresolved: Vec<Track> = Vec::new();
        for (idx, track) in playlist.tracks().iter().enumerate() {
            let candidate = self.resolve_track(provider, platform, track).await?;
            match candidate.map(|raw| normalize(platform, raw)) {
                Some(Ok(t)) => resolved.push(t),
                Some(Err(e)) => {
                    log::warn!("Search result for {} unusable: {}", track, e);
                    unresolved.push(track.clone());
                }
                None => {
                    log::warn!("Could not resolve {} on {}", track, platform);
                    unresolved.push(track.clone());
                }
            }
            if (idx + 1) % 25 == 0 {
                log::info!("Progress for {}: {}/{} tracks resolved", platform, idx + 1, total);
            }
        }

        // Distinct source songs can resolve to the same target song.
        let resolved = dedupe(resolved, matcher);
        let raws: Vec<RawTrack> = resolved.iter().map(Track::to_raw).collect();
        let name = playlist.name();
        let raws = raws.as_slice();
        let remote_id = self
            .calls
            .call(platform, "create_playlist", || provider.create_playlist(name, raws))
            .await?;
        log::info!(
            "Created playlist '{}' on {} (id={}) with {} tracks, {} unresolved",
            name,
            platform,
            remote_id,
            resolved.len(),
            unresolved.len()
        );

        let written = Playlist::unbound(name, resolved, playlist.source_count()).bound(platform, remote_id);
        Ok(WorkReport { playlist: written, unresolved })
    }

    async fn resolve_track(
        &self,
        provider: &dyn Provider,
        platform: Platform,
        track: &Track,
    ) -> Result<Option<RawTrack>, ProviderError> {
        if track.platform() == platform && !track.native_id().is_empty() {
            return Ok(Some(track.to_raw()));
        }
        if let Some(hit) = self.cached(platform, track.key()).await {
            return Ok(Some(hit));
        }
        let (title, artist) = (track.title(), track.artist());
        let found = self
            .calls
            .call(platform, "search_track", || provider.search_track(title, artist))
            .await?;
        if let Some(raw) = &found {
            self.remember(platform, track.key(), raw).await;
        }
        Ok(found)
    }

    async fn cached(&self, platform: Platform, key: &NormalizedKey) -> Option<RawTrack> {
        let path = self.cache_path.clone()?;
        let key = key.clone();
        let res = tokio::task::spawn_blocking(move || -> anyhow::Result<Option<RawTrack>> {
            let conn = db::open_or_create(&path)?;
            db::get_resolution(&conn, platform, &key)
        })
        .await;
        match res {
            Ok(Ok(hit)) => hit,
            Ok(Err(e)) => {
                log::warn!("Resolution cache lookup failed: {}", e);
                None
            }
            Err(e) => {
                log::warn!("Resolution cache task failed: {}", e);
                None
            }
        }
    }

    async fn remember(&self, platform: Platform, key: &NormalizedKey, raw: &RawTrack) {
        let Some(path) = self.cache_path.clone() else {
            return;
        };
        let key = key.clone();
        let raw = raw.clone();
        let res = tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let conn = db::open_or_create(&path)?;
            db::upsert_resolution(&conn, platform, &key, &raw)
        })
        .await;
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Resolution cache update failed: {}", e),
            Err(e) => log::warn!("Resolution cache task failed: {}", e),
        }
    }
}
