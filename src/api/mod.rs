pub mod memory;

use crate::error::ProviderError;
use crate::models::{Platform, RawTrack};
use serde::{Deserialize, Serialize};

/// A playlist as listed on a platform account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub tracks_count: usize,
}

/// Provider trait: the collaborator operations the resolver needs from one
/// platform. Authentication, transport and pagination are the provider's
/// business; errors come back already classified.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Tracks of the playlist identified by `playlist_id`, in playlist order.
    async fn fetch_tracks(&self, playlist_id: &str) -> Result<Vec<RawTrack>, ProviderError>;

    /// Create a playlist named `name` holding `tracks` (already resolved to
    /// this platform) and return its remote id.
    async fn create_playlist(&self, name: &str, tracks: &[RawTrack]) -> Result<String, ProviderError>;

    /// Best-effort catalog search. `None` when nothing suitable was found.
    async fn search_track(&self, title: &str, artist: &str) -> Result<Option<RawTrack>, ProviderError>;

    /// Playlists owned by the authenticated account.
    async fn list_playlists(&self) -> Result<Vec<PlaylistSummary>, ProviderError>;

    /// Which platform this provider talks to.
    fn platform(&self) -> Platform;

    /// Return the provider's name (for logging, UI, etc)
    fn name(&self) -> &str {
        self.platform().slug()
    }

    /// Return true if the provider is authenticated and ready to serve calls
    fn is_authenticated(&self) -> bool;
}
