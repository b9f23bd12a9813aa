//! Multi-target jobs built on [`BatchRunner::run_batch`]: convert to several
//! platforms, sync rules, merge, compare, backup and restore.

use crate::backup::{BackupDocument, BackupPlaylist};
use crate::batch::{BatchOperation, BatchRunner};
use crate::config::Config;
use crate::error::{BatchError, ProviderError, ReconcileError};
use crate::matcher::Matcher;
use crate::models::{BatchOutcome, BatchTarget, Comparison, Platform, Playlist, SourceListing, Track, WorkReport};
use crate::reconcile;
use crate::resolver::Resolver;
use crate::stats::{playlist_stats, PlaylistStats};
use crate::util::{expand_template, extract_playlist_id};
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A playlist on a given platform, by id or share URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistSource {
    pub platform: Platform,
    pub reference: String,
}

impl PlaylistSource {
    pub fn new(platform: Platform, reference: impl Into<String>) -> Self {
        Self { platform, reference: reference.into() }
    }

    fn target(&self) -> BatchTarget {
        BatchTarget::Playlist {
            platform: self.platform,
            reference: self.reference.clone(),
        }
    }
}

/// Copy `source` to every platform in `targets` under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncRule {
    pub source: PlaylistSource,
    pub targets: Vec<Platform>,
    pub name: String,
}

/// Result of a backup job: the document to persist and one outcome per
/// fetched playlist (or per platform whose listing failed).
#[derive(Debug)]
pub struct BackupRun {
    pub document: BackupDocument,
    pub outcomes: Vec<BatchOutcome>,
}

#[derive(Clone)]
pub struct Worker {
    resolver: Arc<Resolver>,
    runner: BatchRunner,
    matcher: Arc<dyn Matcher>,
    name_template: String,
}

impl Worker {
    pub fn new(resolver: Arc<Resolver>, runner: BatchRunner, matcher: Arc<dyn Matcher>) -> Self {
        Self {
            resolver,
            runner,
            matcher,
            name_template: "${name}".into(),
        }
    }

    pub fn from_config(cfg: &Config, resolver: Arc<Resolver>) -> Self {
        Self::new(resolver, cfg.batch_runner(), cfg.matcher()).with_name_template(&cfg.playlist_name_template)
    }

    pub fn with_name_template(mut self, template: &str) -> Self {
        self.name_template = template.to_string();
        self
    }

    pub fn with_runner(mut self, runner: BatchRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn runner(&self) -> &BatchRunner {
        &self.runner
    }

    pub fn matcher(&self) -> &dyn Matcher {
        self.matcher.as_ref()
    }

    /// Convert one playlist to several platforms. The source platform is
    /// removed from `targets`, as are repeats. The source is fetched once.
    pub async fn convert_to_platforms(&self, source: &PlaylistSource, targets: &[Platform], name: &str) -> Vec<BatchOutcome> {
        log::info!("Starting conversion: source={} id={}", source.platform, source.reference);
        let rule = SyncRule {
            source: source.clone(),
            targets: targets.to_vec(),
            name: name.to_string(),
        };
        self.sync(vec![rule]).await
    }

    /// Apply sync rules: one outcome per (rule, target), rule order then
    /// target order. Targets equal to the rule's source platform are skipped.
    pub async fn sync(&self, rules: Vec<SyncRule>) -> Vec<BatchOutcome> {
        let mut operations = Vec::new();
        for rule in rules {
            let shared: Arc<OnceCell<Arc<Vec<Track>>>> = Arc::new(OnceCell::new());
            for target in distinct_targets(&rule) {
                let name = expand_template(&self.name_template, &rule.name, target);
                let op_target = BatchTarget::Playlist { platform: target, reference: name.clone() };
                let resolver = self.resolver.clone();
                let matcher = self.matcher.clone();
                let shared = shared.clone();
                let source = rule.source.clone();
                operations.push(BatchOperation::new(op_target, async move {
                    let tracks = shared
                        .get_or_try_init(|| async {
                            resolver
                                .fetch_playlist(source.platform, &source.reference)
                                .await
                                .map(Arc::new)
                        })
                        .await?;
                    if tracks.is_empty() {
                        log::warn!("No tracks found in source playlist {}", source.reference);
                    }
                    let playlist = reconcile::convert(name, tracks.to_vec(), matcher.as_ref());
                    resolver.write_playlist(target, &playlist, matcher.as_ref()).await
                }));
            }
        }
        self.runner.run_batch(operations).await
    }

    /// Fetch every source concurrently; one outcome per source, the playlist
    /// bound to its source platform.
    pub async fn fetch_all(&self, sources: &[PlaylistSource]) -> Vec<BatchOutcome> {
        let operations = sources
            .iter()
            .map(|source| {
                let resolver = self.resolver.clone();
                let matcher = self.matcher.clone();
                let source = source.clone();
                BatchOperation::new(source.target(), async move {
                    let tracks = resolver.fetch_playlist(source.platform, &source.reference).await?;
                    let id = extract_playlist_id(source.platform, &source.reference);
                    let playlist = reconcile::convert(id.clone(), tracks, matcher.as_ref());
                    Ok(WorkReport::complete(playlist.bound(source.platform, id)))
                })
            })
            .collect();
        self.runner.run_batch(operations).await
    }

    /// Merge several remote playlists and create the result on `target`.
    /// Fails without writing if any source cannot be fetched.
    pub async fn merge_into(&self, sources: &[PlaylistSource], target: Platform, name: &str) -> BatchOutcome {
        let name = expand_template(&self.name_template, name, target);
        let op_target = BatchTarget::Playlist { platform: target, reference: name.clone() };
        let listings = match self.fetch_listings(sources).await {
            Ok(l) => l,
            Err(e) => return BatchOutcome::failed(op_target, e),
        };

        let merged = reconcile::merge(name, listings, self.matcher.as_ref());
        log::info!("Merged into {} unique tracks", merged.len());
        let resolver = self.resolver.clone();
        let matcher = self.matcher.clone();
        let operation = BatchOperation::new(op_target.clone(), async move {
            resolver.write_playlist(target, &merged, matcher.as_ref()).await
        });
        self.runner
            .run_batch(vec![operation])
            .await
            .pop()
            .unwrap_or_else(|| BatchOutcome::failed(op_target, BatchError::Aborted("no outcome".into())))
    }

    /// Compare remote playlists. Needs at least two sources on distinct platforms.
    pub async fn compare_remote(&self, sources: &[PlaylistSource]) -> Result<Comparison, BatchError> {
        if sources.len() < 2 {
            return Err(ReconcileError::InvalidRequest(format!(
                "compare needs at least 2 sources, got {}",
                sources.len()
            ))
            .into());
        }
        let listings = self.fetch_listings(sources).await?;
        Ok(reconcile::compare(listings, self.matcher.as_ref())?)
    }

    async fn fetch_listings(&self, sources: &[PlaylistSource]) -> Result<Vec<SourceListing>, BatchError> {
        let mut listings = Vec::with_capacity(sources.len());
        for (source, outcome) in sources.iter().zip(self.fetch_all(sources).await) {
            if let Some(e) = outcome.error() {
                log::error!("Could not fetch {} playlist {}: {}", source.platform, source.reference, e);
                return Err(e.clone());
            }
            let tracks = outcome.into_playlist().map(Playlist::into_tracks).unwrap_or_default();
            listings.push(SourceListing::new(source.platform, tracks));
        }
        Ok(listings)
    }

    /// Summary figures for one remote playlist, named by its extracted id.
    pub async fn stats(&self, source: &PlaylistSource, top_n: usize) -> Result<PlaylistStats, ProviderError> {
        let tracks = self.resolver.fetch_playlist(source.platform, &source.reference).await?;
        let name = extract_playlist_id(source.platform, &source.reference);
        Ok(playlist_stats(&name, &tracks, top_n))
    }

    /// Back up every playlist of every platform in `platforms`.
    pub async fn backup(&self, platforms: &[Platform]) -> BackupRun {
        let listings = join_all(platforms.iter().map(|&p| {
            let resolver = self.resolver.clone();
            self.runner
                .guard(async move { resolver.list_playlists(p).await.map_err(BatchError::from) })
        }))
        .await;

        let mut operations = Vec::new();
        for (platform, listing) in platforms.iter().zip(&listings) {
            let Ok(summaries) = listing else { continue };
            log::info!("Backing up {} playlists from {}", summaries.len(), platform);
            for summary in summaries {
                let resolver = self.resolver.clone();
                let matcher = self.matcher.clone();
                let platform = *platform;
                let summary = summary.clone();
                let target = BatchTarget::Playlist { platform, reference: summary.id.clone() };
                operations.push(BatchOperation::new(target, async move {
                    let tracks = resolver.fetch_playlist(platform, &summary.id).await?;
                    let playlist = reconcile::convert(summary.name, tracks, matcher.as_ref());
                    Ok(WorkReport::complete(playlist.bound(platform, summary.id)))
                }));
            }
        }
        let mut fetched = self.runner.run_batch(operations).await.into_iter();

        let mut outcomes = Vec::new();
        let mut records = Vec::new();
        for (platform, listing) in platforms.iter().zip(listings) {
            match listing {
                Err(e) => {
                    log::error!("Could not list playlists on {}: {}", platform, e);
                    outcomes.push(BatchOutcome::failed(BatchTarget::Platform(*platform), e));
                }
                Ok(summaries) => {
                    for outcome in fetched.by_ref().take(summaries.len()) {
                        if let Some(p) = outcome.playlist() {
                            let id = p.remote_id().unwrap_or_default();
                            records.push(BackupPlaylist::from_playlist(id, *platform, p));
                        }
                        outcomes.push(outcome);
                    }
                }
            }
        }

        BackupRun {
            document: BackupDocument::new(records),
            outcomes,
        }
    }

    /// Recreate every record of `document` on each platform in `targets`.
    /// One outcome per (record, target), record order then target order.
    pub async fn restore(&self, document: &BackupDocument, targets: &[Platform]) -> Vec<BatchOutcome> {
        let mut operations = Vec::new();
        for record in &document.playlists {
            for &target in targets {
                let name = expand_template(&self.name_template, &record.name, target);
                let op_target = BatchTarget::Playlist { platform: target, reference: name.clone() };
                let resolver = self.resolver.clone();
                let matcher = self.matcher.clone();
                let record = record.clone();
                operations.push(BatchOperation::new(op_target, async move {
                    let tracks = record.to_tracks(target);
                    let playlist = reconcile::convert(name, tracks, matcher.as_ref());
                    resolver.write_playlist(target, &playlist, matcher.as_ref()).await
                }));
            }
        }
        log::info!("Restoring {} playlists to {} platforms", document.playlists.len(), targets.len());
        self.runner.run_batch(operations).await
    }
}

fn distinct_targets(rule: &SyncRule) -> Vec<Platform> {
    let mut out: Vec<Platform> = Vec::new();
    for &t in &rule.targets {
        if t == rule.source.platform {
            log::info!("Skipping target {}: it is the source platform", t);
            continue;
        }
        if !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
