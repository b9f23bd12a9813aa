use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use playsync as lib;
use lib::api::memory::MemoryProvider;
use lib::api::Provider;
use lib::backup::BackupDocument;
use lib::config::Config;
use lib::models::{BatchOutcome, BatchStatus, Comparison, Platform};
use lib::resolver::Resolver;
use lib::worker::{PlaylistSource, SyncRule, Worker};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "playsync", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a playlist to one or more other platforms
    Convert {
        /// Source platform (spotify, apple-music, youtube-music)
        #[arg(long, value_parser = parse_platform)]
        from: Platform,
        /// Playlist id or share URL on the source platform
        #[arg(long)]
        playlist: String,
        /// Target platforms; the source platform is skipped
        #[arg(long = "to", value_parser = parse_platform, required = true)]
        targets: Vec<Platform>,
        /// Name of the created playlists
        #[arg(long)]
        name: String,
    },
    /// Merge playlists from several platforms into one new playlist
    Merge {
        /// Sources as PLATFORM=PLAYLIST, in merge order
        #[arg(long = "source", value_parser = parse_source, required = true)]
        sources: Vec<PlaylistSource>,
        #[arg(long, value_parser = parse_platform)]
        to: Platform,
        #[arg(long)]
        name: String,
    },
    /// Compare playlists across platforms
    Compare {
        /// Sources as PLATFORM=PLAYLIST, at least two, on distinct platforms
        #[arg(long = "source", value_parser = parse_source, required = true)]
        sources: Vec<PlaylistSource>,
        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },
    /// Apply the sync rules listed in a TOML file
    Sync {
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,
    },
    /// Back up all playlists of the given platforms (all when omitted)
    Backup {
        #[arg(long = "platform", value_parser = parse_platform)]
        platforms: Vec<Platform>,
        /// Output file; defaults to a timestamped file in backup_dir
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Recreate the playlists of a backup file on the given platforms
    Restore {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
        #[arg(long = "to", value_parser = parse_platform, required = true)]
        targets: Vec<Platform>,
    },
    /// Print track count, total duration and top artists of a playlist
    Stats {
        #[arg(long, value_parser = parse_platform)]
        from: Platform,
        #[arg(long)]
        playlist: String,
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Drop cached search resolutions for a platform
    CacheClear {
        #[arg(long, value_parser = parse_platform)]
        platform: Platform,
    },
    /// Validate config file and exit
    ConfigValidate,
}

#[derive(Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<SyncRule>,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    s.parse::<Platform>().map_err(|e| e.to_string())
}

fn parse_source(s: &str) -> Result<PlaylistSource, String> {
    let (platform, reference) = s
        .split_once('=')
        .ok_or_else(|| format!("expected PLATFORM=PLAYLIST, got '{}'", s))?;
    if reference.trim().is_empty() {
        return Err(format!("missing playlist in '{}'", s));
    }
    Ok(PlaylistSource::new(parse_platform(platform)?, reference.trim()))
}

struct Library {
    dir: PathBuf,
    providers: Vec<Arc<MemoryProvider>>,
}

impl Library {
    fn load(dir: &Path) -> Result<Self> {
        let mut providers = Vec::new();
        for platform in Platform::ALL {
            let p = MemoryProvider::load(platform, dir)
                .with_context(|| format!("loading {} library", platform))?;
            providers.push(Arc::new(p));
        }
        Ok(Self { dir: dir.to_path_buf(), providers })
    }

    fn resolver(&self, cfg: &Config) -> Resolver {
        let mut resolver = Resolver::new(cfg.call_policy());
        if let Some(path) = &cfg.cache_db_path {
            resolver = resolver.with_cache(path.clone());
        }
        for p in &self.providers {
            resolver = resolver.with_provider(p.clone() as Arc<dyn Provider>);
        }
        resolver
    }

    fn save(&self) -> Result<()> {
        for p in &self.providers {
            p.save(&self.dir)?;
        }
        Ok(())
    }
}

fn print_outcomes(outcomes: &[BatchOutcome]) -> usize {
    let mut failed = 0usize;
    for o in outcomes {
        match o.status() {
            BatchStatus::Success => {
                let id = o.playlist().and_then(|p| p.remote_id()).unwrap_or("-");
                println!("[OK] {} -> {}", o.target(), id);
            }
            BatchStatus::Partial => {
                let id = o.playlist().and_then(|p| p.remote_id()).unwrap_or("-");
                println!("[PARTIAL] {} -> {} ({} tracks not found)", o.target(), id, o.unresolved().len());
                for t in o.unresolved() {
                    println!("    missing: {}", t);
                }
            }
            BatchStatus::Failed => {
                failed += 1;
                let msg = o.error().map(|e| e.to_string()).unwrap_or_default();
                eprintln!("[FAILED] {}: {}", o.target(), msg);
            }
        }
    }
    failed
}

fn print_comparison(cmp: &Comparison) {
    println!("Common to all ({}):", cmp.common.len());
    for t in &cmp.common {
        println!("  {}", t);
    }
    for (platform, tracks) in &cmp.unique_by_platform {
        println!("Only on {} ({}):", platform, tracks.len());
        for t in tracks {
            println!("  {}", t);
        }
    }
    if !cmp.partial_overlap.is_empty() {
        println!("On some platforms ({}):", cmp.partial_overlap.len());
        for o in &cmp.partial_overlap {
            let on: Vec<&str> = o.platforms.iter().map(|p| p.display_name()).collect();
            println!("  {} [{}]", o.track, on.join(", "));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Explicit --config wins; otherwise the system-wide file, otherwise defaults.
    let resolved_config_path: Option<PathBuf> = match &cli.config {
        Some(p) => Some(p.clone()),
        None => {
            let etc_path = Path::new("/etc/playsync/config.toml");
            etc_path.exists().then(|| etc_path.to_path_buf())
        }
    };

    let cfg = match &resolved_config_path {
        Some(path) => Config::from_path(path).with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    // log -> tracing bridge; output to stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender = tracing_appender::rolling::daily(&cfg.log_dir, "playsync.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber).expect("failed to set global tracing subscriber");

    if let Commands::ConfigValidate = cli.command {
        let Some(path) = resolved_config_path else {
            eprintln!("No config file found; defaults are in use.");
            std::process::exit(2);
        };
        match Config::from_path(&path) {
            Ok(_) => println!("OK"),
            Err(e) => {
                eprintln!("Config validation failed: {}", e);
                std::process::exit(2);
            }
        }
        return Ok(());
    }

    if let Commands::CacheClear { platform } = cli.command {
        let Some(path) = &cfg.cache_db_path else {
            println!("No cache_db_path configured; nothing to clear.");
            return Ok(());
        };
        let mut conn = lib::db::open_or_create(path)?;
        let removed = lib::db::clear_resolutions(&mut conn, platform)?;
        println!("Cleared {} cached resolution(s) for {}.", removed, platform);
        return Ok(());
    }

    let library = Library::load(&cfg.library_dir)?;
    let resolver = Arc::new(library.resolver(&cfg));
    let cancel = CancellationToken::new();
    let worker = Worker::from_config(&cfg, resolver.clone())
        .with_runner(cfg.batch_runner().with_cancellation(cancel.clone()));

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling pending operations");
                cancel.cancel();
            }
        });
    }

    let failed = match cli.command {
        Commands::Convert { from, playlist, targets, name } => {
            let source = PlaylistSource::new(from, playlist);
            let outcomes = worker.convert_to_platforms(&source, &targets, &name).await;
            print_outcomes(&outcomes)
        }
        Commands::Merge { sources, to, name } => {
            let outcome = worker.merge_into(&sources, to, &name).await;
            print_outcomes(std::slice::from_ref(&outcome))
        }
        Commands::Compare { sources, json } => {
            let cmp = worker.compare_remote(&sources).await.context("comparing playlists")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cmp)?);
            } else {
                print_comparison(&cmp);
            }
            0
        }
        Commands::Sync { rules } => {
            let s = std::fs::read_to_string(&rules).with_context(|| format!("reading rules {}", rules.display()))?;
            let file: RulesFile = toml::from_str(&s).with_context(|| format!("parsing rules {}", rules.display()))?;
            if file.rules.is_empty() {
                println!("No sync rules in {}.", rules.display());
                return Ok(());
            }
            let outcomes = worker.sync(file.rules).await;
            print_outcomes(&outcomes)
        }
        Commands::Backup { platforms, out } => {
            let platforms = if platforms.is_empty() { resolver.platforms() } else { platforms };
            let run = worker.backup(&platforms).await;
            let path = out.unwrap_or_else(|| cfg.backup_dir.join(run.document.file_name()));
            run.document.write(&path)?;
            println!("Backed up {} playlist(s) to {}", run.document.total_playlists, path.display());
            run.outcomes.iter().filter(|o| o.status() == BatchStatus::Failed).count()
        }
        Commands::Restore { file, targets } => {
            let document = BackupDocument::read(&file)?;
            let outcomes = worker.restore(&document, &targets).await;
            print_outcomes(&outcomes)
        }
        Commands::Stats { from, playlist, top } => {
            let stats = worker.stats(&PlaylistSource::new(from, playlist), top).await?;
            println!("Playlist: {}", stats.name);
            println!("Tracks: {}", stats.total_tracks);
            println!("Duration: {}", lib::stats::format_duration(stats.total_duration));
            if stats.tracks_without_duration > 0 {
                println!("  ({} tracks without duration)", stats.tracks_without_duration);
            }
            println!("Top artists:");
            for (artist, count) in &stats.top_artists {
                println!("  {} ({})", artist, count);
            }
            0
        }
        Commands::ConfigValidate | Commands::CacheClear { .. } => 0,
    };

    library.save().context("saving library")?;

    if cancel.is_cancelled() {
        bail!("interrupted");
    }
    if failed > 0 {
        eprintln!("Completed with {} failure(s).", failed);
        std::process::exit(1);
    }
    Ok(())
}
