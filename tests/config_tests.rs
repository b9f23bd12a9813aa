use std::fs::File;
use std::io::Write;
use std::time::Duration;
use tempfile::tempdir;

use playsync::config::Config;
use playsync::matcher::MatchPolicy;
use playsync::models::{Platform, RawTrack};
use playsync::normalize::normalize;

fn write_config(body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("cfg.toml");
    let mut f = File::create(&cfg_path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    (td, cfg_path)
}

#[test]
fn config_from_path_parses_toml() {
    let (_td, path) = write_config(
        r#"
log_dir = "/tmp/playsync-logs"
library_dir = "/tmp/library"
cache_db_path = "/tmp/cache.db"
max_concurrency_per_platform = 4
operation_timeout_secs = 60
max_retries_on_error = 5
retry_base_delay_ms = 250
retry_max_delay_ms = 8000
match_policy = "similarity"
similarity_threshold = 0.9
playlist_name_template = "${name} [${platform}]"
"#,
    );
    let cfg = Config::from_path(&path).expect("parse config");
    assert_eq!(cfg.log_dir.to_str().unwrap(), "/tmp/playsync-logs");
    assert_eq!(cfg.cache_db_path.as_deref().and_then(|p| p.to_str()), Some("/tmp/cache.db"));
    assert_eq!(cfg.max_concurrency_per_platform, 4);
    assert_eq!(cfg.match_policy, MatchPolicy::Similarity);
    assert_eq!(cfg.operation_timeout(), Duration::from_secs(60));

    let retry = cfg.retry_policy();
    assert_eq!(retry.max_retries, 5);
    assert_eq!(retry.base_delay, Duration::from_millis(250));
    assert_eq!(retry.max_delay, Duration::from_secs(8));
    assert_eq!(cfg.call_policy().gates().limit(), 4);
    assert_eq!(cfg.batch_runner().timeout(), Duration::from_secs(60));
}

#[test]
fn missing_fields_take_defaults() {
    let (_td, path) = write_config("");
    let cfg = Config::from_path(&path).unwrap();
    assert_eq!(cfg.max_concurrency_per_platform, 2);
    assert_eq!(cfg.operation_timeout_secs, 300);
    assert_eq!(cfg.max_retries_on_error, 3);
    assert_eq!(cfg.match_policy, MatchPolicy::Exact);
    assert_eq!(cfg.playlist_name_template, "${name}");
    assert!(cfg.cache_db_path.is_none());
    assert_eq!(cfg.backup_dir.to_str().unwrap(), "playlist_backups");
}

#[test]
fn invalid_values_are_rejected() {
    for body in [
        "max_concurrency_per_platform = 0",
        "operation_timeout_secs = 0",
        "retry_base_delay_ms = 100\nretry_max_delay_ms = 10",
        "similarity_threshold = 1.5",
        "playlist_name_template = \"fixed\"",
    ] {
        let (_td, path) = write_config(body);
        assert!(Config::from_path(&path).is_err(), "accepted: {}", body);
    }
}

#[test]
fn unknown_match_policy_fails_to_parse() {
    let (_td, path) = write_config("match_policy = \"fuzzy\"");
    assert!(Config::from_path(&path).is_err());
}

#[test]
fn matcher_follows_policy() {
    let a = normalize(Platform::Spotify, RawTrack::new("Shape of You", "Ed Sheeran")).unwrap();
    let b = normalize(Platform::Spotify, RawTrack::new("Shape of Yuo", "Ed Sheeran")).unwrap();

    let exact = Config::default();
    assert!(exact.validate().is_ok());
    assert!(!exact.matcher().matches(&a, &b));

    let similar = Config {
        match_policy: MatchPolicy::Similarity,
        ..Config::default()
    };
    assert!(similar.matcher().matches(&a, &b));
}
