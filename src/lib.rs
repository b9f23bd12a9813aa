//! Core library for playsync: normalize, match, dedupe and reconcile playlists
//! across streaming platforms, and run the resulting writes as batches.
pub mod admission;
pub mod api;
pub mod backup;
pub mod batch;
pub mod config;
pub mod db;
pub mod dedupe;
pub mod error;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod resolver;
pub mod retry;
pub mod stats;
pub mod util;
pub mod worker;
