use playsync::error::ReconcileError;
use playsync::matcher::ExactKeyMatcher;
use playsync::models::{NormalizedKey, Platform, RawTrack, ReconciliationResult, SourceListing, Track};
use playsync::normalize::normalize;
use playsync::reconcile::{compare, convert, merge, reconcile, ReconcileRequest};
use std::collections::BTreeSet;

fn track(platform: Platform, title: &str, artist: &str) -> Track {
    normalize(platform, RawTrack::new(title, artist)).unwrap()
}

fn listing(platform: Platform, songs: &[(&str, &str)]) -> SourceListing {
    SourceListing::new(platform, songs.iter().map(|(t, a)| track(platform, t, a)).collect())
}

fn keys(tracks: &[Track]) -> BTreeSet<NormalizedKey> {
    tracks.iter().map(|t| t.key().clone()).collect()
}

#[test]
fn convert_keeps_order_of_distinct_tracks() {
    let src = listing(Platform::Spotify, &[("Shape of You", "Ed Sheeran"), ("Perfect", "Ed Sheeran")]);
    let p = convert("Mine", src.tracks.clone(), &ExactKeyMatcher);
    assert_eq!(p.name(), "Mine");
    assert_eq!(p.tracks(), src.tracks.as_slice());
    assert_eq!(p.platform(), None);
    assert_eq!(p.remote_id(), None);
    assert_eq!(p.source_count(), 1);
}

#[test]
fn convert_of_empty_list_is_empty_playlist() {
    let p = convert("Nothing", Vec::new(), &ExactKeyMatcher);
    assert!(p.is_empty());
}

#[test]
fn merge_dedupes_across_platforms() {
    let spotify = listing(Platform::Spotify, &[("Shape of You", "Ed Sheeran")]);
    let youtube = listing(Platform::YoutubeMusic, &[("shape of you", "ed sheeran "), ("Stay", "Zedd")]);
    let p = merge("Both", vec![spotify, youtube], &ExactKeyMatcher);
    assert_eq!(p.len(), 2);
    assert_eq!(p.source_count(), 2);
    assert_eq!(p.tracks()[0].title(), "Shape of You");
    assert_eq!(p.tracks()[0].platform(), Platform::Spotify);
    assert_eq!(p.tracks()[1].title(), "Stay");
}

#[test]
fn merge_prefers_earliest_supplied_source() {
    let spotify = listing(Platform::Spotify, &[("Shape of You", "Ed Sheeran")]);
    let youtube = listing(Platform::YoutubeMusic, &[("shape of you", "ed sheeran")]);
    let p = merge("Both", vec![youtube, spotify], &ExactKeyMatcher);
    assert_eq!(p.len(), 1);
    assert_eq!(p.tracks()[0].platform(), Platform::YoutubeMusic);
    assert_eq!(p.tracks()[0].title(), "shape of you");
}

#[test]
fn merge_key_set_does_not_depend_on_source_order() {
    let a = listing(Platform::Spotify, &[("One", "A"), ("Two", "B"), ("One", "A")]);
    let b = listing(Platform::AppleMusic, &[("two", "b"), ("Three", "C")]);
    let ab = merge("x", vec![a.clone(), b.clone()], &ExactKeyMatcher);
    let ba = merge("x", vec![b, a], &ExactKeyMatcher);
    assert_eq!(keys(ab.tracks()), keys(ba.tracks()));
    assert_eq!(ab.len(), 3);
}

#[test]
fn compare_three_platforms_common_and_unique() {
    let spotify = listing(Platform::Spotify, &[("Shape of You", "Ed Sheeran")]);
    let apple = listing(Platform::AppleMusic, &[("Shape of You", "Ed Sheeran"), ("Perfect", "Ed Sheeran")]);
    let youtube = listing(Platform::YoutubeMusic, &[("shape of you", "ed sheeran")]);
    let cmp = compare(vec![spotify, apple, youtube], &ExactKeyMatcher).unwrap();

    assert_eq!(cmp.common.len(), 1);
    assert_eq!(cmp.common[0].title(), "Shape of You");
    let apple_only: Vec<&str> = cmp.unique_to(Platform::AppleMusic).iter().map(|t| t.title()).collect();
    assert_eq!(apple_only, vec!["Perfect"]);
    assert!(cmp.unique_to(Platform::Spotify).is_empty());
    assert!(cmp.unique_to(Platform::YoutubeMusic).is_empty());
    assert_eq!(cmp.unique_by_platform.len(), 3);
    assert!(cmp.partial_overlap.is_empty());
}

#[test]
fn accent_encoding_does_not_split_compare_or_merge() {
    let spotify = listing(Platform::Spotify, &[("Halo", "Beyonc\u{e9}")]);
    let apple = listing(Platform::AppleMusic, &[("Halo", "Beyonce\u{301}")]);

    let merged = merge("x", vec![spotify.clone(), apple.clone()], &ExactKeyMatcher);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.tracks()[0].artist(), "Beyonc\u{e9}");

    let cmp = compare(vec![spotify, apple], &ExactKeyMatcher).unwrap();
    assert_eq!(cmp.common.len(), 1);
    assert!(cmp.unique_to(Platform::Spotify).is_empty());
    assert!(cmp.unique_to(Platform::AppleMusic).is_empty());
}

#[test]
fn compare_surfaces_partial_overlap() {
    let spotify = listing(Platform::Spotify, &[("Stay", "Zedd"), ("Only Here", "S")]);
    let apple = listing(Platform::AppleMusic, &[("stay", "zedd"), ("Everywhere", "E")]);
    let youtube = listing(Platform::YoutubeMusic, &[("Everywhere", "E")]);
    let mut with_all = spotify.clone();
    with_all.tracks.push(track(Platform::Spotify, "Everywhere", "E"));

    let cmp = compare(vec![with_all, apple, youtube], &ExactKeyMatcher).unwrap();
    assert_eq!(cmp.common.len(), 1);
    assert_eq!(cmp.common[0].title(), "Everywhere");
    assert_eq!(cmp.partial_overlap.len(), 1);
    let stay = &cmp.partial_overlap[0];
    assert_eq!(stay.track.title(), "Stay");
    let expected: BTreeSet<Platform> = [Platform::Spotify, Platform::AppleMusic].into_iter().collect();
    assert_eq!(stay.platforms, expected);
    assert_eq!(cmp.overlap_for(stay.track.key()), Some(&expected));
    assert_eq!(cmp.unique_to(Platform::Spotify).len(), 1);
}

#[test]
fn compare_buckets_are_disjoint_and_complete() {
    let sources = vec![
        listing(Platform::Spotify, &[("A", "x"), ("B", "x"), ("C", "x"), ("A", "x")]),
        listing(Platform::AppleMusic, &[("b", "x"), ("C", "X"), ("D", "x")]),
        listing(Platform::YoutubeMusic, &[("c", "x"), ("E", "x")]),
    ];
    let mut input_keys = BTreeSet::new();
    for s in &sources {
        input_keys.extend(keys(&s.tracks));
    }

    let cmp = compare(sources, &ExactKeyMatcher).unwrap();
    let mut seen = BTreeSet::new();
    let mut total = 0usize;
    let mut buckets: Vec<Vec<Track>> = vec![cmp.common.clone()];
    buckets.extend(cmp.unique_by_platform.values().cloned());
    buckets.push(cmp.partial_overlap.iter().map(|p| p.track.clone()).collect());
    for bucket in &buckets {
        for t in bucket {
            total += 1;
            seen.insert(t.key().clone());
        }
    }
    assert_eq!(total, seen.len(), "a key appeared in more than one bucket");
    assert_eq!(seen, input_keys);
}

#[test]
fn compare_two_platforms_has_no_partial_overlap() {
    let a = listing(Platform::Spotify, &[("One", "A"), ("Two", "B")]);
    let b = listing(Platform::YoutubeMusic, &[("two", "b"), ("Three", "C")]);
    let cmp = compare(vec![a, b], &ExactKeyMatcher).unwrap();
    assert_eq!(cmp.common.len(), 1);
    assert_eq!(cmp.unique_to(Platform::Spotify).len(), 1);
    assert_eq!(cmp.unique_to(Platform::YoutubeMusic).len(), 1);
    assert!(cmp.partial_overlap.is_empty());
}

#[test]
fn compare_rejects_fewer_than_two_sources() {
    let one = listing(Platform::Spotify, &[("One", "A")]);
    assert!(matches!(
        compare(vec![one], &ExactKeyMatcher),
        Err(ReconcileError::InvalidRequest(_))
    ));
    assert!(matches!(
        compare(Vec::new(), &ExactKeyMatcher),
        Err(ReconcileError::InvalidRequest(_))
    ));
}

#[test]
fn compare_rejects_repeated_platform() {
    let a = listing(Platform::Spotify, &[("One", "A")]);
    let b = listing(Platform::Spotify, &[("Two", "B")]);
    assert!(matches!(
        compare(vec![a, b], &ExactKeyMatcher),
        Err(ReconcileError::InvalidRequest(_))
    ));
}

#[test]
fn reconcile_dispatches_on_request() {
    let src = listing(Platform::Spotify, &[("One", "A")]);
    match reconcile(ReconcileRequest::Convert { name: "n".into(), tracks: src.tracks.clone() }, &ExactKeyMatcher) {
        Ok(ReconciliationResult::Playlist(p)) => assert_eq!(p.len(), 1),
        other => panic!("unexpected result: {:?}", other),
    }
    let other = listing(Platform::AppleMusic, &[("One", "A")]);
    match reconcile(ReconcileRequest::Compare { sources: vec![src, other] }, &ExactKeyMatcher) {
        Ok(ReconciliationResult::Comparison(c)) => assert_eq!(c.common.len(), 1),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(reconcile(ReconcileRequest::Compare { sources: Vec::new() }, &ExactKeyMatcher).is_err());
}
