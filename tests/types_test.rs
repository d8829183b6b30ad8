use chosicli::{
    download::{AssetSpec, ImageVariant},
    types::*,
};
use serde_json::json;

#[test]
fn test_track_lenient_fields() {
    let track = Track::from_value(&json!({
        "id": 12345,
        "name": null,
        "artists": [{ "id": "a1", "name": "Band" }, "garbage", { "name": "Guest" }],
        "duration_ms": "215,000",
        "popularity": 71.0,
        "preview_url": ""
    }))
    .unwrap();

    assert_eq!(track.id, "12345");
    assert_eq!(track.name, "");
    assert_eq!(track.artist_display(), "Band, Guest");
    assert_eq!(track.duration_ms, 215000);
    assert_eq!(track.popularity, 71);
    assert_eq!(track.preview_url, None);
}

#[test]
fn test_track_image_fallbacks() {
    let track = Track::from_value(&json!({
        "id": "t1",
        "album": { "image": "https://cdn.example/a.jpg", "image_large": "https://cdn.example/b.jpg" }
    }))
    .unwrap();

    assert_eq!(track.image.as_deref(), Some("https://cdn.example/a.jpg"));
    assert_eq!(track.image_default(), Some("https://cdn.example/a.jpg"));
    assert_eq!(track.image_large(), Some("https://cdn.example/b.jpg"));

    let bare = Track::from_value(&json!({ "id": "t2", "image": "https://cdn.example/c.jpg" })).unwrap();
    assert_eq!(bare.image_default(), Some("https://cdn.example/c.jpg"));
    assert_eq!(bare.image_large(), None);

    assert!(Track::from_value(&json!("t3")).is_none());
}

#[test]
fn test_asset_spec_from_track() {
    let track = Track::from_value(&json!({
        "id": "t1",
        "name": "Song",
        "artist": "Solo",
        "preview_url": "https://cdn.example/p.mp3",
        "album": { "image_default": "https://cdn.example/s.jpg" }
    }))
    .unwrap();

    let spec = AssetSpec::from_track(&track);
    assert_eq!(spec.track_id, "t1");
    assert_eq!(spec.artist_name, "Solo");
    assert_eq!(spec.preview_url.as_deref(), Some("https://cdn.example/p.mp3"));
    assert_eq!(spec.image(ImageVariant::Default), Some("https://cdn.example/s.jpg"));
    assert_eq!(spec.image(ImageVariant::Large), None);
}

#[test]
fn test_artist_counts_and_genres() {
    let artist = Artist::from_value(&json!({
        "id": "ar1",
        "name": "Band",
        "followers": { "total": 98765 },
        "popularity": "42",
        "genres": ["rock", null, 7]
    }))
    .unwrap();

    assert_eq!(artist.followers, 98765);
    assert_eq!(artist.popularity, 42);
    assert_eq!(artist.genres, vec!["rock".to_string(), "7".to_string()]);
}

#[test]
fn test_genre_release_and_playlist_aliases() {
    let release = GenreRelease::from(&json!({
        "album_id": "al1",
        "name": "Album",
        "releaseDate": "2024-05-01",
        "artist": "Band"
    }));
    assert_eq!(release.album_id, "al1");
    assert_eq!(release.album_name, "Album");
    assert_eq!(release.release_date.as_deref(), Some("2024-05-01"));
    assert_eq!(release.artist_name.as_deref(), Some("Band"));
    assert_eq!(release.album_url, None);

    let playlist = TopPlaylist::from(&json!({
        "uri": "spotify:playlist:p1",
        "playlistName": "Mix",
        "followers_count": "1,500",
        "genre_name": "rock"
    }));
    assert_eq!(playlist.id, "spotify:playlist:p1");
    assert_eq!(playlist.name, "Mix");
    assert_eq!(playlist.followers, Some(1500));
    assert_eq!(playlist.parent_genre.as_deref(), Some("rock"));
}

#[test]
fn test_search_result_splits_items() {
    let items = vec![
        SearchItem::Track(Track::from_value(&json!({ "id": "t1" })).unwrap()),
        SearchItem::Artist(Artist::from_value(&json!({ "id": "a1" })).unwrap()),
        SearchItem::Track(Track::from_value(&json!({ "id": "t2" })).unwrap()),
    ];

    let result = SearchResult::from(items);
    assert_eq!(result.tracks.len(), 2);
    assert_eq!(result.artists.len(), 1);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["tracks"][1]["id"], "t2");
    assert!(json["tracks"][0].get("artist").is_none());
}

#[test]
fn test_features_accept_strings() {
    let features: Features = serde_json::from_value(json!({
        "tempo": "98.0",
        "valence": "0,5",
        "key": "7",
        "mode": null
    }))
    .unwrap();

    assert_eq!(features.tempo, 98.0);
    assert_eq!(features.valence, 0.5);
    assert_eq!(features.key, 7);
    assert_eq!(features.mode, 0);
}

#[test]
fn test_features_reject_wrong_types() {
    let result: Result<Features, _> = serde_json::from_value(json!({
        "danceability": [1, 2]
    }));
    assert!(result.is_err());

    let features: Features = serde_json::from_value(json!({ "tempo": "", "energy": null })).unwrap();
    assert_eq!(features.tempo, 0.0);
    assert_eq!(features.energy, 0.0);
}
