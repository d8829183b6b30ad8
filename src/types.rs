use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;
use tabled::Tabled;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimpleArtist {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Album {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub album_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub release_date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub release_date_precision: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub image_default: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub image_large: Option<String>,
    // some payloads only carry a single `image`
    #[serde(default, deserialize_with = "non_empty_string", skip_serializing)]
    image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Track {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_artists")]
    pub artists: Vec<SimpleArtist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub preview_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration_ms: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub popularity: u64,
    #[serde(default, rename = "artist", deserialize_with = "non_empty_string", skip_serializing)]
    artist_name: Option<String>,
}

impl Track {
    /// Maps a raw track object, filling the fallbacks the API is inconsistent
    /// about: the album's default image stands in for a missing track image
    /// and a bare `artist` string stands in for a missing `artists` list.
    pub fn from_value(value: &Value) -> Option<Track> {
        if !value.is_object() {
            return None;
        }

        let mut track: Track = serde_json::from_value(value.clone()).ok()?;

        if let Some(album) = track.album.as_mut() {
            if album.image_default.is_none() {
                album.image_default = album.image.clone();
            }
        }

        if track.image.is_none() {
            track.image = track
                .album
                .as_ref()
                .and_then(|album| album.image_default.clone());
        }

        if track.artists.is_empty() {
            if let Some(name) = track.artist_name.take() {
                track.artists.push(SimpleArtist {
                    id: String::new(),
                    name,
                });
            }
        }

        Some(track)
    }

    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    pub fn artist_display(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn image_default(&self) -> Option<&str> {
        self.album
            .as_ref()
            .and_then(|a| a.image_default.as_deref())
            .or(self.image.as_deref())
    }

    pub fn image_large(&self) -> Option<&str> {
        self.album.as_ref().and_then(|a| a.image_large.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "non_empty_string")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub popularity: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub followers: u64,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub updated_date: String,
}

impl Artist {
    pub fn from_value(value: &Value) -> Option<Artist> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

/// Audio features of a single track as reported by `audio-features/{id}`.
///
/// Numbers may arrive as strings, and missing or `null` fields read as zero.
/// A value of any other type fails deserialisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Features {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "number_u64")]
    pub duration_ms: u64,
    #[serde(default, deserialize_with = "number_f64")]
    pub danceability: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub energy: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub speechiness: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub acousticness: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub instrumentalness: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub liveness: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub valence: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub loudness: f64,
    #[serde(default, deserialize_with = "number_f64")]
    pub tempo: f64,
    #[serde(default, deserialize_with = "number_i64")]
    pub key: i64,
    #[serde(default, deserialize_with = "number_i64")]
    pub mode: i64,
    #[serde(default, deserialize_with = "number_i64")]
    pub time_signature: i64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GenreRelease {
    pub album_id: String,
    pub album_name: String,
    pub album_url: Option<String>,
    pub album_img: Option<String>,
    pub release_date: Option<String>,
    pub artist_name: Option<String>,
    pub album_type: Option<String>,
}

impl From<&Value> for GenreRelease {
    fn from(value: &Value) -> Self {
        GenreRelease {
            album_id: pick_str(value, &["albumId", "album_id", "id"]).unwrap_or_default(),
            album_name: pick_str(value, &["albumName", "album_name", "name"]).unwrap_or_default(),
            album_url: pick_str(value, &["albumUrl", "album_url"]),
            album_img: pick_str(value, &["albumImg", "album_img", "image"]),
            release_date: pick_str(value, &["release_date", "releaseDate"]),
            artist_name: pick_str(value, &["artistName", "artist_name", "artist"]),
            album_type: pick_str(value, &["album_type", "albumType"]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TopPlaylist {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub tracks_count: Option<u64>,
    pub followers: Option<u64>,
    pub parent_genre: Option<String>,
}

impl From<&Value> for TopPlaylist {
    fn from(value: &Value) -> Self {
        TopPlaylist {
            id: pick_str(value, &["id", "playlist_id", "playlistId", "uri"]).unwrap_or_default(),
            name: pick_str(value, &["name", "playlistName"]).unwrap_or_default(),
            url: pick_str(value, &["playlist_url", "playlistUrl", "url"]),
            image: pick_str(value, &["image", "playlist_img", "playlistImage"]),
            description: pick_str(value, &["description", "desc"]),
            tracks_count: pick_u64(value, &["tracks_count", "num_tracks", "track_count"]),
            followers: pick_u64(value, &["followers", "followers_count"]),
            parent_genre: pick_str(value, &["parent_genre", "genre_name"]),
        }
    }
}

/// A single search hit; which variant depends on the requested search type.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SearchItem {
    Track(Track),
    Artist(Artist),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResult {
    pub tracks: Vec<Track>,
    pub artists: Vec<Artist>,
}

impl From<Vec<SearchItem>> for SearchResult {
    fn from(items: Vec<SearchItem>) -> Self {
        let mut result = SearchResult::default();
        for item in items {
            match item {
                SearchItem::Track(t) => result.tracks.push(t),
                SearchItem::Artist(a) => result.artists.push(a),
            }
        }
        result
    }
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub id: String,
    pub name: String,
    pub artists: String,
    pub preview: String,
}

impl From<&Track> for TrackTableRow {
    fn from(track: &Track) -> Self {
        TrackTableRow {
            id: track.id.clone(),
            name: track.name.clone(),
            artists: track.artist_display(),
            preview: if track.preview_url.is_some() { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub id: String,
    pub name: String,
    pub followers: u64,
    pub genres: String,
}

impl From<&Artist> for ArtistTableRow {
    fn from(artist: &Artist) -> Self {
        ArtistTableRow {
            id: artist.id.clone(),
            name: artist.name.clone(),
            followers: artist.followers,
            genres: artist
                .genres
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

#[derive(Tabled)]
pub struct ParamTableRow {
    pub name: &'static str,
    #[tabled(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_to_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.replace(',', "").trim().parse().ok(),
        // `{ "total": n }`, as used for follower counts
        Value::Object(map) => map.get("total").and_then(value_to_u64),
        _ => None,
    }
}

fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok().or_else(|| s.replace(',', ".").parse().ok()),
        _ => None,
    }
}

fn pick_str(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(value_to_string))
}

fn pick_u64(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| value.get(*k).and_then(value_to_u64))
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_to_string).unwrap_or_default())
}

fn non_empty_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_to_string))
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    Ok(v.as_ref().and_then(value_to_u64).unwrap_or(0))
}

fn number_or_error<'de, D, T>(
    d: D,
    convert: fn(&Value) -> Option<T>,
    zero: T,
) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(zero),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(zero),
        Some(v) => convert(&v)
            .ok_or_else(|| de::Error::custom(format!("expected a number, got {}", v))),
    }
}

fn number_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    number_or_error(d, value_to_u64, 0)
}

fn number_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    number_or_error(d, |v| value_to_f64(v).map(|f| f as i64), 0)
}

fn number_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    number_or_error(d, value_to_f64, 0.0)
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    let Some(Value::Array(items)) = v else {
        return Ok(Vec::new());
    };
    Ok(items.iter().filter_map(value_to_string).collect())
}

// skips malformed entries instead of rejecting the whole track
fn lenient_artists<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<SimpleArtist>, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    let Some(Value::Array(items)) = v else {
        return Ok(Vec::new());
    };

    Ok(items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| serde_json::from_value(item.clone()).ok())
        .collect())
}
