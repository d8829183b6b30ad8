use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    chosic::{
        client::{GENRES_URL, HttpClient},
        pagination::{AggregatedResult, PAGE_DELAY, Page, Paginator, RateLimiter},
    },
    error::{ApiError, PaginationError},
    types::{Artist, Features, GenreRelease, SearchItem, TopPlaylist, Track},
    utils::{ExtraParam, MAX_PER_REQUEST, extract_spotify_id, join_ids},
};

type Params = Vec<(String, String)>;

/// How many results to ask for and whether to walk through pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub fetch_all: bool,
    pub page_size: u32,
    pub limit: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            fetch_all: false,
            page_size: 10,
            limit: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SearchKind {
    #[default]
    Track,
    Artist,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::Track => "track",
            SearchKind::Artist => "artist",
        }
    }

    fn collection_key(&self) -> &'static str {
        match self {
            SearchKind::Track => "tracks",
            SearchKind::Artist => "artists",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub q: String,
    pub kind: SearchKind,
    pub extra: Vec<ExtraParam>,
}

impl SearchQuery {
    /// Drops every extra param named `key` and returns how many were removed.
    ///
    /// Extra params win over the paging settings, so a caller that pins
    /// `limit` itself has to take the user's `limit` out first.
    pub fn remove_param(&mut self, key: &str) -> usize {
        let before = self.extra.len();
        self.extra.retain(|p| p.key != key);
        before - self.extra.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationQuery {
    pub seed_tracks: Vec<String>,
    pub seed_artists: Vec<String>,
    pub extra: Vec<ExtraParam>,
}

/// One method per upstream endpoint, on top of a shared [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ChosicService {
    client: HttpClient,
    page_delay: Duration,
}

impl ChosicService {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            page_delay: PAGE_DELAY,
        }
    }

    /// Overrides the pause between page requests.
    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// The underlying client, shared with the asset downloader.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Looks up a single track. `Ok(None)` means the API answered but had no
    /// data for this id.
    pub async fn get_track(&self, track: &str) -> Result<Option<Track>, ApiError> {
        let id = extract_spotify_id(track);
        if id.is_empty() {
            return Ok(None);
        }

        let response = self.client.get_json(&format!("tracks/{}", id), &[]).await?;

        let raw = match response.body.get("tracks") {
            Some(tracks) => collection_items(tracks, &[]).first().cloned(),
            None => Some(&response.body),
        };

        let track = raw
            .and_then(Track::from_value)
            .filter(|t| !t.id.is_empty());

        match &track {
            Some(t) => info!(id = %t.id, name = %t.name, "track resolved"),
            None => info!(%id, "no track data returned"),
        }

        Ok(track)
    }

    /// Looks up several artists in one request.
    ///
    /// # Arguments
    ///
    /// * `ids` - Artist ids, `spotify:artist:` URIs or open.spotify.com links;
    ///   they are reduced to bare ids and sent comma separated as `ids`
    ///
    /// # Returns
    ///
    /// The artists the API knew about, in response order. Unknown ids are
    /// simply missing from the list. Follower counts and popularity are read
    /// leniently (`"1,234"`, `{ "total": 1234 }` and `1234` are all accepted).
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let artists = service
    ///     .get_artists(&["0C0XlULifJtAgn6ZNCW2eu", "spotify:artist:4NHQUGzhtTLFvgF5SZesLK"])
    ///     .await?;
    /// for artist in &artists {
    ///     println!("{} ({} followers)", artist.name, artist.followers);
    /// }
    /// ```
    pub async fn get_artists<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Artist>, ApiError> {
        let ids = join_ids(ids);
        let response = self
            .client
            .get_json("artists", &[("ids".to_string(), ids)])
            .await?;

        let mut artists: Vec<Artist> = collection_items(&response.body, &["artists"])
            .into_iter()
            .filter_map(Artist::from_value)
            .collect();

        // a single id may come back as a bare artist object
        if artists.is_empty() && response.body.get("id").is_some() {
            artists.extend(Artist::from_value(&response.body));
        }

        info!(count = artists.len(), "artists resolved");
        Ok(artists)
    }

    /// Tracks similar to the given seed tracks and artists.
    ///
    /// # Arguments
    ///
    /// * `query` - Seeds plus any extra `key=value` params such as
    ///   `target_energy=80`; extra params override the generated ones
    /// * `paging` - Single request, or walk pages until `paging.limit`
    ///
    /// # Errors
    ///
    /// A failed page aborts the fetch. The [`PaginationError`] still holds the
    /// tracks received before it.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let query = RecommendationQuery {
    ///     seed_tracks: vec!["6r7FXNO57mlZCBY6PXcZZT".into()],
    ///     ..Default::default()
    /// };
    /// let result = service.recommendations(&query, &Paging::default()).await?;
    /// println!("{} tracks in {} pages", result.items.len(), result.pages);
    /// ```
    pub async fn recommendations(
        &self,
        query: &RecommendationQuery,
        paging: &Paging,
    ) -> Result<AggregatedResult<Track>, PaginationError<Track>> {
        let mut params = Params::new();
        if !query.seed_tracks.is_empty() {
            set_param(&mut params, "seed_tracks", join_ids(&query.seed_tracks));
        }
        if !query.seed_artists.is_empty() {
            set_param(&mut params, "seed_artists", join_ids(&query.seed_artists));
        }
        apply_extra(&mut params, &query.extra);

        self.paged("recommendations", params, paging, |value| {
            first_collection(value, &["tracks"])
                .into_iter()
                .filter_map(Track::from_value)
                .collect()
        })
        .await
    }

    /// Searches tracks or artists.
    ///
    /// # Arguments
    ///
    /// * `query` - Search term, [`SearchKind`] and extra params
    /// * `paging` - Without `fetch_all` one request is made with `limit`
    ///   capped at 100; with it, pages of `page_size` are requested until
    ///   `limit` results are collected
    ///
    /// # Returns
    ///
    /// Hits of the requested kind only, in the order the API returned them.
    /// Convert them with `SearchResult::from` to split tracks from artists.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let query = SearchQuery { q: "daft punk".into(), kind: SearchKind::Artist, extra: vec![] };
    /// let paging = Paging { fetch_all: true, page_size: 20, limit: 60 };
    /// let hits = service.search(&query, &paging).await?;
    /// ```
    pub async fn search(
        &self,
        query: &SearchQuery,
        paging: &Paging,
    ) -> Result<AggregatedResult<SearchItem>, PaginationError<SearchItem>> {
        let mut params = Params::new();
        set_param(&mut params, "q", query.q.clone());
        set_param(&mut params, "type", query.kind.as_str().to_string());
        apply_extra(&mut params, &query.extra);

        let kind = query.kind;
        self.paged("search", params, paging, move |value| {
            let items = first_collection(value, &[kind.collection_key()]);
            match kind {
                SearchKind::Track => items
                    .into_iter()
                    .filter_map(Track::from_value)
                    .map(SearchItem::Track)
                    .collect(),
                SearchKind::Artist => items
                    .into_iter()
                    .filter_map(Artist::from_value)
                    .map(SearchItem::Artist)
                    .collect(),
            }
        })
        .await
    }

    /// Fetches the audio features of one track.
    ///
    /// # Arguments
    ///
    /// * `track` - Track id, `spotify:track:` URI or open.spotify.com link
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Features))` - the features of the track
    /// - `Ok(None)` - the API answered with an empty body or an empty object
    /// - `Err(ApiError::Decode)` - the body is not a features object, e.g. a
    ///   WordPress error such as `{"code": "rest_forbidden", ...}`, or a field
    ///   has the wrong type
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// if let Some(features) = service.audio_features("6r7FXNO57mlZCBY6PXcZZT").await? {
    ///     println!("{} BPM", features.tempo);
    /// }
    /// ```
    pub async fn audio_features(&self, track: &str) -> Result<Option<Features>, ApiError> {
        let id = extract_spotify_id(track);
        let endpoint = format!("audio-features/{}", id);
        let response = self.client.get_json(&endpoint, &[]).await?;
        let url = self.client.endpoint_url(&endpoint);

        let raw = response.body.get("features").unwrap_or(&response.body);

        let fields = match raw {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(fields) => Some(fields),
            other => return Err(decode_error(url, format!("expected an object, got {}", other))),
        };
        let Some(fields) = fields.filter(|f| !f.is_empty()) else {
            info!(%id, "no audio features returned");
            return Ok(None);
        };

        if !FEATURE_KEYS.iter().any(|k| fields.contains_key(*k)) {
            let code = fields.get("code").and_then(Value::as_str).unwrap_or("unknown");
            return Err(decode_error(url, format!("no audio features in response (code {})", code)));
        }

        let features: Features = serde_json::from_value(raw.clone())
            .map_err(|source| ApiError::Decode { url, source })?;
        info!(%id, "audio features resolved");
        Ok(Some(features))
    }

    /// New releases for a genre, from the `genre-releases` endpoint.
    ///
    /// # Arguments
    ///
    /// * `genre` - Genre name as used by the site, e.g. `"indie rock"`
    /// * `limit` - Sent as `limit` when given
    /// * `extra` - Additional params passed through unchanged
    ///
    /// The endpoint is only served with the `app: new_releases` header, which
    /// [`HttpClient`] adds on its own.
    pub async fn genre_releases(
        &self,
        genre: &str,
        limit: Option<u32>,
        extra: &[ExtraParam],
    ) -> Result<Vec<GenreRelease>, ApiError> {
        let mut params = Params::new();
        set_param(&mut params, "genre", genre.to_string());
        if let Some(limit) = limit {
            set_param(&mut params, "limit", limit.to_string());
        }
        apply_extra(&mut params, extra);

        let response = self.client.get_json("genre-releases", &params).await?;
        let releases: Vec<GenreRelease> = collection_items(&response.body, &["genre_releases"])
            .into_iter()
            .filter(|v| v.is_object())
            .map(GenreRelease::from)
            .collect();

        info!(%genre, count = releases.len(), "genre releases resolved");
        Ok(releases)
    }

    /// Top playlists for an artist or a genre.
    ///
    /// # Arguments
    ///
    /// * `artist_id` - Artist id, URI or link; empty values are not sent
    /// * `genre_name` - Genre name; empty values are not sent
    /// * `limit` - Sent as `limit` when given
    /// * `extra` - Additional params passed through unchanged
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let playlists = service.top_playlists(None, Some("techno"), Some(10), &[]).await?;
    /// ```
    pub async fn top_playlists(
        &self,
        artist_id: Option<&str>,
        genre_name: Option<&str>,
        limit: Option<u32>,
        extra: &[ExtraParam],
    ) -> Result<Vec<TopPlaylist>, ApiError> {
        let mut params = Params::new();
        if let Some(artist_id) = artist_id.filter(|a| !a.is_empty()) {
            set_param(&mut params, "artist_id", extract_spotify_id(artist_id));
        }
        if let Some(genre_name) = genre_name.filter(|g| !g.is_empty()) {
            set_param(&mut params, "genre_name", genre_name.to_string());
        }
        if let Some(limit) = limit {
            set_param(&mut params, "limit", limit.to_string());
        }
        apply_extra(&mut params, extra);

        let response = self.client.get_json("top-playlists", &params).await?;
        let playlists: Vec<TopPlaylist> = collection_items(&response.body, &["top_playlists"])
            .into_iter()
            .filter(|v| v.is_object())
            .map(TopPlaylist::from)
            .collect();

        info!(count = playlists.len(), "top playlists resolved");
        Ok(playlists)
    }

    /// The complete genre list, served as a static file outside the API.
    pub async fn all_genres(&self) -> Result<Value, ApiError> {
        self.all_genres_from(GENRES_URL).await
    }

    /// Same as [`ChosicService::all_genres`], from another location.
    pub async fn all_genres_from(&self, url: &str) -> Result<Value, ApiError> {
        Ok(self.client.get_absolute_json(url).await?.body)
    }

    /// Runs a listing endpoint either as one request or through the
    /// [`Paginator`], depending on `paging.fetch_all`.
    ///
    /// The API pages by number, so each offset is mapped onto
    /// `page = offset / page_size + 1`.
    async fn paged<T, M>(
        &self,
        endpoint: &str,
        params: Params,
        paging: &Paging,
        map: M,
    ) -> Result<AggregatedResult<T>, PaginationError<T>>
    where
        M: Fn(&Value) -> Vec<T>,
    {
        let client = &self.client;
        let map = &map;

        if !paging.fetch_all {
            let mut params = params;
            if !params.iter().any(|(k, _)| k == "limit") {
                set_param(
                    &mut params,
                    "limit",
                    paging.limit.clamp(1, MAX_PER_REQUEST).to_string(),
                );
            }
            debug!(%endpoint, "single page request");

            let mut paginator = Paginator::new(MAX_PER_REQUEST, RateLimiter::new(self.page_delay));
            return paginator
                .fetch_all(None, |_| {
                    let params = params.clone();
                    async move {
                        let response = client.get_json(endpoint, &params).await?;
                        Ok::<_, ApiError>(Page::new(map(&response.body), None))
                    }
                })
                .await;
        }

        let mut paginator = Paginator::new(paging.page_size, RateLimiter::new(self.page_delay));
        let page_size = paginator.page_size();
        debug!(%endpoint, page_size, limit = paging.limit, "paginated request");

        paginator
            .fetch_all(Some(paging.limit as usize), |request| {
                let mut params = params.clone();
                set_param(&mut params, "limit", request.page_size.to_string());
                set_param(&mut params, "page", request.page_number().to_string());
                async move {
                    let response = client.get_json(endpoint, &params).await?;
                    let total = response.total_items(page_size);
                    Ok::<_, ApiError>(Page::new(map(&response.body), total))
                }
            })
            .await
    }
}

/// Keys of which at least one must be present in a features object.
const FEATURE_KEYS: &[&str] = &[
    "danceability",
    "energy",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "loudness",
    "tempo",
    "key",
    "mode",
    "time_signature",
    "duration_ms",
];

fn decode_error(url: String, message: String) -> ApiError {
    ApiError::Decode {
        url,
        source: serde::de::Error::custom(message),
    }
}

fn set_param(params: &mut Params, key: &str, value: String) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key.to_string(), value)),
    }
}

fn apply_extra(params: &mut Params, extra: &[ExtraParam]) {
    for param in extra {
        set_param(params, &param.key, param.value.clone());
    }
}

/// Items of a collection that may be a bare list or `{ "items": [...] }`.
///
/// Each key in `keys` is tried first; when none matches, the body itself is
/// treated as the collection.
pub(crate) fn collection_items<'a>(body: &'a Value, keys: &[&str]) -> Vec<&'a Value> {
    let node = keys
        .iter()
        .find_map(|k| body.get(*k).filter(|v| !v.is_null()))
        .unwrap_or(body);

    list_of(node)
}

// like collection_items, but a missing key means no items
fn first_collection<'a>(body: &'a Value, keys: &[&str]) -> Vec<&'a Value> {
    match keys.iter().find_map(|k| body.get(*k)) {
        Some(node) => list_of(node),
        None if body.is_array() => list_of(body),
        None => Vec::new(),
    }
}

fn list_of(node: &Value) -> Vec<&Value> {
    match node {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => node
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_items_accepts_list_and_items_object() {
        let list = json!({ "tracks": [{ "id": "a" }, { "id": "b" }] });
        assert_eq!(collection_items(&list, &["tracks"]).len(), 2);

        let paged = json!({ "tracks": { "items": [{ "id": "a" }] } });
        assert_eq!(collection_items(&paged, &["tracks"]).len(), 1);

        let bare = json!([{ "albumId": "x" }]);
        assert_eq!(collection_items(&bare, &["genre_releases"]).len(), 1);
    }

    #[test]
    fn test_first_collection_missing_key_is_empty() {
        let body = json!({ "artists": [{ "id": "a" }] });
        assert!(first_collection(&body, &["tracks"]).is_empty());
    }

    #[test]
    fn test_set_param_overrides_existing_key() {
        let mut params = Params::new();
        set_param(&mut params, "limit", "10".to_string());
        set_param(&mut params, "q", "rock".to_string());
        set_param(&mut params, "limit", "50".to_string());

        assert_eq!(
            params,
            vec![
                ("limit".to_string(), "50".to_string()),
                ("q".to_string(), "rock".to_string())
            ]
        );
    }
}
