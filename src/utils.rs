use std::fmt;

/// Maximum number of items the API returns for a single request.
pub const MAX_PER_REQUEST: u32 = 100;

/// Extra query parameters the `search` and `recommendations` endpoints are
/// known to accept, as `(name, expected type, description)`.
pub const SUPPORTED_EXTRA_PARAMS: &[(&str, &str, &str)] = &[
    ("seed_tracks", "str|list", "Seed track ids or URIs, comma separated"),
    ("seed_artists", "str|list", "Seed artist ids or URIs, comma separated"),
    ("seed_genres", "str|list", "Seed genres, comma separated (e.g. rock,pop)"),
    ("limit", "int", "Results per page (max. 100)"),
    ("target_acousticness", "int 0-100", "Target acousticness"),
    ("target_danceability", "int 0-100", "Target danceability"),
    ("target_energy", "int 0-100", "Target energy"),
    ("target_instrumentalness", "int 0-100", "Target instrumentalness"),
    ("target_liveness", "int 0-100", "Target liveness"),
    ("target_popularity", "int 0-100", "Target popularity"),
    ("target_valence", "int 0-100", "Target valence"),
    ("min_tempo", "int", "Minimum tempo in BPM (e.g. 80)"),
    ("max_tempo", "int", "Maximum tempo in BPM (e.g. 180)"),
    ("min_duration_ms", "int", "Minimum duration in ms (e.g. 60000)"),
    ("max_duration_ms", "int", "Maximum duration in ms (e.g. 300000)"),
];

const MAX_FILENAME_LEN: usize = 200;

/// Reduces a Spotify URI, open.spotify.com URL or bare id to the bare id.
///
/// ```text
/// spotify:track:6r7FXNO57mlZCBY6PXcZZT                     -> 6r7FXNO57mlZCBY6PXcZZT
/// https://open.spotify.com/track/6r7FXNO57mlZCBY6PXcZZT?si=x -> 6r7FXNO57mlZCBY6PXcZZT
/// 6r7FXNO57mlZCBY6PXcZZT                                   -> 6r7FXNO57mlZCBY6PXcZZT
/// ```
pub fn extract_spotify_id(value: &str) -> String {
    let v = value.trim();
    if v.is_empty() {
        return String::new();
    }

    if v.starts_with("spotify:") {
        return v.rsplit(':').next().unwrap_or(v).to_string();
    }

    let without_query = v.split('?').next().unwrap_or(v);

    if v.contains("open.spotify.com") {
        let path = without_query.trim_end_matches('/');
        return path.rsplit('/').next().unwrap_or(path).to_string();
    }

    without_query.to_string()
}

/// Returns the track id when the input is clearly a track reference rather
/// than a free-text query: a track URL, a `spotify:track:` URI or a bare
/// 22-character base62 id.
pub fn track_id_from_query(query: &str) -> Option<String> {
    let q = query.trim();

    if q.contains("open.spotify.com") && q.contains("/track/") {
        let id = extract_spotify_id(q);
        return (!id.is_empty()).then_some(id);
    }

    if let Some(id) = q.strip_prefix("spotify:track:") {
        return (!id.is_empty()).then(|| id.to_string());
    }

    if q.len() == 22 && q.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Some(q.to_string());
    }

    None
}

/// Makes a string safe to use as a file or folder name.
pub fn sanitize_filename(value: &str) -> String {
    let replaced: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '"' | '*' | '?' | '<' | '>' | '|' | '\n' | '\r' => '_',
            other => other,
        })
        .collect();

    if replaced.chars().count() > MAX_FILENAME_LEN {
        replaced
            .chars()
            .take(MAX_FILENAME_LEN)
            .collect::<String>()
            .trim_end()
            .to_string()
    } else {
        replaced
    }
}

/// A `key=value` pair passed through unchanged to the upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraParam {
    pub key: String,
    pub value: String,
}

impl fmt::Display for ExtraParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// clap value parser for `--param key=value`.
pub fn parse_extra_param(s: &str) -> Result<ExtraParam, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", s))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {:?}", s));
    }

    Ok(ExtraParam {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}

/// Joins ids into the comma separated form the API expects, normalising each
/// one and dropping empties.
pub fn join_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter()
        .flat_map(|id| id.as_ref().split(','))
        .map(extract_spotify_id)
        .filter(|id| !id.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn is_supported_param(key: &str) -> bool {
    SUPPORTED_EXTRA_PARAMS.iter().any(|(name, _, _)| *name == key)
}
