use std::time::Duration;

use reqwest::{
    Client, Response,
    header::{self, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://www.chosic.com/api/tools";
pub const GENRES_URL: &str = "https://www.chosic.com/data/all_genres.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const REFERER: &str = "https://www.chosic.com/playlist-generator/";
const ASSET_REFERER: &str = "https://www.chosic.com";
const ERROR_BODY_LIMIT: usize = 500;

/// Endpoints that are only served when the request carries `app: new_releases`.
const NEW_RELEASES_ENDPOINTS: &[&str] = &["genre-releases", "top-playlists"];

/// Session values the API expects from a logged-in browser.
///
/// These are supplied by the caller; the client never reads the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub cookie: Option<String>,
    pub nonce: Option<String>,
    pub app: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub credentials: Credentials,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: Credentials::default(),
        }
    }
}

/// Decoded JSON body together with the response headers, which carry the
/// pagination totals.
#[derive(Debug, Clone)]
pub struct JsonResponse {
    pub body: Value,
    pub headers: HeaderMap,
}

impl JsonResponse {
    /// Total number of results reported by the server, from `X-WP-Total` or,
    /// failing that, `X-WP-TotalPages` multiplied by the page size.
    pub fn total_items(&self, page_size: usize) -> Option<usize> {
        let read = |name: &str| {
            self.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
        };

        read("x-wp-total").or_else(|| read("x-wp-totalpages").map(|pages| pages * page_size))
    }
}

/// Raw payload of a downloaded asset.
#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub url: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Thin wrapper around a shared `reqwest::Client` with the headers and
/// timeout the Chosic endpoints expect. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let headers = default_headers(&config);
        let base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::from_reqwest(&base_url, e))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// GET an API endpoint relative to the base url.
    pub async fn get_json(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<JsonResponse, ApiError> {
        let url = self.endpoint_url(endpoint);
        debug!(%url, ?params, "GET");

        let mut request = self.client.get(&url).query(params);
        if requires_new_releases_app(endpoint) {
            request = request.header("app", "new_releases");
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&url, e))?;

        read_json(&url, response).await
    }

    /// GET a JSON document outside the API base, e.g. the static genre list.
    pub async fn get_absolute_json(&self, url: &str) -> Result<JsonResponse, ApiError> {
        reqwest::Url::parse(url).map_err(|_| ApiError::InvalidUrl(url.to_string()))?;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .header(header::REFERER, "https://www.chosic.com/music-genre-finder/")
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        read_json(url, response).await
    }

    /// Downloads a preview or an image.
    pub async fn fetch_asset(&self, url: &str) -> Result<AssetResponse, ApiError> {
        reqwest::Url::parse(url).map_err(|_| ApiError::InvalidUrl(url.to_string()))?;
        debug!(%url, "downloading asset");

        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "*/*")
            .header(header::REFERER, ASSET_REFERER)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        let response = check_status(url, response).await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(url, e))?;

        debug!(%url, ?content_type, size = bytes.len(), "asset received");

        Ok(AssetResponse {
            url: url.to_string(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    /// Checks that the API accepts this session. Never fails; a rejected or
    /// unreachable handshake yields `false`.
    pub async fn handshake(&self) -> bool {
        let url = self.endpoint_url("handshake/");
        match self.client.post(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("handshake ok");
                true
            }
            Ok(response) => {
                debug!(status = %response.status(), "handshake rejected");
                false
            }
            Err(e) => {
                debug!(error = %e, "handshake failed");
                false
            }
        }
    }
}

/// Turns a raw `k=v; k2=v2` cookie string into a normalised `Cookie` header
/// value, skipping segments without a `=`.
pub fn cookie_header(raw: &str) -> Option<String> {
    let pairs: Vec<String> = raw
        .split(';')
        .map(str::trim)
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

fn requires_new_releases_app(endpoint: &str) -> bool {
    let endpoint = endpoint.to_lowercase();
    NEW_RELEASES_ENDPOINTS.iter().any(|ep| endpoint.contains(ep))
}

fn default_headers(config: &ClientConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("es-ES,es;q=0.9,en;q=0.8"),
    );
    headers.insert(header::ORIGIN, HeaderValue::from_static("https://www.chosic.com"));
    headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );

    let credentials = &config.credentials;

    if let Some(cookie) = credentials.cookie.as_deref().and_then(cookie_header) {
        insert_header(&mut headers, header::COOKIE, &cookie);
    }
    if let Some(nonce) = credentials.nonce.as_deref().filter(|n| !n.is_empty()) {
        insert_header(&mut headers, HeaderName::from_static("x-wp-nonce"), nonce);
    }
    if let Some(app) = credentials.app.as_deref().filter(|a| !a.is_empty()) {
        insert_header(&mut headers, HeaderName::from_static("app"), app);
    }

    headers
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(v) => {
            headers.insert(name, v);
        }
        Err(_) => warn!(header = %name, "ignoring credential with invalid characters"),
    }
}

async fn check_status(url: &str, response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    warn!(%url, %status, "request failed");
    Err(ApiError::Status {
        url: url.to_string(),
        status,
        body,
    })
}

async fn read_json(url: &str, response: Response) -> Result<JsonResponse, ApiError> {
    let response = check_status(url, response).await?;
    let headers = response.headers().clone();

    let text = response
        .text()
        .await
        .map_err(|e| ApiError::from_reqwest(url, e))?;

    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })?
    };

    Ok(JsonResponse { body, headers })
}
