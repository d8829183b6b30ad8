//! # Chosic API
//!
//! Access to the JSON endpoints behind the Chosic web tools (track lookup,
//! search, recommendations, audio features, genre releases, top playlists)
//! and to the static genre list.
//!
//! ```text
//! ChosicService   one method per endpoint, result mapping
//!       ↓
//! Paginator       offset paging + pause between pages
//!       ↓
//! HttpClient      shared reqwest client, headers, timeouts, typed errors
//! ```
//!
//! The upstream expects requests that look like they come from its own web
//! pages, so [`HttpClient`] always sends the browser-style headers and, when
//! supplied, the session cookie and nonce in [`Credentials`]. Nothing in this
//! module reads the environment; see [`crate::config`] for that.
//!
//! Listing endpoints page by number. [`Paginator`] works with offsets and
//! [`PageRequest::page_number`] does the conversion.

pub mod client;
pub mod pagination;
pub mod service;

pub use client::{AssetResponse, ClientConfig, Credentials, HttpClient, JsonResponse};
pub use pagination::{AggregatedResult, Page, PageRequest, Paginator, RateLimiter};
pub use service::{ChosicService, Paging, RecommendationQuery, SearchKind, SearchQuery};
