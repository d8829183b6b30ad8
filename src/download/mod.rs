//! Preview and cover-art downloads.
//!
//! Every track gets its own folder under the output root:
//!
//! ```text
//! <out_root>/<track_name> - <artist_name> (<track_id>)/
//!     image_default.<ext>
//!     image_large.<ext>
//!     <track_name> - <artist_name>.mp3
//! ```
//!
//! Downstream tooling depends on these names, so they must not change.
//!
//! [`AssetDownloader`] handles a single track and never lets one bad file
//! fail the others. [`Dispatcher`] fans a batch of tracks out over a bounded
//! number of workers and collects exactly one result per track.

mod assets;
mod dispatcher;

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::Serialize;

pub use assets::{AssetDownloader, DownloadOptions, extension_for_content_type, track_folder_name};
pub use dispatcher::{DispatchReport, Dispatcher, download_many, download_tracks};

use crate::{error::DownloadError, types::Track};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageVariant {
    Default,
    Large,
}

impl ImageVariant {
    pub fn file_stem(&self) -> &'static str {
        match self {
            ImageVariant::Default => "image_default",
            ImageVariant::Large => "image_large",
        }
    }
}

/// What kind of file an asset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image(ImageVariant),
    Preview,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Image(v) => f.write_str(v.file_stem()),
            AssetKind::Preview => f.write_str("preview"),
        }
    }
}

/// Everything needed to download the assets of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSpec {
    pub track_id: String,
    pub track_name: String,
    pub artist_name: String,
    pub preview_url: Option<String>,
    pub images: Vec<(ImageVariant, String)>,
}

impl AssetSpec {
    pub fn from_track(track: &Track) -> Self {
        let mut images = Vec::new();
        if let Some(url) = track.image_default() {
            images.push((ImageVariant::Default, url.to_string()));
        }
        if let Some(url) = track.image_large() {
            images.push((ImageVariant::Large, url.to_string()));
        }

        Self {
            track_id: track.id.clone(),
            track_name: track.name.clone(),
            artist_name: track.first_artist().unwrap_or_default().to_string(),
            preview_url: track.preview_url.clone(),
            images,
        }
    }

    pub fn image(&self, variant: ImageVariant) -> Option<&str> {
        self.images
            .iter()
            .find(|(v, _)| *v == variant)
            .map(|(_, url)| url.as_str())
    }
}

/// A file present in the track folder after a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedAsset {
    pub kind: AssetKind,
    pub path: PathBuf,
    pub size: u64,
    /// The file existed before this run and was left untouched.
    pub already_present: bool,
}

/// A single file that could not be downloaded.
#[derive(Debug)]
pub struct AssetFailure {
    pub kind: AssetKind,
    pub url: String,
    pub error: DownloadError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Every available asset is on disk.
    Complete,
    /// Some assets are on disk, others failed.
    Partial,
    /// Nothing is on disk for this track.
    NoResult,
}

/// Result of downloading one track's assets.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub track_id: String,
    pub dir: Option<PathBuf>,
    pub files: Vec<SavedAsset>,
    pub failures: Vec<AssetFailure>,
}

impl DownloadOutcome {
    /// Outcome for a track the API returned no data for.
    pub fn no_result(track_id: impl Into<String>) -> Self {
        Self {
            track_id: track_id.into(),
            dir: None,
            files: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        if self.files.is_empty() {
            OutcomeStatus::NoResult
        } else if self.failures.is_empty() {
            OutcomeStatus::Complete
        } else {
            OutcomeStatus::Partial
        }
    }

    /// A track counts as failed only when nothing ended up on disk.
    pub fn is_success(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn written(&self) -> impl Iterator<Item = &SavedAsset> {
        self.files.iter().filter(|f| !f.already_present)
    }

    pub fn file(&self, kind: AssetKind) -> Option<&Path> {
        self.files
            .iter()
            .find(|f| f.kind == kind)
            .map(|f| f.path.as_path())
    }
}
