//! # CLI Module
//!
//! User-facing commands of `chosicli`. Each command takes already-parsed
//! options from `main`, talks to the API through [`ChosicService`], and
//! reports back with the colored status macros, spinners and, where asked
//! for, tables or JSON.
//!
//! ## Commands
//!
//! - [`search`] - search tracks or artists, optionally downloading the hits
//! - [`track`] - look up one or more tracks
//! - [`artists`] - look up artists by id
//! - [`recommendations`] - tracks similar to seed tracks/artists
//! - [`features`] - audio features of a track
//! - [`genre_releases`] - new releases in a genre
//! - [`top_playlists`] - top playlists for an artist or genre
//! - [`genres`] - download the full genre list
//! - [`download`] - download preview and cover art for track ids
//! - [`params`] - list the extra query parameters the API understands
//!
//! ## Output
//!
//! Status lines go to stderr so that JSON on stdout can be piped. Errors
//! terminate the process with status 1 via [`error!`](crate::error!); a
//! download batch with any failed track does the same after printing its
//! summary.

use std::{borrow::Cow, path::PathBuf, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::{
    chosic::ChosicService,
    download::{AssetDownloader, DispatchReport, Dispatcher, DownloadOptions, OutcomeStatus},
    error, output, success, warning,
};

mod artists;
mod download;
mod features;
mod genres;
mod params;
mod playlists;
mod recommendations;
mod releases;
mod search;
mod track;

pub use artists::artists;
pub use download::download;
pub use features::features;
pub use genres::genres;
pub use params::params;
pub use playlists::top_playlists;
pub use recommendations::recommendations;
pub use releases::genre_releases;
pub use search::search;
pub use track::track;

/// Where results go and in which shape.
#[derive(Debug, Clone, Default)]
pub struct OutputSettings {
    /// Write JSON to this file instead of stdout.
    pub output: Option<PathBuf>,
    /// Print a table instead of JSON, for track and artist listings.
    pub table: bool,
}

/// Where downloads go, whether existing files are replaced and how many
/// tracks run in parallel.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub out: PathBuf,
    pub overwrite: bool,
    pub concurrency: usize,
}

impl DownloadSettings {
    pub fn downloader(&self, service: &ChosicService) -> AssetDownloader {
        AssetDownloader::new(
            service.client().clone(),
            DownloadOptions {
                out_root: self.out.clone(),
                overwrite: self.overwrite,
            },
        )
    }
}

pub(crate) fn spinner(message: impl Into<Cow<'static, str>>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    pb
}

pub(crate) fn download_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} tracks")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Writes `value` as JSON according to `settings`.
pub(crate) async fn emit<T: Serialize + ?Sized>(value: &T, settings: &OutputSettings) {
    if let Err(e) = output::write_json(value, settings.output.as_deref()).await {
        error!("Cannot write output. Err: {}", e);
    }
    if let Some(path) = &settings.output {
        success!("Saved to {}", path.display());
    }
}

/// Downloads already-resolved tracks.
pub(crate) async fn run_download_specs(
    service: &ChosicService,
    settings: &DownloadSettings,
    specs: Vec<crate::download::AssetSpec>,
) -> DispatchReport {
    let downloader = settings.downloader(service);
    let pb = download_bar(specs.len() as u64);
    let report = Dispatcher::new(settings.concurrency)
        .with_progress(pb.clone())
        .download_many(&downloader, specs)
        .await;
    pb.finish_and_clear();
    report
}

/// Prints one line per track and the `N succeeded / M failed` summary.
/// Exits with status 1 when any track failed.
pub(crate) fn finish_downloads(report: &DispatchReport) {
    for (track_id, result) in &report.results {
        match result {
            Ok(outcome) => {
                let dir = outcome
                    .dir
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default();

                match outcome.status() {
                    OutcomeStatus::Complete => {
                        success!("{} -> {} ({} files)", track_id, dir, outcome.files.len())
                    }
                    OutcomeStatus::Partial => {
                        warning!(
                            "{} -> {} ({} files, {} failed)",
                            track_id,
                            dir,
                            outcome.files.len(),
                            outcome.failures.len()
                        );
                        for failure in &outcome.failures {
                            warning!("  {}: {}", failure.kind, failure.error);
                        }
                    }
                    OutcomeStatus::NoResult => {
                        warning!("{}: nothing downloaded", track_id);
                        for failure in &outcome.failures {
                            warning!("  {}: {}", failure.kind, failure.error);
                        }
                    }
                }
            }
            Err(e) => warning!("{}: {}", track_id, e),
        }
    }

    let (ok, failed) = (report.succeeded(), report.failed());
    if failed > 0 {
        error!("{} succeeded / {} failed", ok, failed);
    }
    success!("{} succeeded / {} failed", ok, failed);
}
