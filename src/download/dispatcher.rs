use std::{collections::BTreeMap, future::Future, sync::Arc};

use indicatif::ProgressBar;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::{
    chosic::ChosicService,
    download::{AssetDownloader, AssetSpec, DownloadOutcome},
    error::DownloadError,
    utils::extract_spotify_id,
};

/// One result per track id, in key order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub results: BTreeMap<String, Result<DownloadOutcome, DownloadError>>,
}

impl DispatchReport {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Tracks with at least one file on disk.
    pub fn succeeded(&self) -> usize {
        self.results
            .values()
            .filter(|r| matches!(r, Ok(outcome) if outcome.is_success()))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn get(&self, track_id: &str) -> Option<&Result<DownloadOutcome, DownloadError>> {
        self.results.get(track_id)
    }
}

/// Runs per-track jobs on spawned tasks, at most `concurrency` at a time.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
    progress: Option<ProgressBar>,
}

impl Dispatcher {
    /// A concurrency of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            progress: None,
        }
    }

    /// Ticks `bar` once per finished job, including jobs that panicked.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Runs `work` for every `(track_id, input)` pair and waits for all of
    /// them before returning.
    ///
    /// A job that panics or is cancelled is recorded as
    /// [`DownloadError::Worker`] under its key; the other jobs keep running.
    ///
    /// Keys are expected to be unique. With duplicates, only the last job's
    /// result is kept in the report, and since both jobs write the same
    /// folder the files on disk are undefined.
    pub async fn run<I, F, Fut>(&self, jobs: Vec<(String, I)>, work: F) -> DispatchReport
    where
        I: Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<DownloadOutcome, DownloadError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(jobs.len());

        debug!(jobs = jobs.len(), concurrency = self.concurrency, "dispatching");

        for (track_id, input) in jobs {
            let job = work(input);
            let semaphore = Arc::clone(&semaphore);
            let progress = self.progress.clone();
            let key = track_id.clone();

            let handle = tokio::spawn(async move {
                // ticks on every exit path, panics included
                let _tick = ProgressTick(progress);
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return Err(DownloadError::Worker {
                            track_id: key,
                            reason: e.to_string(),
                        });
                    }
                };

                job.await
            });

            handles.push((track_id, handle));
        }

        let mut report = DispatchReport::default();
        for (track_id, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let reason = if e.is_panic() {
                        "worker panicked".to_string()
                    } else {
                        e.to_string()
                    };
                    error!(%track_id, %reason, "download worker died");
                    Err(DownloadError::Worker {
                        track_id: track_id.clone(),
                        reason,
                    })
                }
            };
            report.results.insert(track_id, result);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "dispatch finished"
        );
        report
    }

    pub async fn download_many(
        &self,
        downloader: &AssetDownloader,
        specs: Vec<AssetSpec>,
    ) -> DispatchReport {
        let jobs = specs
            .into_iter()
            .map(|spec| (spec.track_id.clone(), spec))
            .collect();

        self.run(jobs, |spec| {
            let downloader = downloader.clone();
            async move { downloader.download_assets(&spec).await }
        })
        .await
    }

    /// Looks each id up inside its worker, then downloads whatever came back.
    /// An id the API has no data for ends up as a no-result outcome.
    pub async fn download_tracks(
        &self,
        service: &ChosicService,
        downloader: &AssetDownloader,
        ids: Vec<String>,
    ) -> DispatchReport {
        let jobs = ids
            .into_iter()
            .map(|id| extract_spotify_id(&id))
            .filter(|id| !id.is_empty())
            .map(|id| (id.clone(), id))
            .collect();

        self.run(jobs, |id| {
            let service = service.clone();
            let downloader = downloader.clone();
            async move {
                match service.get_track(&id).await {
                    Ok(Some(track)) => {
                        downloader
                            .download_assets(&AssetSpec::from_track(&track))
                            .await
                    }
                    Ok(None) => Ok(DownloadOutcome::no_result(id)),
                    Err(e) => Err(DownloadError::from(e)),
                }
            }
        })
        .await
    }
}

struct ProgressTick(Option<ProgressBar>);

impl Drop for ProgressTick {
    fn drop(&mut self) {
        if let Some(bar) = &self.0 {
            bar.inc(1);
        }
    }
}

pub async fn download_many(
    downloader: &AssetDownloader,
    specs: Vec<AssetSpec>,
    concurrency: usize,
) -> DispatchReport {
    Dispatcher::new(concurrency)
        .download_many(downloader, specs)
        .await
}

pub async fn download_tracks(
    service: &ChosicService,
    downloader: &AssetDownloader,
    ids: Vec<String>,
    concurrency: usize,
) -> DispatchReport {
    Dispatcher::new(concurrency)
        .download_tracks(service, downloader, ids)
        .await
}
