use crate::{
    chosic::ChosicService,
    cli::{DownloadSettings, download_bar, finish_downloads},
    download::Dispatcher,
    error, info,
};

/// Downloads preview and cover art for each track id. Ids are resolved
/// through the track lookup inside the workers.
pub async fn download(service: &ChosicService, ids: Vec<String>, settings: &DownloadSettings) {
    if ids.is_empty() {
        error!("No track ids given");
    }

    info!(
        "Downloading {} tracks to {} (concurrency {})",
        ids.len(),
        settings.out.display(),
        settings.concurrency
    );

    let downloader = settings.downloader(service);
    let pb = download_bar(ids.len() as u64);
    let report = Dispatcher::new(settings.concurrency)
        .with_progress(pb.clone())
        .download_tracks(service, &downloader, ids)
        .await;
    pb.finish_and_clear();

    finish_downloads(&report);
}
