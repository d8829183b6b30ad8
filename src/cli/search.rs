use tabled::Table;

use crate::{
    chosic::{ChosicService, Paging, SearchKind, SearchQuery},
    cli::{DownloadSettings, OutputSettings, emit, finish_downloads, run_download_specs, spinner},
    download::AssetSpec,
    error, info,
    types::{ArtistTableRow, SearchResult, TrackTableRow},
    utils::track_id_from_query,
    warning,
};

/// Searches tracks or artists. A query that is itself a track link, URI or
/// id is looked up directly instead.
///
/// With `download`, the preview and cover art of every track in the result
/// are downloaded afterwards.
pub async fn search(
    service: &ChosicService,
    query: SearchQuery,
    paging: Paging,
    output: &OutputSettings,
    download: Option<DownloadSettings>,
) {
    let direct = match query.kind {
        SearchKind::Track => track_id_from_query(&query.q),
        SearchKind::Artist => None,
    };

    let result = match direct {
        Some(id) => lookup_track(service, &id).await,
        None => run_search(service, &query, &paging).await,
    };

    info!(
        "Found {} tracks, {} artists",
        result.tracks.len(),
        result.artists.len()
    );

    if output.table {
        if !result.tracks.is_empty() {
            let rows: Vec<TrackTableRow> = result.tracks.iter().map(TrackTableRow::from).collect();
            println!("{}", Table::new(rows));
        }
        if !result.artists.is_empty() {
            let rows: Vec<ArtistTableRow> =
                result.artists.iter().map(ArtistTableRow::from).collect();
            println!("{}", Table::new(rows));
        }
    } else {
        emit(&result, output).await;
    }

    let Some(settings) = download else {
        return;
    };

    let specs: Vec<AssetSpec> = result
        .tracks
        .iter()
        .filter(|t| !t.id.is_empty())
        .map(AssetSpec::from_track)
        .collect();

    if specs.is_empty() {
        warning!("No tracks to download.");
        return;
    }

    info!(
        "Downloading {} tracks to {} (concurrency {})",
        specs.len(),
        settings.out.display(),
        settings.concurrency
    );
    let report = run_download_specs(service, &settings, specs).await;
    finish_downloads(&report);
}

async fn lookup_track(service: &ChosicService, id: &str) -> SearchResult {
    let pb = spinner(format!("Looking up track {}...", id));
    let track = service.get_track(id).await;
    pb.finish_and_clear();

    match track {
        Ok(Some(track)) => SearchResult {
            tracks: vec![track],
            artists: Vec::new(),
        },
        Ok(None) => {
            warning!("No track data for {}", id);
            SearchResult::default()
        }
        Err(e) => error!("Track lookup failed. Err: {}", e),
    }
}

async fn run_search(service: &ChosicService, query: &SearchQuery, paging: &Paging) -> SearchResult {
    let pb = spinner(format!("Searching {}s for \"{}\"...", query.kind.as_str(), query.q));
    let result = service.search(query, paging).await;
    pb.finish_and_clear();

    match result {
        Ok(aggregated) => {
            if paging.fetch_all {
                info!(
                    "Fetched {} results in {} pages",
                    aggregated.items.len(),
                    aggregated.pages
                );
            }
            SearchResult::from(aggregated.items)
        }
        Err(e) => {
            if !e.collected.is_empty() {
                warning!("Discarding {} results fetched before the failure", e.collected.len());
            }
            error!("Search failed at offset {}. Err: {}", e.offset, e.source)
        }
    }
}
