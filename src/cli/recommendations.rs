use tabled::Table;

use crate::{
    chosic::{ChosicService, Paging, RecommendationQuery},
    cli::{OutputSettings, emit, spinner},
    error, info, success,
    types::TrackTableRow,
    warning,
};

/// Prints tracks recommended for the given seeds.
///
/// At least one seed is required, either through `--seed-track` /
/// `--seed-artist` or a `seed_*` extra param. With `--fetch-all` the number
/// of pages fetched is reported. Tracks received before a failing page are
/// discarded with a warning.
///
/// # Arguments
///
/// * `service` - Service used for the requests
/// * `query` - Seeds and extra params
/// * `paging` - Limit, page size and whether to walk pages
/// * `output` - JSON destination, or `table`
pub async fn recommendations(
    service: &ChosicService,
    query: RecommendationQuery,
    paging: Paging,
    output: &OutputSettings,
) {
    let seeded_by_param = query
        .extra
        .iter()
        .any(|p| p.key.starts_with("seed_"));
    if query.seed_tracks.is_empty() && query.seed_artists.is_empty() && !seeded_by_param {
        error!("Provide at least one --seed-track or --seed-artist");
    }

    let pb = spinner("Fetching recommendations...");
    let result = service.recommendations(&query, &paging).await;
    pb.finish_and_clear();

    let aggregated = match result {
        Ok(aggregated) => aggregated,
        Err(e) => {
            if !e.collected.is_empty() {
                warning!("Discarding {} tracks fetched before the failure", e.collected.len());
            }
            error!("Cannot fetch recommendations at offset {}. Err: {}", e.offset, e.source)
        }
    };

    if paging.fetch_all {
        info!("Fetched {} pages", aggregated.pages);
    }
    success!("Got {} recommended tracks", aggregated.items.len());

    if output.table {
        let rows: Vec<TrackTableRow> = aggregated.items.iter().map(TrackTableRow::from).collect();
        println!("{}", Table::new(rows));
    } else {
        emit(&aggregated.items, output).await;
    }
}
