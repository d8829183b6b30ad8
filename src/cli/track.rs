use tabled::Table;

use crate::{
    chosic::ChosicService,
    cli::{OutputSettings, emit, spinner},
    error, success,
    types::{Track, TrackTableRow},
    warning,
};

/// Looks up one or more tracks and prints them as JSON or a table.
///
/// Ids are resolved one after the other behind a spinner. An id without data
/// is reported as a warning and skipped; a failed request ends the program.
///
/// # Arguments
///
/// * `service` - Service used for the lookups
/// * `ids` - Track ids, `spotify:track:` URIs or open.spotify.com links
/// * `output` - JSON destination, or `table` for a summary table
///
/// # Example
///
/// ```rust,ignore
/// // chosicli track 6r7FXNO57mlZCBY6PXcZZT spotify:track:3n3Ppam7vgaVa1iaRUc9Lp --table
/// track(&service, ids, &OutputSettings { output: None, table: true }).await;
/// ```
pub async fn track(service: &ChosicService, ids: Vec<String>, output: &OutputSettings) {
    let mut tracks: Vec<Track> = Vec::with_capacity(ids.len());

    let pb = spinner("Looking up tracks...");
    for id in &ids {
        pb.set_message(format!("Looking up track {}...", id));
        match service.get_track(id).await {
            Ok(Some(track)) => tracks.push(track),
            Ok(None) => {
                pb.suspend(|| warning!("No track data for {}", id));
            }
            Err(e) => {
                pb.finish_and_clear();
                error!("Cannot fetch track {}. Err: {}", id, e);
            }
        }
    }
    pb.finish_and_clear();

    success!("Resolved {} of {} tracks", tracks.len(), ids.len());

    if output.table {
        let rows: Vec<TrackTableRow> = tracks.iter().map(TrackTableRow::from).collect();
        println!("{}", Table::new(rows));
    } else {
        emit(&tracks, output).await;
    }
}
