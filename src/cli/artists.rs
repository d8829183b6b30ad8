use tabled::Table;

use crate::{
    chosic::ChosicService,
    cli::{OutputSettings, emit, spinner},
    error, success,
    types::ArtistTableRow,
};

/// Fetches artists by id.
///
/// With `--table` the artists are sorted by name and shown with their first
/// three genres; otherwise the full records are written as JSON.
///
/// # Arguments
///
/// * `service` - Service used for the lookup
/// * `ids` - Artist ids, URIs or links, sent in a single request
/// * `output` - JSON destination, or `table`
pub async fn artists(service: &ChosicService, ids: Vec<String>, output: &OutputSettings) {
    let pb = spinner(format!("Fetching {} artists...", ids.len()));
    let result = service.get_artists(&ids).await;
    pb.finish_and_clear();

    let mut artists = match result {
        Ok(artists) => artists,
        Err(e) => error!("Cannot fetch artists. Err: {}", e),
    };

    success!("Fetched {} artists!", artists.len());

    if output.table {
        artists.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let rows: Vec<ArtistTableRow> = artists.iter().map(ArtistTableRow::from).collect();
        println!("{}", Table::new(rows));
    } else {
        emit(&artists, output).await;
    }
}
