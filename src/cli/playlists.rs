use crate::{
    chosic::ChosicService,
    cli::{OutputSettings, emit, spinner},
    error, success,
    utils::ExtraParam,
};

/// Writes the top playlists for an artist or a genre as JSON.
///
/// One of `artist_id` or `genre_name` must be given.
///
/// # Example
///
/// ```rust,ignore
/// // chosicli top-playlists --genre-name techno --limit 5
/// top_playlists(&service, None, Some("techno".into()), Some(5), &[], &output).await;
/// ```
pub async fn top_playlists(
    service: &ChosicService,
    artist_id: Option<String>,
    genre_name: Option<String>,
    limit: Option<u32>,
    extra: &[ExtraParam],
    output: &OutputSettings,
) {
    if artist_id.is_none() && genre_name.is_none() {
        error!("Provide --artist-id or --genre-name");
    }

    let pb = spinner("Fetching top playlists...");
    let result = service
        .top_playlists(artist_id.as_deref(), genre_name.as_deref(), limit, extra)
        .await;
    pb.finish_and_clear();

    match result {
        Ok(playlists) => {
            success!("Found {} playlists", playlists.len());
            emit(&playlists, output).await;
        }
        Err(e) => error!("Cannot fetch top playlists. Err: {}", e),
    }
}
