use crate::{
    chosic::ChosicService,
    cli::{OutputSettings, emit, spinner},
    error, success,
    utils::ExtraParam,
};

/// Writes the new releases of a genre as JSON.
pub async fn genre_releases(
    service: &ChosicService,
    genre: &str,
    limit: Option<u32>,
    extra: &[ExtraParam],
    output: &OutputSettings,
) {
    let pb = spinner(format!("Fetching new releases for {}...", genre));
    let result = service.genre_releases(genre, limit, extra).await;
    pb.finish_and_clear();

    match result {
        Ok(releases) => {
            success!("Found {} releases for {}", releases.len(), genre);
            emit(&releases, output).await;
        }
        Err(e) => error!("Cannot fetch genre releases. Err: {}", e),
    }
}
