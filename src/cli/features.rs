use crate::{
    chosic::ChosicService,
    cli::{OutputSettings, emit, spinner},
    error, warning,
};

/// Prints the audio features of a single track as JSON.
///
/// An empty answer from the API only warns; a response that is not a
/// features object ends the program with an error.
pub async fn features(service: &ChosicService, id: &str, output: &OutputSettings) {
    let pb = spinner(format!("Fetching audio features for {}...", id));
    let result = service.audio_features(id).await;
    pb.finish_and_clear();

    match result {
        Ok(Some(features)) => emit(&features, output).await,
        Ok(None) => warning!("No audio features for {}", id),
        Err(e) => error!("Cannot fetch audio features. Err: {}", e),
    }
}
