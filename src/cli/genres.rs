use std::path::PathBuf;

use serde_json::Value;

use crate::{
    chosic::ChosicService,
    cli::{OutputSettings, emit, spinner},
    error, success,
};

/// Downloads the complete genre list. With `save_path` the JSON goes to that
/// file, otherwise it follows `output`.
pub async fn genres(service: &ChosicService, save_path: Option<PathBuf>, output: &OutputSettings) {
    let pb = spinner("Downloading genre list...");
    let result = service.all_genres().await;
    pb.finish_and_clear();

    let genres = match result {
        Ok(genres) => genres,
        Err(e) => error!("Cannot download genres. Err: {}", e),
    };

    let count = match &genres {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        _ => 0,
    };
    success!("Downloaded {} genres", count);

    let settings = OutputSettings {
        output: save_path.or_else(|| output.output.clone()),
        table: false,
    };
    emit(&genres, &settings).await;
}
