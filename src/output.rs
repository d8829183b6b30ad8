use std::path::Path;

use serde::Serialize;
use tracing::debug;

/// Pretty-prints `value` as JSON to stdout, or to `path` when given.
///
/// Non-ASCII text is written as-is. Parent directories of `path` are
/// created when missing.
pub async fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                async_fs::create_dir_all(parent).await?;
            }
            async_fs::write(path, format!("{}\n", json)).await?;
            debug!(path = %path.display(), bytes = json.len(), "JSON written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
