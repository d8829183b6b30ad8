use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::{
    chosic::HttpClient,
    download::{AssetFailure, AssetKind, AssetSpec, DownloadOutcome, ImageVariant, SavedAsset},
    error::DownloadError,
    utils::sanitize_filename,
};

/// Content types we know how to store, and the extension each one gets.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &str)] = &[
    ("audio/mpeg", "mp3"),
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
];

/// Maps a `Content-Type` header value to a file extension, ignoring
/// parameters such as `; charset=...`.
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(m, _)| *m == mime)
        .map(|(_, ext)| *ext)
}

fn name_or_unknown(value: &str) -> String {
    let sanitized = sanitize_filename(value);
    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}

fn audio_stem(spec: &AssetSpec) -> String {
    format!(
        "{} - {}",
        name_or_unknown(&spec.track_name),
        name_or_unknown(&spec.artist_name)
    )
}

/// `<track_name> - <artist_name> (<track_id>)`, sanitised.
pub fn track_folder_name(spec: &AssetSpec) -> String {
    let id = sanitize_filename(&spec.track_id);
    if id.is_empty() {
        audio_stem(spec)
    } else {
        format!("{} ({})", audio_stem(spec), id)
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub out_root: PathBuf,
    pub overwrite: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            out_root: PathBuf::from("downloads"),
            overwrite: false,
        }
    }
}

struct PlannedAsset {
    kind: AssetKind,
    stem: String,
    url: String,
}

/// Downloads the cover images and preview of a single track into its folder.
#[derive(Debug, Clone)]
pub struct AssetDownloader {
    client: HttpClient,
    options: DownloadOptions,
}

impl AssetDownloader {
    pub fn new(client: HttpClient, options: DownloadOptions) -> Self {
        Self { client, options }
    }

    pub fn options(&self) -> &DownloadOptions {
        &self.options
    }

    pub fn track_dir(&self, spec: &AssetSpec) -> PathBuf {
        self.options.out_root.join(track_folder_name(spec))
    }

    /// Downloads `image_default`, `image_large` and the preview, in that
    /// order, skipping any the `AssetSpec` has no url for.
    ///
    /// Per-file problems (HTTP errors, unknown content types) are collected
    /// in the outcome and do not stop the remaining files. Filesystem errors
    /// abort this track and are returned as `Err`.
    ///
    /// A folder that does not exist yet is built under a hidden staging name
    /// and renamed into place once at least one file is in it, so readers
    /// never see a half-populated or empty folder.
    pub async fn download_assets(&self, spec: &AssetSpec) -> Result<DownloadOutcome, DownloadError> {
        let plan = plan_assets(spec);
        if plan.is_empty() {
            info!(track_id = %spec.track_id, "nothing to download");
            return Ok(DownloadOutcome::no_result(&spec.track_id));
        }

        let out_root = &self.options.out_root;
        async_fs::create_dir_all(out_root)
            .await
            .map_err(|e| DownloadError::io(out_root, e))?;

        let folder = track_folder_name(spec);
        let final_dir = out_root.join(&folder);
        let staging = if is_dir(&final_dir).await {
            None
        } else {
            let staging = out_root.join(staging_name(&folder));
            async_fs::create_dir(&staging)
                .await
                .map_err(|e| DownloadError::io(&staging, e))?;
            debug!(path = %staging.display(), "staging folder created");
            Some(staging)
        };
        let work_dir = staging.as_deref().unwrap_or(&final_dir);

        let mut outcome = DownloadOutcome {
            track_id: spec.track_id.clone(),
            dir: Some(final_dir.clone()),
            files: Vec::new(),
            failures: Vec::new(),
        };

        if let Err(e) = self.fetch_into(work_dir, &final_dir, plan, &mut outcome).await {
            if let Some(staging) = &staging {
                remove_staging(staging).await;
            }
            return Err(e);
        }

        if let Some(staging) = &staging {
            if outcome.files.is_empty() {
                remove_staging(staging).await;
                outcome.dir = None;
            } else if let Err(e) = async_fs::rename(staging, &final_dir).await {
                remove_staging(staging).await;
                return Err(DownloadError::io(&final_dir, e));
            }
        }

        info!(
            track_id = %spec.track_id,
            files = outcome.files.len(),
            failures = outcome.failures.len(),
            "download finished for {}",
            folder
        );
        Ok(outcome)
    }

    async fn fetch_into(
        &self,
        work_dir: &Path,
        final_dir: &Path,
        plan: Vec<PlannedAsset>,
        outcome: &mut DownloadOutcome,
    ) -> Result<(), DownloadError> {
        for asset in plan {
            if !self.options.overwrite {
                if let Some((file_name, size)) = find_existing(work_dir, &asset.stem).await {
                    info!(kind = %asset.kind, file = %file_name, "already present, skipping");
                    outcome.files.push(SavedAsset {
                        kind: asset.kind,
                        path: final_dir.join(file_name),
                        size,
                        already_present: true,
                    });
                    continue;
                }
            }

            let response = match self.client.fetch_asset(&asset.url).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(kind = %asset.kind, error = %e, "download failed");
                    outcome.failures.push(AssetFailure {
                        kind: asset.kind,
                        url: asset.url,
                        error: e.into(),
                    });
                    continue;
                }
            };

            let extension = match response.content_type.as_deref() {
                None => Err(DownloadError::MissingContentType {
                    url: asset.url.clone(),
                }),
                Some(ct) => extension_for_content_type(ct).ok_or_else(|| {
                    DownloadError::UnsupportedContentType {
                        url: asset.url.clone(),
                        content_type: ct.to_string(),
                    }
                }),
            };
            let extension = match extension {
                Ok(ext) => ext,
                Err(e) => {
                    warn!(kind = %asset.kind, error = %e, "cannot store asset");
                    outcome.failures.push(AssetFailure {
                        kind: asset.kind,
                        url: asset.url,
                        error: e,
                    });
                    continue;
                }
            };

            let file_name = format!("{}.{}", asset.stem, extension);
            let partial = work_dir.join(format!(".{}.{}.part", asset.kind, extension));
            let target = work_dir.join(&file_name);

            async_fs::write(&partial, &response.bytes)
                .await
                .map_err(|e| DownloadError::io(&partial, e))?;
            async_fs::rename(&partial, &target)
                .await
                .map_err(|e| DownloadError::io(&target, e))?;

            info!(kind = %asset.kind, file = %file_name, size = response.bytes.len(), "saved");
            outcome.files.push(SavedAsset {
                kind: asset.kind,
                path: final_dir.join(file_name),
                size: response.bytes.len() as u64,
                already_present: false,
            });
        }

        Ok(())
    }
}

/// Hidden working name for a track folder: `.partial-<random>-<digest>`.
///
/// Fixed length, so a final name close to the filesystem's limit still gets
/// a usable staging folder.
fn staging_name(folder: &str) -> String {
    let digest = Sha256::digest(folder.as_bytes());
    let short: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    format!(".partial-{:08x}-{}", rand::random::<u32>(), short)
}

fn plan_assets(spec: &AssetSpec) -> Vec<PlannedAsset> {
    let mut plan = Vec::with_capacity(3);

    for variant in [ImageVariant::Default, ImageVariant::Large] {
        if let Some(url) = spec.image(variant) {
            plan.push(PlannedAsset {
                kind: AssetKind::Image(variant),
                stem: variant.file_stem().to_string(),
                url: url.to_string(),
            });
        }
    }

    match spec.preview_url.as_deref().filter(|u| !u.is_empty()) {
        Some(url) => plan.push(PlannedAsset {
            kind: AssetKind::Preview,
            stem: audio_stem(spec),
            url: url.to_string(),
        }),
        None => debug!(track_id = %spec.track_id, "no preview available"),
    }

    plan
}

/// Finds `<stem>.<ext>` for any extension we would have written.
async fn find_existing(dir: &Path, stem: &str) -> Option<(String, u64)> {
    for (_, ext) in CONTENT_TYPE_EXTENSIONS {
        let file_name = format!("{}.{}", stem, ext);
        if let Ok(meta) = async_fs::metadata(dir.join(&file_name)).await {
            if meta.is_file() {
                return Some((file_name, meta.len()));
            }
        }
    }
    None
}

async fn is_dir(path: &Path) -> bool {
    async_fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

async fn remove_staging(path: &Path) {
    if let Err(e) = async_fs::remove_dir_all(path).await {
        warn!(path = %path.display(), error = %e, "cannot remove staging folder");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, artist: &str, id: &str) -> AssetSpec {
        AssetSpec {
            track_id: id.to_string(),
            track_name: name.to_string(),
            artist_name: artist.to_string(),
            preview_url: None,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for_content_type("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for_content_type("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for_content_type("image/png"), Some("png"));
        assert_eq!(extension_for_content_type("Image/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(extension_for_content_type("text/html"), None);
        assert_eq!(extension_for_content_type("image/webp"), None);
    }

    #[test]
    fn test_track_folder_name() {
        assert_eq!(
            track_folder_name(&spec("Mr. Brightside", "The Killers", "3n3Ppam7vgaVa1iaRUc9Lp")),
            "Mr. Brightside - The Killers (3n3Ppam7vgaVa1iaRUc9Lp)"
        );
        assert_eq!(
            track_folder_name(&spec("AC/DC: Live?", "", "x1")),
            "AC_DC_ Live_ - unknown (x1)"
        );
        assert_eq!(track_folder_name(&spec("Song", "Band", "")), "Song - Band");
    }

    #[test]
    fn test_staging_name_has_fixed_length() {
        let short = staging_name("Song - Band (id1)");
        let long = staging_name(&"x".repeat(250));

        assert!(short.starts_with(".partial-"));
        assert_eq!(short.len(), long.len());
        assert_eq!(long.len(), ".partial-".len() + 8 + 1 + 16);
    }

    #[test]
    fn test_plan_assets_order_and_preview_skip() {
        let mut s = spec("Song", "Band", "id1");
        s.images = vec![
            (ImageVariant::Large, "http://x/large".to_string()),
            (ImageVariant::Default, "http://x/default".to_string()),
        ];

        let plan = plan_assets(&s);
        let kinds: Vec<AssetKind> = plan.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AssetKind::Image(ImageVariant::Default),
                AssetKind::Image(ImageVariant::Large)
            ]
        );

        s.preview_url = Some("http://x/preview".to_string());
        let plan = plan_assets(&s);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2].kind, AssetKind::Preview);
        assert_eq!(plan[2].stem, "Song - Band");
    }
}
