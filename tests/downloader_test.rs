use std::{
    collections::BTreeSet,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chosicli::{
    chosic::{ChosicService, ClientConfig, HttpClient},
    download::{
        AssetDownloader, AssetKind, AssetSpec, Dispatcher, DownloadOptions, DownloadOutcome,
        ImageVariant, OutcomeStatus, download_many, download_tracks,
    },
    error::DownloadError,
};
use indicatif::ProgressBar;
use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(ClientConfig {
        base_url: format!("{}/api/tools", server.uri()),
        ..ClientConfig::default()
    })
    .unwrap()
}

fn downloader(server: &MockServer, out: &Path, overwrite: bool) -> AssetDownloader {
    AssetDownloader::new(
        client_for(server),
        DownloadOptions {
            out_root: out.to_path_buf(),
            overwrite,
        },
    )
}

fn spec(server: &MockServer, id: &str, with_preview: bool) -> AssetSpec {
    AssetSpec {
        track_id: id.to_string(),
        track_name: "Song".to_string(),
        artist_name: "Band".to_string(),
        preview_url: with_preview.then(|| format!("{}/{}/preview", server.uri(), id)),
        images: vec![
            (ImageVariant::Default, format!("{}/{}/small", server.uri(), id)),
            (ImageVariant::Large, format!("{}/{}/large", server.uri(), id)),
        ],
    }
}

async fn mount_asset(server: &MockServer, url_path: &str, content_type: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", content_type)
                .set_body_bytes(body.to_vec()),
        )
        .mount(server)
        .await;
}

async fn mount_track_assets(server: &MockServer, id: &str) {
    mount_asset(server, &format!("/{}/small", id), "image/jpeg", b"small").await;
    mount_asset(server, &format!("/{}/large", id), "image/png", b"large!").await;
    mount_asset(server, &format!("/{}/preview", id), "audio/mpeg", b"mp3data").await;
}

fn entries(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_images_only_when_preview_missing() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    let out = TempDir::new().unwrap();

    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec(&server, "t1", false))
        .await
        .unwrap();

    assert_eq!(outcome.status(), OutcomeStatus::Complete);
    assert_eq!(outcome.files.len(), 2);
    assert!(outcome.failures.is_empty());

    let dir = out.path().join("Song - Band (t1)");
    assert_eq!(outcome.dir.as_deref(), Some(dir.as_path()));
    assert_eq!(
        entries(&dir),
        BTreeSet::from(["image_default.jpg".to_string(), "image_large.png".to_string()])
    );
    assert_eq!(std::fs::read(dir.join("image_large.png")).unwrap(), b"large!");

    // only the final folder is left, no staging or partial files
    assert_eq!(entries(out.path()), BTreeSet::from(["Song - Band (t1)".to_string()]));
}

#[tokio::test]
async fn test_preview_uses_track_and_artist_name() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    let out = TempDir::new().unwrap();

    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec(&server, "t1", true))
        .await
        .unwrap();

    assert_eq!(outcome.files.len(), 3);
    let preview = outcome.file(AssetKind::Preview).unwrap();
    assert_eq!(preview.file_name().unwrap(), "Song - Band.mp3");
    assert_eq!(std::fs::read(preview).unwrap(), b"mp3data");
    assert_eq!(outcome.files[2].size, 7);
}

#[tokio::test]
async fn test_existing_files_are_not_downloaded_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t1/small"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/jpeg")
                .set_body_bytes(b"small".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t1/large"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/png")
                .set_body_bytes(b"large".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let downloader = downloader(&server, out.path(), false);
    let spec = spec(&server, "t1", false);

    let first = downloader.download_assets(&spec).await.unwrap();
    assert!(first.files.iter().all(|f| !f.already_present));

    let second = downloader.download_assets(&spec).await.unwrap();
    assert_eq!(second.files.len(), 2);
    assert!(second.files.iter().all(|f| f.already_present));
    assert_eq!(second.written().count(), 0);
    assert_eq!(second.status(), OutcomeStatus::Complete);
}

#[tokio::test]
async fn test_existing_file_with_other_extension_counts_as_present() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    let out = TempDir::new().unwrap();

    let dir = out.path().join("Song - Band (t1)");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("image_default.png"), b"old").unwrap();

    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec(&server, "t1", false))
        .await
        .unwrap();

    let default = outcome.file(AssetKind::Image(ImageVariant::Default)).unwrap();
    assert_eq!(default.file_name().unwrap(), "image_default.png");
    assert!(!dir.join("image_default.jpg").exists());
    assert!(dir.join("image_large.png").exists());
}

#[tokio::test]
async fn test_overwrite_replaces_existing_files() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    let out = TempDir::new().unwrap();

    let dir = out.path().join("Song - Band (t1)");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("image_default.jpg"), b"old").unwrap();

    let outcome = downloader(&server, out.path(), true)
        .download_assets(&spec(&server, "t1", false))
        .await
        .unwrap();

    assert!(outcome.files.iter().all(|f| !f.already_present));
    assert_eq!(std::fs::read(dir.join("image_default.jpg")).unwrap(), b"small");
}

#[tokio::test]
async fn test_unknown_content_type_is_a_per_file_failure() {
    let server = MockServer::start().await;
    mount_asset(&server, "/t1/small", "image/jpeg; charset=binary", b"small").await;
    mount_asset(&server, "/t1/large", "text/html", b"<html></html>").await;
    let out = TempDir::new().unwrap();

    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec(&server, "t1", false))
        .await
        .unwrap();

    assert_eq!(outcome.status(), OutcomeStatus::Partial);
    assert!(outcome.is_success());
    assert_eq!(outcome.files.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].kind, AssetKind::Image(ImageVariant::Large));
    assert!(matches!(
        &outcome.failures[0].error,
        DownloadError::UnsupportedContentType { content_type, .. } if content_type == "text/html"
    ));

    let dir = out.path().join("Song - Band (t1)");
    assert_eq!(entries(&dir), BTreeSet::from(["image_default.jpg".to_string()]));
}

#[tokio::test]
async fn test_nothing_downloaded_leaves_no_folder() {
    let server = MockServer::start().await;
    // no mocks mounted: every asset answers 404
    let out = TempDir::new().unwrap();

    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec(&server, "t1", true))
        .await
        .unwrap();

    assert_eq!(outcome.status(), OutcomeStatus::NoResult);
    assert!(!outcome.is_success());
    assert_eq!(outcome.failures.len(), 3);
    assert!(outcome.dir.is_none());
    assert!(matches!(outcome.failures[0].error, DownloadError::Http(_)));
    assert!(entries(out.path()).is_empty());
}

#[tokio::test]
async fn test_spec_without_assets_is_no_result() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    let spec = AssetSpec {
        track_id: "t1".to_string(),
        track_name: "Song".to_string(),
        artist_name: "Band".to_string(),
        preview_url: None,
        images: Vec::new(),
    };
    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec)
        .await
        .unwrap();

    assert_eq!(outcome.status(), OutcomeStatus::NoResult);
    assert!(entries(out.path()).is_empty());
}

async fn batch_files(concurrency: usize) -> Vec<(String, BTreeSet<String>)> {
    let server = MockServer::start().await;
    let ids: Vec<String> = (1..=6).map(|n| format!("t{}", n)).collect();
    for id in &ids {
        mount_track_assets(&server, id).await;
    }

    let out = TempDir::new().unwrap();
    let specs = ids.iter().map(|id| spec(&server, id, true)).collect();
    let report = download_many(&downloader(&server, out.path(), false), specs, concurrency).await;

    assert_eq!(report.len(), 6);
    assert_eq!(report.succeeded(), 6);
    assert_eq!(report.failed(), 0);

    report
        .results
        .iter()
        .map(|(id, result)| {
            let outcome = result.as_ref().unwrap();
            (id.clone(), entries(outcome.dir.as_deref().unwrap()))
        })
        .collect()
}

#[tokio::test]
async fn test_concurrency_does_not_change_results() {
    let sequential = batch_files(1).await;
    let parallel = batch_files(4).await;

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.len(), 6);
    assert!(sequential.iter().all(|(_, files)| files.len() == 3));
}

#[tokio::test]
async fn test_dispatcher_bounds_parallel_jobs() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let jobs = (0..8).map(|n| (format!("t{}", n), n)).collect();
    let report = Dispatcher::new(2)
        .run(jobs, |n: usize| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, DownloadError>(DownloadOutcome::no_result(format!("t{}", n)))
            }
        })
        .await;

    assert_eq!(report.len(), 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_panicking_worker_is_isolated() {
    let jobs = vec![
        ("ok1".to_string(), "ok1".to_string()),
        ("boom".to_string(), "boom".to_string()),
        ("ok2".to_string(), "ok2".to_string()),
    ];

    let report = Dispatcher::new(0)
        .run(jobs, |id: String| async move {
            if id == "boom" {
                panic!("worker exploded");
            }
            Ok::<_, DownloadError>(DownloadOutcome::no_result(id))
        })
        .await;

    assert_eq!(report.len(), 3);
    assert!(matches!(report.get("ok1"), Some(Ok(_))));
    assert!(matches!(report.get("ok2"), Some(Ok(_))));
    assert!(matches!(
        report.get("boom"),
        Some(Err(DownloadError::Worker { track_id, .. })) if track_id == "boom"
    ));
}

#[tokio::test]
async fn test_download_tracks_resolves_ids_in_workers() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;

    Mock::given(method("GET"))
        .and(path("/api/tools/tracks/t1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t1",
            "name": "Song",
            "artists": [{ "id": "a", "name": "Band" }],
            "preview_url": format!("{}/t1/preview", server.uri()),
            "album": {
                "image_default": format!("{}/t1/small", server.uri()),
                "image_large": format!("{}/t1/large", server.uri())
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tools/tracks/missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let out = TempDir::new().unwrap();
    let service = ChosicService::new(client_for(&server));
    let report = download_tracks(
        &service,
        &downloader(&server, out.path(), false),
        vec!["spotify:track:t1".to_string(), "missing".to_string()],
        2,
    )
    .await;

    assert_eq!(report.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);

    let found = report.get("t1").unwrap().as_ref().unwrap();
    assert_eq!(found.files.len(), 3);

    let missing = report.get("missing").unwrap().as_ref().unwrap();
    assert_eq!(missing.status(), OutcomeStatus::NoResult);
    assert!(missing.dir.is_none());
}

fn staging_entries(dir: &Path) -> Vec<String> {
    entries(dir)
        .into_iter()
        .filter(|name| name.starts_with(".partial-"))
        .collect()
}

#[tokio::test]
async fn test_folder_name_near_filesystem_limit() {
    let server = MockServer::start().await;
    let id = "3n3Ppam7vgaVa1iaRUc9Lp";
    mount_track_assets(&server, id).await;
    let out = TempDir::new().unwrap();

    let spec = AssetSpec {
        track_name: "a".repeat(120),
        artist_name: "b".repeat(90),
        ..spec(&server, id, true)
    };
    let folder = format!("{} - {} ({})", "a".repeat(120), "b".repeat(90), id);
    assert_eq!(folder.len(), 238);

    let outcome = downloader(&server, out.path(), false)
        .download_assets(&spec)
        .await
        .unwrap();

    assert_eq!(outcome.status(), OutcomeStatus::Complete);
    assert_eq!(outcome.dir.as_deref(), Some(out.path().join(&folder).as_path()));
    assert_eq!(entries(&out.path().join(&folder)).len(), 3);
    assert!(staging_entries(out.path()).is_empty());
}

#[tokio::test]
async fn test_out_root_that_is_a_file_fails_the_track() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    let parent = TempDir::new().unwrap();
    let out_root = parent.path().join("out");
    std::fs::write(&out_root, b"not a folder").unwrap();

    let err = downloader(&server, &out_root, false)
        .download_assets(&spec(&server, "t1", true))
        .await
        .unwrap_err();

    match err {
        DownloadError::Io { path, .. } => assert_eq!(path, out_root),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(entries(parent.path()), BTreeSet::from(["out".to_string()]));
}

#[tokio::test]
async fn test_failed_rename_removes_staging_folder() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    let out = TempDir::new().unwrap();

    // a regular file already sits where the track folder should go
    let blocked = out.path().join("Song - Band (t1)");
    std::fs::write(&blocked, b"in the way").unwrap();

    let err = downloader(&server, out.path(), false)
        .download_assets(&spec(&server, "t1", true))
        .await
        .unwrap_err();

    match err {
        DownloadError::Io { path, .. } => assert_eq!(path, blocked),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(staging_entries(out.path()).is_empty());
    assert_eq!(std::fs::read(&blocked).unwrap(), b"in the way");
}

#[tokio::test]
async fn test_filesystem_failure_stays_on_its_track() {
    let server = MockServer::start().await;
    mount_track_assets(&server, "t1").await;
    mount_track_assets(&server, "t2").await;
    let out = TempDir::new().unwrap();

    std::fs::write(out.path().join("Song - Band (t1)"), b"in the way").unwrap();

    let specs = vec![spec(&server, "t1", true), spec(&server, "t2", true)];
    let report = download_many(&downloader(&server, out.path(), false), specs, 2).await;

    assert_eq!(report.len(), 2);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(report.failed(), 1);
    assert!(matches!(report.get("t1"), Some(Err(DownloadError::Io { .. }))));

    let ok = report.get("t2").unwrap().as_ref().unwrap();
    assert_eq!(ok.status(), OutcomeStatus::Complete);
    assert_eq!(ok.files.len(), 3);
    assert!(staging_entries(out.path()).is_empty());
}

#[tokio::test]
async fn test_progress_counts_panicked_jobs() {
    let bar = ProgressBar::hidden();
    let jobs = vec![
        ("ok".to_string(), false),
        ("boom".to_string(), true),
        ("ok2".to_string(), false),
    ];

    let report = Dispatcher::new(2)
        .with_progress(bar.clone())
        .run(jobs, |explode: bool| async move {
            if explode {
                panic!("worker exploded");
            }
            Ok::<_, DownloadError>(DownloadOutcome::no_result("ok"))
        })
        .await;

    assert_eq!(report.len(), 3);
    assert_eq!(bar.position(), 3);
}
