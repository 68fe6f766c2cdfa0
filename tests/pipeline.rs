//! End-to-end pipeline tests against a scripted in-memory canvas API and
//! temp-directory asset/backup trees.

use async_trait::async_trait;
use reclaim::backup::Searcher;
use reclaim::canvus::{
    BackgroundImage, Canvas, CanvasBackground, CanvusApi, ImageDetails, PdfDetails, VideoDetails,
    Widget, WidgetType,
};
use reclaim::config::RecoveryConfig;
use reclaim::error::RecoveryError;
use reclaim::recovery::{RecoveryPipeline, RestorePolicy};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const HASH_A: &str = "aaaa1111aaaa1111";
const HASH_B: &str = "bbbb2222bbbb2222";
const HASH_C: &str = "cccc3333cccc3333";

/// Scripted canvas server: two canvases referencing three assets (two
/// images and one PDF).
#[derive(Default)]
struct ScriptedServer {
    logins: AtomicUsize,
}

#[async_trait]
impl CanvusApi for ScriptedServer {
    async fn login(&self, username: &str, _password: &str) -> Result<(), RecoveryError> {
        if username.is_empty() {
            return Err(RecoveryError::Auth("no username".to_string()));
        }
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn logout(&self) -> Result<(), RecoveryError> {
        Ok(())
    }

    async fn list_canvases(&self) -> Result<Vec<Canvas>, RecoveryError> {
        Ok(vec![
            Canvas {
                id: "c1".to_string(),
                name: "Design Review".to_string(),
            },
            Canvas {
                id: "c2".to_string(),
                name: "Retrospective".to_string(),
            },
        ])
    }

    async fn list_widgets(&self, canvas_id: &str) -> Result<Vec<Widget>, RecoveryError> {
        let widgets = match canvas_id {
            "c1" => vec![
                Widget {
                    id: "w1".to_string(),
                    widget_type: WidgetType::Image,
                },
                Widget {
                    id: "w2".to_string(),
                    widget_type: WidgetType::Image,
                },
                Widget {
                    id: "w3".to_string(),
                    widget_type: WidgetType::Other,
                },
            ],
            "c2" => vec![Widget {
                id: "w4".to_string(),
                widget_type: WidgetType::Pdf,
            }],
            _ => Vec::new(),
        };
        Ok(widgets)
    }

    async fn get_image_details(
        &self,
        _canvas_id: &str,
        widget_id: &str,
    ) -> Result<ImageDetails, RecoveryError> {
        let hash = match widget_id {
            "w1" => HASH_A,
            "w2" => HASH_B,
            _ => return Err(RecoveryError::Api("no such image".to_string())),
        };
        Ok(ImageDetails {
            id: widget_id.to_string(),
            hash: hash.to_string(),
            title: format!("image {}", widget_id),
            original_filename: format!("{}.png", widget_id),
        })
    }

    async fn get_pdf_details(
        &self,
        _canvas_id: &str,
        widget_id: &str,
    ) -> Result<PdfDetails, RecoveryError> {
        Ok(PdfDetails {
            id: widget_id.to_string(),
            hash: HASH_C.to_string(),
            title: "quarterly report".to_string(),
            original_filename: "report.pdf".to_string(),
        })
    }

    async fn get_video_details(
        &self,
        _canvas_id: &str,
        _widget_id: &str,
    ) -> Result<VideoDetails, RecoveryError> {
        Err(RecoveryError::Api("no videos here".to_string()))
    }

    async fn get_canvas_background(
        &self,
        _canvas_id: &str,
    ) -> Result<CanvasBackground, RecoveryError> {
        Ok(CanvasBackground { image: None })
    }

    async fn get_asset_by_hash(
        &self,
        _canvas_id: &str,
        _hash: &str,
    ) -> Result<Vec<u8>, RecoveryError> {
        Ok(Vec::new())
    }
}

/// A server whose background for c1 carries an asset.
struct BackgroundServer(ScriptedServer);

#[async_trait]
impl CanvusApi for BackgroundServer {
    async fn login(&self, username: &str, password: &str) -> Result<(), RecoveryError> {
        self.0.login(username, password).await
    }
    async fn logout(&self) -> Result<(), RecoveryError> {
        self.0.logout().await
    }
    async fn list_canvases(&self) -> Result<Vec<Canvas>, RecoveryError> {
        self.0.list_canvases().await
    }
    async fn list_widgets(&self, canvas_id: &str) -> Result<Vec<Widget>, RecoveryError> {
        self.0.list_widgets(canvas_id).await
    }
    async fn get_image_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<ImageDetails, RecoveryError> {
        self.0.get_image_details(canvas_id, widget_id).await
    }
    async fn get_pdf_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<PdfDetails, RecoveryError> {
        self.0.get_pdf_details(canvas_id, widget_id).await
    }
    async fn get_video_details(
        &self,
        canvas_id: &str,
        widget_id: &str,
    ) -> Result<VideoDetails, RecoveryError> {
        self.0.get_video_details(canvas_id, widget_id).await
    }
    async fn get_canvas_background(
        &self,
        canvas_id: &str,
    ) -> Result<CanvasBackground, RecoveryError> {
        if canvas_id == "c1" {
            return Ok(CanvasBackground {
                image: Some(BackgroundImage {
                    hash: "dddd4444dddd4444".to_string(),
                }),
            });
        }
        Ok(CanvasBackground { image: None })
    }
    async fn get_asset_by_hash(
        &self,
        canvas_id: &str,
        hash: &str,
    ) -> Result<Vec<u8>, RecoveryError> {
        self.0.get_asset_by_hash(canvas_id, hash).await
    }
}

struct Deployment {
    _root: TempDir,
    assets_dir: PathBuf,
    backup_root: PathBuf,
    output_dir: PathBuf,
}

/// Local state matching the scripted server: asset A present, B available in
/// two backup snapshots (the newer with distinct contents), C nowhere.
fn deployment() -> Deployment {
    let root = TempDir::new().unwrap();
    let assets_dir = root.path().join("assets");
    let backup_root = root.path().join("backups");
    let output_dir = root.path().join("output");

    fs::create_dir_all(&assets_dir).unwrap();
    fs::write(assets_dir.join(format!("{}.png", HASH_A)), b"asset a").unwrap();

    write_backup(
        &backup_root,
        "1700000000_2023_11_14_3.2.0_mt-canvus_backup",
        &format!("{}.png", HASH_B),
        b"stale copy",
        86_400,
    );
    write_backup(
        &backup_root,
        "1750000000_2025_06_15_3.3.0_mt-canvus_backup",
        &format!("{}.png", HASH_B),
        b"fresh copy",
        60,
    );

    Deployment {
        _root: root,
        assets_dir,
        backup_root,
        output_dir,
    }
}

fn write_backup(backup_root: &Path, snapshot: &str, relative: &str, contents: &[u8], age_secs: u64) {
    let path = backup_root.join(snapshot).join("assets").join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
        .unwrap();
}

fn config_for(deployment: &Deployment) -> RecoveryConfig {
    let mut config = RecoveryConfig::default();
    config.server.username = "admin".to_string();
    config.server.password = "secret".to_string();
    config.paths.assets_dir = deployment.assets_dir.clone();
    config.paths.backup_root = deployment.backup_root.clone();
    config.paths.output_dir = deployment.output_dir.clone();
    config
}

#[tokio::test]
async fn full_run_restores_the_newest_backup_and_reports_the_rest() {
    let deployment = deployment();
    let pipeline = RecoveryPipeline::new(
        config_for(&deployment),
        Arc::new(ScriptedServer::default()),
        RestorePolicy::Auto,
    );

    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.canvases, 2);
    assert_eq!(summary.total_assets, 3);
    assert_eq!(summary.unique_assets, 3);
    assert_eq!(summary.local_files, 1);
    assert_eq!(summary.missing, 2); // B and C
    assert_eq!(summary.found_in_backup, 1); // B
    assert_eq!(summary.still_missing, 1); // C
    assert_eq!(summary.restored, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.bytes_restored, b"fresh copy".len() as u64);

    // The newest candidate won.
    let restored = deployment.assets_dir.join(format!("{}.png", HASH_B));
    assert_eq!(fs::read(restored).unwrap(), b"fresh copy");

    // Exactly one header and two data rows: B found, C not found.
    let csv = fs::read_to_string(deployment.output_dir.join("missing_assets.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    let b_row = lines.iter().find(|l| l.contains(HASH_B)).unwrap();
    assert!(b_row.contains(",Found,"));
    assert!(!b_row.contains("Not Found"));
    let c_row = lines.iter().find(|l| l.contains(HASH_C)).unwrap();
    assert!(c_row.contains(",Not Found,"));

    let text = fs::read_to_string(deployment.output_dir.join("missing_assets_report.txt")).unwrap();
    assert!(text.contains("Canvas: Design Review"));
    assert!(text.contains("Canvas: Retrospective"));
}

#[tokio::test]
async fn a_second_run_only_misses_what_no_backup_carried() {
    let deployment = deployment();
    let config = config_for(&deployment);
    let api: Arc<dyn CanvusApi> = Arc::new(ScriptedServer::default());

    let first = RecoveryPipeline::new(config.clone(), Arc::clone(&api), RestorePolicy::Auto)
        .run()
        .await
        .unwrap();
    assert_eq!(first.missing, 2);

    let second = RecoveryPipeline::new(config, api, RestorePolicy::Auto)
        .run()
        .await
        .unwrap();
    assert_eq!(second.missing, 1); // only C remains
    assert_eq!(second.found_in_backup, 0);
    assert_eq!(second.restored, 0);

    // The restored file was not rewritten.
    let restored = deployment.assets_dir.join(format!("{}.png", HASH_B));
    assert_eq!(fs::read(restored).unwrap(), b"fresh copy");
}

#[tokio::test]
async fn report_only_mode_never_touches_the_assets_dir() {
    let deployment = deployment();
    let pipeline = RecoveryPipeline::new(
        config_for(&deployment),
        Arc::new(ScriptedServer::default()),
        RestorePolicy::Never,
    );

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.found_in_backup, 1);
    assert_eq!(summary.restored, 0);
    assert!(!deployment
        .assets_dir
        .join(format!("{}.png", HASH_B))
        .exists());
    // Reports still land.
    assert!(deployment.output_dir.join("missing_assets.csv").exists());
}

#[tokio::test]
async fn missing_assets_dir_aborts_before_backup_search() {
    let deployment = deployment();
    let mut config = config_for(&deployment);
    config.paths.assets_dir = deployment._root.path().join("does-not-exist");

    let result = RecoveryPipeline::new(
        config,
        Arc::new(ScriptedServer::default()),
        RestorePolicy::Auto,
    )
    .run()
    .await;

    assert!(matches!(result, Err(RecoveryError::AssetsDirMissing(_))));
    // Nothing was reported: the run died at the scan stage.
    assert!(!deployment.output_dir.exists());
}

#[tokio::test]
async fn missing_backup_root_reports_everything_still_missing() {
    let deployment = deployment();
    let mut config = config_for(&deployment);
    config.paths.backup_root = deployment._root.path().join("no-backups-here");

    let summary = RecoveryPipeline::new(
        config,
        Arc::new(ScriptedServer::default()),
        RestorePolicy::Auto,
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.missing, 2);
    assert_eq!(summary.found_in_backup, 0);
    assert_eq!(summary.still_missing, 2);
    assert_eq!(summary.restored, 0);
}

#[tokio::test]
async fn background_assets_join_the_wanted_set() {
    let deployment = deployment();
    let pipeline = RecoveryPipeline::new(
        config_for(&deployment),
        Arc::new(BackgroundServer(ScriptedServer::default())),
        RestorePolicy::Never,
    );

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.total_assets, 4);
    assert_eq!(summary.unique_assets, 4);
    assert_eq!(summary.missing, 3); // B, C, and the background hash

    let csv = fs::read_to_string(deployment.output_dir.join("missing_assets.csv")).unwrap();
    assert!(csv.contains("dddd4444dddd4444"));
    assert!(csv.contains("CanvasBackground"));
}

#[tokio::test]
async fn failed_login_is_fatal() {
    let deployment = deployment();
    let mut config = config_for(&deployment);
    config.server.username = String::new();
    config.server.password = "secret".to_string();

    let result = RecoveryPipeline::new(
        config,
        Arc::new(ScriptedServer::default()),
        RestorePolicy::Auto,
    )
    .run()
    .await;
    assert!(matches!(result, Err(RecoveryError::Auth(_))));
}

#[test]
fn searcher_scenario_ranks_two_candidates_by_recency() {
    let deployment = deployment();
    let searcher = Searcher::new(&deployment.backup_root);
    let mut search = searcher
        .search_for_assets(&[HASH_B.to_string(), HASH_C.to_string()])
        .unwrap();
    search.sort_candidates();

    let candidates = &search.found[HASH_B];
    assert_eq!(candidates.len(), 2);
    assert!(candidates[0].modified >= candidates[1].modified);
    assert_eq!(search.missing_hashes, vec![HASH_C.to_string()]);

    let best = search.best_candidate(HASH_B).unwrap();
    assert_eq!(fs::read(&best.path).unwrap(), b"fresh copy");
}
