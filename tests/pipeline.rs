mod common;

use std::fs;

use common::receipt_on_desk;
use receipt_forensics::{
    EdgeProfile, ForensicsConfig, pipeline::Pipeline, workspace::Workspace,
};

fn seeded_workspace(root: &std::path::Path) -> Workspace {
    let workspace = Workspace::new(root);
    workspace.ensure_dirs().unwrap();

    receipt_on_desk(200, 160, 40)
        .save(workspace.upload_path("page.png").unwrap())
        .unwrap();
    workspace.store_upload("broken.jpg", b"not an image").unwrap();
    workspace
}

#[test]
fn run_analyzes_uploads_and_publishes_report() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = seeded_workspace(dir.path());
    let source = workspace.upload_path("page.png").unwrap();
    let original_bytes = fs::read(&source).unwrap();

    let pipeline = Pipeline::new(workspace.clone(), ForensicsConfig::default()).unwrap();
    let summary = pipeline.run().unwrap();

    assert_eq!(summary.run_id, 1);
    let names = summary
        .report
        .reports
        .iter()
        .map(|entry| entry.filename.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["broken.jpg", "page.png"]);

    let broken = summary.report.entry("broken.jpg").unwrap();
    assert!(broken.findings.edges.error().is_some());
    assert!(broken.flat_patch_overlay.is_none());
    assert!(broken.flagged);

    let page = summary.report.entry("page.png").unwrap();
    assert!(matches!(page.findings.edges, EdgeProfile::Computed { .. }));
    let overlay = page.flat_patch_overlay.as_ref().unwrap();
    assert_eq!(overlay.overlay_image_url, "/overlays/page_overlay.png");
    assert!(workspace.overlay_path("page.png").unwrap().exists());
    assert_eq!(summary.flagged_count(), 2);

    assert_eq!(fs::read(&source).unwrap(), original_bytes);

    let derived = image::open(workspace.derived_path("page.png").unwrap()).unwrap();
    assert!(derived.width() < 200);
    assert!(derived.height() < 160);
    assert!(derived.width() >= 100);
    assert!(derived.height() >= 60);

    assert_eq!(pipeline.current_report().unwrap(), Some(summary.report));
}

#[test]
fn rerun_publishes_a_new_version() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = seeded_workspace(dir.path());
    let pipeline = Pipeline::new(workspace.clone(), ForensicsConfig::default()).unwrap();

    let first = pipeline.run().unwrap();
    workspace.delete_image("page.png").unwrap();
    assert!(!workspace.overlay_path("page.png").unwrap().exists());
    assert!(!workspace.derived_path("page.png").unwrap().exists());

    let second = pipeline.run().unwrap();
    assert_eq!(second.run_id, first.run_id + 1);
    assert_eq!(second.report.reports.len(), 1);

    let store = workspace.report_store();
    assert_eq!(store.list_runs().unwrap(), vec![1, 2]);
    assert_eq!(store.load(1).unwrap(), first.report);
    assert_eq!(pipeline.current_report().unwrap(), Some(second.report));
}

#[test]
fn large_uploads_are_downscaled() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path());
    workspace.ensure_dirs().unwrap();
    receipt_on_desk(400, 300, 20)
        .save(workspace.upload_path("wide.png").unwrap())
        .unwrap();

    let config = ForensicsConfig::default().with_max_dimension(100);
    let pipeline = Pipeline::new(workspace.clone(), config).unwrap();
    let working = pipeline
        .prepare_working_copy(&workspace.upload_path("wide.png").unwrap())
        .unwrap();

    assert!(working.width() <= 100);
    assert!(working.height() <= 100);
}

#[test]
fn invalid_configuration_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = ForensicsConfig::default().with_patch_size(0);
    assert!(Pipeline::new(Workspace::new(dir.path()), config).is_err());
}

#[test]
fn extensionless_upload_is_cropped_and_scanned() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path());
    workspace.ensure_dirs().unwrap();
    image::DynamicImage::ImageLuma8(receipt_on_desk(200, 160, 40))
        .save_with_format(workspace.upload_path("scan").unwrap(), image::ImageFormat::Png)
        .unwrap();

    let pipeline = Pipeline::new(workspace.clone(), ForensicsConfig::default()).unwrap();
    let summary = pipeline.run().unwrap();

    let entry = summary.report.entry("scan").unwrap();
    assert!(matches!(entry.findings.edges, EdgeProfile::Computed { .. }));
    assert_eq!(
        entry.flat_patch_overlay.as_ref().unwrap().overlay_image_url,
        "/overlays/scan_overlay"
    );

    let derived = workspace.derived_path("scan").unwrap();
    let reader = image::ImageReader::open(&derived)
        .unwrap()
        .with_guessed_format()
        .unwrap();
    assert_eq!(reader.format(), Some(image::ImageFormat::Png));
    let cropped = reader.decode().unwrap();
    assert!(cropped.width() < 200 && cropped.height() < 160);
    assert!(workspace.overlay_path("scan").unwrap().exists());
}
