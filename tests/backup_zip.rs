use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use reviewd::backup;
use reviewd::db::DB_FILE_NAME;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("reviewd-backup-src");
    let workspace2 = temp_dir("reviewd-backup-dst");
    let out_dir = temp_dir("reviewd-backup-out");

    let bytes = b"sqlite-test-payload";
    std::fs::write(workspace.join(DB_FILE_NAME), bytes).expect("write source db");

    let bundle_path = out_dir.join("workspace.reviewd.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.db_bytes, bytes.len());

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT));
    assert!(manifest.contains(&export.db_sha256));
    archive
        .by_name("db/reviewd.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT);
    assert_eq!(import.db_sha256, export.db_sha256);

    let restored = std::fs::read(workspace2.join(DB_FILE_NAME)).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_bundle_is_rejected() {
    let out_dir = temp_dir("reviewd-backup-tampered");
    let workspace = temp_dir("reviewd-backup-tampered-dst");
    std::fs::write(workspace.join(DB_FILE_NAME), b"current").expect("write current db");

    let bundle_path = out_dir.join("tampered.zip");
    {
        let f = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(f);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        zip.write_all(
            serde_json::json!({
                "format": backup::BUNDLE_FORMAT,
                "appVersion": "0.0.0",
                "exportedAt": "2026-01-01T00:00:00Z",
                "dbSha256": "0000",
            })
            .to_string()
            .as_bytes(),
        )
        .expect("write manifest");
        zip.start_file("db/reviewd.sqlite3", opts).expect("db entry");
        zip.write_all(b"replacement").expect("write db");
        zip.finish().expect("finish zip");
    }

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("checksum");
    assert!(format!("{e:#}").contains("checksum mismatch"), "{e:#}");
    let current = std::fs::read(workspace.join(DB_FILE_NAME)).expect("read db");
    assert_eq!(current, b"current");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn legacy_sqlite_import_is_supported() {
    let out_dir = temp_dir("reviewd-backup-legacy");
    let workspace = temp_dir("reviewd-backup-legacy-dst");

    let legacy_file = out_dir.join("legacy.sqlite3");
    let bytes = b"legacy-sqlite-copy";
    std::fs::write(&legacy_file, bytes).expect("write legacy sqlite file");

    let import =
        backup::import_workspace_bundle(&legacy_file, &workspace).expect("import legacy sqlite");
    assert_eq!(import.bundle_format_detected, backup::LEGACY_FORMAT);

    let restored = std::fs::read(workspace.join(DB_FILE_NAME)).expect("read restored sqlite");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}
