use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::db::DB_FILE_NAME;

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/reviewd.sqlite3";
pub const BUNDLE_FORMAT: &str = "reviewd-workspace-v1";
pub const LEGACY_FORMAT: &str = "legacy-sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format: String,
    pub app_version: String,
    pub exported_at: String,
    pub db_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub bundle_format: String,
    pub db_sha256: String,
    pub db_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSummary {
    pub bundle_format_detected: String,
    pub db_sha256: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn export_workspace_bundle(workspace: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let db_path = workspace.join(DB_FILE_NAME);
    let db_bytes = std::fs::read(&db_path)
        .with_context(|| format!("workspace database not readable: {}", db_path.display()))?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.display()))?;

    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now().to_rfc3339(),
        db_sha256: sha256_hex(&db_bytes),
    };

    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(serde_json::to_string_pretty(&manifest)?.as_bytes())
        .context("failed to write manifest entry")?;
    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    zip.write_all(&db_bytes)
        .context("failed to write database entry")?;
    zip.finish().context("failed to finalize bundle")?;

    tracing::info!(bundle = %out_path.display(), bytes = db_bytes.len(), "workspace bundle written");
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT.to_string(),
        db_sha256: manifest.db_sha256,
        db_bytes: db_bytes.len(),
    })
}

/// Replaces the workspace database with the one in `in_path`. The caller must
/// close any open connection to it first.
pub fn import_workspace_bundle(in_path: &Path, workspace: &Path) -> anyhow::Result<RestoreSummary> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.display()))?;

    let (format, bytes) = if is_zip_file(in_path)? {
        read_bundle(in_path)?
    } else {
        let bytes = std::fs::read(in_path)
            .with_context(|| format!("failed to read backup {}", in_path.display()))?;
        (LEGACY_FORMAT.to_string(), bytes)
    };

    let dst = workspace.join(DB_FILE_NAME);
    let tmp = workspace.join(format!("{DB_FILE_NAME}.importing"));
    {
        let mut out = File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        out.write_all(&bytes).context("failed to write restored database")?;
        out.flush().context("failed to flush restored database")?;
    }
    if dst.exists() {
        std::fs::remove_file(&dst)
            .with_context(|| format!("failed to remove existing database {}", dst.display()))?;
    }
    std::fs::rename(&tmp, &dst)
        .with_context(|| format!("failed to move restored database to {}", dst.display()))?;

    tracing::info!(source = %in_path.display(), %format, "workspace restored");
    Ok(RestoreSummary {
        bundle_format_detected: format,
        db_sha256: sha256_hex(&bytes),
    })
}

fn read_bundle(in_path: &Path) -> anyhow::Result<(String, Vec<u8>)> {
    let file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.display()))?;
    let mut archive = ZipArchive::new(file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Manifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT {
        bail!("unsupported bundle format: {}", manifest.format);
    }

    let mut bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .with_context(|| format!("bundle missing {DB_ENTRY}"))?
        .read_to_end(&mut bytes)
        .context("failed to extract database entry")?;
    let actual = sha256_hex(&bytes);
    if !actual.eq_ignore_ascii_case(&manifest.db_sha256) {
        return Err(anyhow!(
            "database checksum mismatch: manifest {}, bundle {}",
            manifest.db_sha256,
            actual
        ));
    }
    Ok((manifest.format, bytes))
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    Ok(read == 4 && sig == [0x50, 0x4B, 0x03, 0x04])
}
