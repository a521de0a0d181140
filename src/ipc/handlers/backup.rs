use std::path::PathBuf;

use serde_json::json;

use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn path_param(req: &Request, key: &str) -> Option<PathBuf> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out_path) = path_param(req, "outPath") else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };
    let Some(workspace_path) = path_param(req, "workspacePath").or_else(|| state.workspace.clone())
    else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    match backup::export_workspace_bundle(&workspace_path, &out_path) {
        Ok(export) => ok(
            &req.id,
            json!({
                "path": out_path.to_string_lossy(),
                "bundleFormat": export.bundle_format,
                "dbSha256": export.db_sha256,
                "dbBytes": export.db_bytes,
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path.to_string_lossy() })),
        ),
    }
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(src) = path_param(req, "inPath") else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    let Some(workspace_path) = path_param(req, "workspacePath").or_else(|| state.workspace.clone())
    else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": src.to_string_lossy() })),
        );
    }

    // The open handle must be closed before its file is replaced.
    let replacing_open = state.workspace.as_ref() == Some(&workspace_path);
    if replacing_open {
        state.db = None;
    }

    let restored = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            if replacing_open {
                state.db = db::open_db(&workspace_path).ok();
            }
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    match db::open_db(&workspace_path) {
        Ok(conn) => {
            state.workspace = Some(workspace_path.clone());
            state.db = Some(conn);
            ok(
                &req.id,
                json!({
                    "workspacePath": workspace_path.to_string_lossy(),
                    "bundleFormatDetected": restored.bundle_format_detected,
                    "dbSha256": restored.db_sha256,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        _ => None,
    }
}
