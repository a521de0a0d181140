use std::path::PathBuf;

use serde_json::json;

use crate::backup;
use crate::config::{options_from_params, ImportOptions};
use crate::ipc::error::{err, import_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::scheduling::run_import;
use crate::sheet::{SheetRow, WorkbookRows};
use crate::workbook;

fn import_options(req: &Request) -> Result<ImportOptions, serde_json::Value> {
    options_from_params(req.params.get("options"))
        .map_err(|e| err(&req.id, "bad_params", format!("invalid options: {e}"), None))
}

fn rows_param(req: &Request, key: &str) -> Result<Vec<SheetRow>, serde_json::Value> {
    let Some(items) = req.params.get(key) else {
        return Ok(Vec::new());
    };
    let Some(items) = items.as_array() else {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{key} must be an array of objects"),
            None,
        ));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_object().map(SheetRow::from_json).ok_or_else(|| {
                err(
                    &req.id,
                    "bad_params",
                    format!("{key}[{i}] is not an object"),
                    None,
                )
            })
        })
        .collect()
}

fn handle_import_workbook(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let path = match req.params.get("path").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => return err(&req.id, "bad_params", "missing path", None),
    };
    let opts = match import_options(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let rows = match workbook::read_workbook(&path, &opts) {
        Ok(v) => v,
        Err(e) => return import_err(&req.id, &e),
    };

    let mut snapshot = None;
    if let Some(backup_to) = req.params.get("backupTo").and_then(|v| v.as_str()) {
        let Some(workspace) = state.workspace.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        match backup::export_workspace_bundle(workspace, &PathBuf::from(backup_to)) {
            Ok(summary) => snapshot = Some(json!({ "path": backup_to, "dbSha256": summary.db_sha256 })),
            Err(e) => {
                return err(
                    &req.id,
                    "io_failed",
                    format!("{e:#}"),
                    Some(json!({ "path": backup_to })),
                )
            }
        }
    }

    match run_import(conn, &rows, &opts) {
        Ok(summary) => ok(&req.id, json!({ "summary": summary, "backup": snapshot })),
        Err(e) => import_err(&req.id, &e),
    }
}

fn handle_import_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let opts = match import_options(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let parsed = rows_param(req, "divisionA").and_then(|a| {
        let b = rows_param(req, "divisionB")?;
        let s = rows_param(req, "schedule")?;
        Ok((a, b, s))
    });
    let (division_a, division_b, schedule) = match parsed {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let rows = WorkbookRows {
        division_a,
        division_b,
        schedule,
        sources: None,
    };
    match run_import(conn, &rows, &opts) {
        Ok(summary) => ok(&req.id, json!({ "summary": summary })),
        Err(e) => import_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.workbook" => Some(handle_import_workbook(state, req)),
        "import.rows" => Some(handle_import_rows(state, req)),
        _ => None,
    }
}
