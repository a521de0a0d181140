use serde_json::json;

use crate::config::{options_from_params, PlannerOptions};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::scheduling::extract::parse_track;
use crate::scheduling::reconcile::{self, WriteMode};
use crate::scheduling::{ident, planner};
use crate::sheet::SheetRow;
use crate::store::{PanelAssignment, ReviewStore};
use crate::views;

fn text(row: &SheetRow, camel: &str, snake: &str) -> Option<String> {
    row.get_any(&[camel.to_string(), snake.to_string()])
        .map(str::to_string)
}

/// Reads one manual schedule row. `None` when it has no usable group id.
fn assignment_from_json(value: &serde_json::Value) -> Option<PanelAssignment> {
    let row = SheetRow::from_json(value.as_object()?);
    let group_id = ident::normalize_group_id(&text(&row, "groupId", "group_id")?)?;
    Some(PanelAssignment {
        group_id,
        track: text(&row, "track", "track").and_then(|t| parse_track(&t)),
        location: text(&row, "location", "location").unwrap_or_default(),
        panel_professors: text(&row, "panelProfessors", "panel_professors").unwrap_or_default(),
        guide: text(&row, "guide", "guide"),
        reviewer1: text(&row, "reviewer1", "reviewer1"),
        reviewer2: text(&row, "reviewer2", "reviewer2"),
        reviewer3: text(&row, "reviewer3", "reviewer3"),
    })
}

fn handle_schedule_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match views::schedule_board(conn) {
        Ok((entries, stats)) => ok(&req.id, json!({ "schedule": entries, "stats": stats })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn handle_schedule_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(rows) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing rows", None);
    };
    let assignments: Vec<PanelAssignment> = rows.iter().filter_map(assignment_from_json).collect();
    let skipped = rows.len() - assignments.len();
    let keep: Vec<String> = assignments.iter().map(|a| a.group_id.clone()).collect();

    let res = conn.atomically(|s| {
        let removed = s.delete_panel_assignments_except(&keep)?;
        for a in &assignments {
            reconcile::commit_assignment(s, a, WriteMode::Replace)?;
        }
        Ok(removed)
    });
    match res {
        Ok(removed) => ok(
            &req.id,
            json!({
                "saved": assignments.len(),
                "removed": removed,
                "skipped": skipped,
            }),
        ),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_schedule_generate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let opts: PlannerOptions = match options_from_params(Some(&req.params)) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", e, None),
    };
    match planner::generate(conn, &opts) {
        Ok(report) if report.scheduled == 0 && report.failed.is_empty() => ok(
            &req.id,
            json!({
                "scheduled": 0,
                "tracksUsed": 0,
                "failed": [],
                "message": "all groups are already scheduled",
            }),
        ),
        Ok(report) => ok(&req.id, json!(report)),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn handle_schedule_sync_evaluators(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match reconcile::sync(conn) {
        Ok(n) => ok(&req.id, json!({ "rowsUpdated": n })),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_schedule_sweep(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match reconcile::sweep(conn) {
        Ok(report) => ok(&req.id, json!(report)),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_evaluators_coverage(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match views::coverage_report(conn) {
        Ok(report) => ok(&req.id, json!(report)),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.get" => Some(handle_schedule_get(state, req)),
        "schedule.save" => Some(handle_schedule_save(state, req)),
        "schedule.generate" => Some(handle_schedule_generate(state, req)),
        "schedule.syncEvaluators" => Some(handle_schedule_sync_evaluators(state, req)),
        "schedule.sweep" => Some(handle_schedule_sweep(state, req)),
        "evaluators.coverage" => Some(handle_evaluators_coverage(state, req)),
        _ => None,
    }
}
