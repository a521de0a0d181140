use std::path::PathBuf;

use chrono::Local;
use serde_json::json;

use crate::export;
use crate::ipc::error::{err, lookup_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::scheduling::{ident, reconcile};
use crate::sheet::{clean_numeric_text, SheetRow};
use crate::store::{Division, NewGroup, NewMember, ReviewStore};
use crate::views;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Flat editor rows: one per member, group fields repeated. Keys may be
/// camelCase or snake_case.
fn field(row: &SheetRow, camel: &str, snake: &str) -> String {
    row.get_any(&names(&[camel, snake]))
        .unwrap_or_default()
        .to_string()
}

fn optional_field(row: &SheetRow, camel: &str, snake: &str) -> Option<String> {
    row.get_any(&names(&[camel, snake])).map(str::to_string)
}

struct SavePlan {
    groups: Vec<NewGroup>,
    members: Vec<NewMember>,
    skipped: usize,
}

fn plan_save(rows: &[serde_json::Value]) -> SavePlan {
    let mut plan = SavePlan {
        groups: Vec::new(),
        members: Vec::new(),
        skipped: 0,
    };
    for value in rows {
        let Some(obj) = value.as_object() else {
            plan.skipped += 1;
            continue;
        };
        let row = SheetRow::from_json(obj);
        let roll_no = field(&row, "rollNo", "roll_no");
        let group_id = ident::normalize_group_id(&field(&row, "groupId", "group_id"));
        let (Some(group_id), false) = (group_id, roll_no.is_empty()) else {
            plan.skipped += 1;
            continue;
        };
        if !plan.groups.iter().any(|g| g.group_id == group_id) {
            let division = Division::parse(&field(&row, "division", "division"))
                .map(|d| d.as_str().to_string())
                .or_else(|| ident::division_of(&group_id).map(String::from))
                .unwrap_or_default();
            plan.groups.push(NewGroup {
                group_id: group_id.clone(),
                division,
                domain: field(&row, "projectDomain", "project_domain"),
                title: field(&row, "projectTitle", "project_title"),
                sponsor: field(&row, "sponsorCompany", "sponsor_company"),
                guide_name: field(&row, "guideName", "guide_name"),
                mentor_name: field(&row, "mentorName", "mentor_name"),
                mentor_email: field(&row, "mentorEmail", "mentor_email"),
                mentor_mobile: clean_numeric_text(&field(&row, "mentorMobile", "mentor_mobile")),
                evaluator1: optional_field(&row, "evaluator1Name", "evaluator1_name"),
                evaluator2: optional_field(&row, "evaluator2Name", "evaluator2_name"),
            });
        }
        plan.members.push(NewMember {
            group_id,
            roll_no: clean_numeric_text(&roll_no),
            student_name: field(&row, "studentName", "student_name"),
            contact_details: clean_numeric_text(&field(&row, "contactDetails", "contact_details")),
        });
    }
    plan
}

fn handle_projects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "projects": [] }));
    };
    match views::list_projects(conn) {
        Ok(projects) => ok(&req.id, json!({ "projects": projects })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn save_projects(
    conn: &rusqlite::Connection,
    rows: &[serde_json::Value],
) -> Result<serde_json::Value, HandlerErr> {
    let plan = plan_save(rows);
    let tx = conn.unchecked_transaction().map_err(|e| HandlerErr {
        code: "db_tx_failed",
        message: e.to_string(),
        details: None,
    })?;
    let deleted = tx
        .clear_members()
        .and_then(|_| tx.clear_groups())
        .map_err(|e| HandlerErr {
            code: "db_delete_failed",
            message: format!("{e:#}"),
            details: None,
        })?;
    for g in &plan.groups {
        tx.upsert_group(g).map_err(|e| HandlerErr {
            code: "db_insert_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "table": "projects", "groupId": g.group_id })),
        })?;
    }
    let mut members = 0usize;
    for m in &plan.members {
        let inserted = tx.insert_member(m).map_err(|e| HandlerErr {
            code: "db_insert_failed",
            message: format!("{e:#}"),
            details: Some(json!({ "table": "members", "groupId": m.group_id })),
        })?;
        if inserted {
            members += 1;
        }
    }
    tx.commit().map_err(|e| HandlerErr {
        code: "db_commit_failed",
        message: e.to_string(),
        details: None,
    })?;

    let synced = reconcile::sync(conn).map_err(|e| HandlerErr {
        code: "db_update_failed",
        message: format!("{e:#}"),
        details: None,
    })?;
    tracing::info!(groups = plan.groups.len(), members, replaced = deleted, "projects saved");
    Ok(json!({
        "groups": plan.groups.len(),
        "members": members,
        "skipped": plan.skipped,
        "rowsSynced": synced,
    }))
}

fn handle_projects_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(rows) = req.params.get("rows").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing rows", None);
    };
    match save_projects(conn, rows) {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

fn handle_projects_details(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(raw) = req.params.get("groupId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing groupId", None);
    };
    let group_id = ident::normalize_group_id(raw).unwrap_or_else(|| raw.trim().to_string());
    match views::project_details(conn, &group_id) {
        Ok(project) => ok(&req.id, json!({ "project": project })),
        Err(e) => lookup_err(&req.id, e),
    }
}

fn handle_projects_export_xlsx(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(workspace)) = (state.db.as_ref(), state.workspace.as_ref()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let out_path = req
        .params
        .get("outPath")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .unwrap_or_else(|| workspace.join(export::default_export_name(Local::now())));

    let projects = match views::list_projects(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", format!("{e:#}"), None),
    };
    match export::write_projects_xlsx(&projects, &out_path) {
        Ok(rows) => ok(
            &req.id,
            json!({ "path": out_path.to_string_lossy(), "rows": rows }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path.to_string_lossy() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "projects.list" => Some(handle_projects_list(state, req)),
        "projects.save" => Some(handle_projects_save(state, req)),
        "projects.details" => Some(handle_projects_details(state, req)),
        "projects.exportXlsx" => Some(handle_projects_export_xlsx(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_rows_group_by_id_and_skip_incomplete() {
        let rows = vec![
            json!({ "groupId": "bia1", "rollNo": 101.0, "studentName": "Asha", "projectTitle": "Irrigation" }),
            json!({ "group_id": "BIA-01", "roll_no": "102", "student_name": "Bina", "contact_details": "98765.0" }),
            json!({ "groupId": "BIB-02", "studentName": "No roll" }),
            json!({ "rollNo": "7" }),
            json!("not an object"),
        ];
        let plan = plan_save(&rows);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].group_id, "BIA-01");
        assert_eq!(plan.groups[0].division, "A");
        assert_eq!(plan.groups[0].title, "Irrigation");
        assert_eq!(plan.members.len(), 2);
        assert_eq!(plan.members[0].roll_no, "101");
        assert_eq!(plan.members[1].contact_details, "98765");
        assert_eq!(plan.skipped, 3);
    }

    #[test]
    fn saved_division_is_canonical_for_coverage_and_sweep() {
        let rows = vec![
            json!({ "groupId": "BIA-01", "rollNo": "1", "studentName": "Asha", "division": "a" }),
            json!({ "groupId": "BIB-02", "rollNo": "2", "studentName": "Dev", "division": "Mech" }),
        ];
        let plan = plan_save(&rows);
        assert_eq!(plan.groups[0].division, "A");
        assert_eq!(plan.groups[1].division, "B");

        let conn = crate::db::open_in_memory().expect("db");
        for g in &plan.groups {
            conn.upsert_group(g).expect("group");
        }
        reconcile::sweep(&conn).expect("sweep");
        let (e1, _) = conn.group_evaluators("BIA-01").expect("q").expect("group");
        assert_eq!(e1.as_deref(), Some("Default Evaluator A.1"));
        assert_eq!(conn.count_groups_with_evaluator(Division::A).expect("a"), 1);
        assert_eq!(conn.division_coverage(Division::B).expect("b").total, 1);
    }
}
