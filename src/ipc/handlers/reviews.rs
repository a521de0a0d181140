use std::collections::BTreeMap;

use serde_json::json;

use crate::forms;
use crate::ipc::error::{err, lookup_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::scheduling::ident;

fn response_text(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn handle_reviews_form_fields(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(raw_id) = req.params.get("groupId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing groupId", None);
    };
    let stage = match req
        .params
        .get("stage")
        .and_then(|v| v.as_u64())
        .and_then(|v| u8::try_from(v).ok())
    {
        Some(s) if forms::STAGES.contains(&s) => s,
        _ => {
            return err(
                &req.id,
                "bad_params",
                "stage must be an integer from 1 to 5",
                None,
            )
        }
    };
    let date = req
        .params
        .get("date")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let responses: BTreeMap<String, String> = match req.params.get("responses") {
        None | Some(serde_json::Value::Null) => BTreeMap::new(),
        Some(serde_json::Value::Object(m)) => {
            m.iter().map(|(k, v)| (k.clone(), response_text(v))).collect()
        }
        Some(_) => return err(&req.id, "bad_params", "responses must be an object", None),
    };

    let group_id = ident::normalize_group_id(raw_id).unwrap_or_else(|| raw_id.trim().to_string());
    match forms::form_fields(conn, &group_id, stage, &date, &responses) {
        Ok(fields) => ok(&req.id, json!({ "stage": stage, "fields": fields })),
        Err(e) => lookup_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reviews.formFields" => Some(handle_reviews_form_fields(state, req)),
        _ => None,
    }
}
