use serde_json::json;

use crate::error::{ImportError, LookupError};

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn lookup_err(id: &str, e: LookupError) -> serde_json::Value {
    match e {
        LookupError::NotFound(group_id) => err(
            id,
            "not_found",
            format!("group {group_id} not found"),
            Some(json!({ "groupId": group_id })),
        ),
        LookupError::Store(e) => err(id, "db_query_failed", format!("{e:#}"), None),
    }
}

pub fn import_err(id: &str, e: &ImportError) -> serde_json::Value {
    let details = match e {
        ImportError::MissingSheets { missing, found } => {
            Some(json!({ "missing": missing, "found": found }))
        }
        ImportError::Store { phase, .. } => Some(json!({ "phase": phase })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}
