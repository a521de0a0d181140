//! Field maps for the five review-stage score sheets. The PDF/Word filler
//! consumes the map as-is; this module only decides names and values.

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::error::LookupError;
use crate::views::project_details;

pub const STAGES: std::ops::RangeInclusive<u8> = 1..=5;
pub const MEMBER_SLOTS: usize = 4;

/// Translates a response key from the review form into the template field
/// it fills. Keys with no rule pass through unchanged.
pub fn template_field(stage: u8, key: &str) -> String {
    let prefix = format!("{stage}.");
    if let Some(q) = key.strip_prefix("que_") {
        return if q.starts_with(&prefix) {
            format!("{q}id")
        } else {
            format!("{stage}.{q}id")
        };
    }
    if let Some(s) = key.strip_prefix("sum_") {
        return format!("{s}.s1");
    }
    if key == format!("c{stage}") {
        return format!("{stage}.c");
    }
    if stage == 4 {
        if let Some(f) = key.strip_prefix('f') {
            if f.starts_with(&prefix) {
                return f.to_string();
            }
        }
    }
    if stage == 5 {
        if let Some(k) = key.strip_prefix("final_") {
            return format!("5.{k}");
        }
        if let Some((round, k)) = key
            .strip_prefix("review")
            .and_then(|rest| rest.split_once('_'))
        {
            return format!("{round}.{k}");
        }
    }
    key.to_string()
}

/// Builds the flat field map for one group at one review stage.
pub fn form_fields(
    conn: &Connection,
    group_id: &str,
    stage: u8,
    date: &str,
    responses: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, LookupError> {
    let project = project_details(conn, group_id)?;
    let mut fields = BTreeMap::new();
    let mut put = |k: &str, v: &str| {
        fields.insert(k.to_string(), v.to_string());
    };
    put("group_id", &project.group_id);
    put("date", date);
    put("project_title", &project.project_title);
    put("guide_name", &project.guide_name);
    put("mentor_name", &project.mentor_name);
    put("mentor_email", &project.mentor_email);
    put("mentor_mobile", &project.mentor_mobile);
    put("r1_name", project.evaluator1_name.as_deref().unwrap_or(""));
    put("r2_name", project.evaluator2_name.as_deref().unwrap_or(""));

    for slot in 1..=MEMBER_SLOTS {
        let member = project.members.get(slot - 1);
        put(&format!("roll_{slot}"), member.map(|m| m.roll_no.as_str()).unwrap_or(""));
        put(
            &format!("student_{slot}"),
            member.map(|m| m.student_name.as_str()).unwrap_or(""),
        );
        put(
            &format!("contact_{slot}"),
            member.map(|m| m.contact_details.as_str()).unwrap_or(""),
        );
    }

    for (key, value) in responses {
        fields.insert(template_field(stage, key), value.clone());
    }
    Ok(fields)
}
