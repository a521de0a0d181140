//! Keeps `projects.evaluator{1,2}_name` and `panel_assignments.reviewer{1,2}`
//! in agreement. Every write to either pair goes through this module.

use serde::Serialize;
use tracing::{error, info, warn};

use super::extract::TrackRow;
use super::rotation::Assignment;
use crate::store::{is_assigned, PanelAssignment, ReviewStore};

pub fn default_evaluator(division: &str, slot: u8) -> String {
    format!("Default Evaluator {}.{}", division.trim(), slot)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Update an existing row but leave `reviewer3` alone.
    Upsert,
    /// Overwrite the whole row.
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// False when the assignment names a group the store does not know.
    pub group_known: bool,
}

/// Sets both evaluator slots on the group and mirrors them onto its
/// assignment row, if one exists.
pub fn write_evaluators<S: ReviewStore>(
    store: &S,
    group_id: &str,
    evaluator1: &str,
    evaluator2: &str,
) -> anyhow::Result<bool> {
    store.atomically(|s| {
        let n = s.update_group_evaluators(group_id, evaluator1, evaluator2)?;
        s.update_assignment_reviewers(group_id, Some(evaluator1), Some(evaluator2))?;
        Ok(n > 0)
    })
}

/// Writes an assignment row, then copies its non-blank reviewers onto the
/// group. A blank reviewer leaves the group's current evaluator in place and
/// the row is back-filled from it.
pub fn commit_assignment<S: ReviewStore>(
    store: &S,
    assignment: &PanelAssignment,
    mode: WriteMode,
) -> anyhow::Result<Applied> {
    store.atomically(|s| {
        match mode {
            WriteMode::Upsert => s.upsert_panel_assignment(assignment)?,
            WriteMode::Replace => s.replace_panel_assignment(assignment)?,
        }
        let Some((cur1, cur2)) = s.group_evaluators(&assignment.group_id)? else {
            return Ok(Applied { group_known: false });
        };
        let pick = |reviewer: Option<&str>, current: Option<String>| -> Option<String> {
            if is_assigned(reviewer) {
                reviewer.map(|r| r.trim().to_string())
            } else {
                current.filter(|c| is_assigned(Some(c.as_str())))
            }
        };
        let e1 = pick(assignment.reviewer1.as_deref(), cur1);
        let e2 = pick(assignment.reviewer2.as_deref(), cur2);
        if e1.is_some() || e2.is_some() {
            write_evaluators(
                s,
                &assignment.group_id,
                e1.as_deref().unwrap_or(""),
                e2.as_deref().unwrap_or(""),
            )?;
        }
        Ok(Applied { group_known: true })
    })
}

/// Persists one rotation result for the track it came from.
pub fn apply<S: ReviewStore>(
    store: &S,
    track: &TrackRow,
    assignment: &Assignment,
) -> anyhow::Result<Applied> {
    let row = PanelAssignment {
        group_id: assignment.group_id.clone(),
        track: Some(track.track),
        location: track.location.clone(),
        panel_professors: track.panel_professors.join("\n"),
        guide: Some(assignment.guide.clone()),
        reviewer1: Some(assignment.evaluator1.clone()),
        reviewer2: Some(assignment.evaluator2.clone()),
        reviewer3: None,
    };
    commit_assignment(store, &row, WriteMode::Upsert)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub repaired: Vec<String>,
    pub failed: Vec<String>,
}

/// Fills every blank evaluator slot with the division placeholder.
pub fn sweep<S: ReviewStore>(store: &S) -> anyhow::Result<SweepReport> {
    let gaps = store.find_groups_missing_evaluator()?;
    let mut report = SweepReport::default();
    if gaps.is_empty() {
        return Ok(report);
    }
    warn!(count = gaps.len(), "groups without evaluators; assigning placeholders");

    for gap in gaps {
        let e1 = gap
            .evaluator1
            .filter(|v| is_assigned(Some(v.as_str())))
            .unwrap_or_else(|| default_evaluator(&gap.division, 1));
        let e2 = gap
            .evaluator2
            .filter(|v| is_assigned(Some(v.as_str())))
            .unwrap_or_else(|| default_evaluator(&gap.division, 2));
        match write_evaluators(store, &gap.group_id, &e1, &e2) {
            Ok(_) => {
                warn!(group_id = %gap.group_id, division = %gap.division, "placeholder evaluators assigned");
                report.repaired.push(gap.group_id);
            }
            Err(e) => {
                error!(group_id = %gap.group_id, error = %e, "placeholder assignment failed");
                report.failed.push(gap.group_id);
            }
        }
    }
    Ok(report)
}

/// Copies non-blank group evaluators onto assignment rows that disagree.
/// Returns the number of assignment rows changed.
pub fn sync<S: ReviewStore>(store: &S) -> anyhow::Result<usize> {
    let drift = store.find_reviewer_drift()?;
    let mut updated = 0usize;
    for d in drift {
        let r1 = if is_assigned(d.evaluator1.as_deref()) {
            d.evaluator1.as_deref()
        } else {
            d.reviewer1.as_deref()
        };
        let r2 = if is_assigned(d.evaluator2.as_deref()) {
            d.evaluator2.as_deref()
        } else {
            d.reviewer2.as_deref()
        };
        updated += store.update_assignment_reviewers(&d.group_id, r1, r2)?;
    }
    if updated > 0 {
        info!(rows = updated, "assignment reviewers synced from groups");
    }
    Ok(updated)
}
