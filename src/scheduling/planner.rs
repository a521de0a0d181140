use serde::Serialize;
use tracing::info;

use super::reconcile::{commit_assignment, WriteMode};
use crate::config::PlannerOptions;
use crate::store::{is_assigned, NewGroup, PanelAssignment, ReviewStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReport {
    pub scheduled: usize,
    pub tracks_used: u32,
    pub failed: Vec<String>,
}

fn synthesized_panel(track: u32) -> String {
    format!(
        "Panel {track} Faculty\nProf. Guide {track}\nProf. Evaluator {track}.1\nProf. Evaluator {track}.2"
    )
}

fn keep_or(value: Option<&str>, fallback: String) -> String {
    if is_assigned(value) {
        value.map(|v| v.trim().to_string()).unwrap_or(fallback)
    } else {
        fallback
    }
}

/// Places `groups` into tracks in order, `groups_per_track` at a time,
/// starting over at track 1 after `max_tracks`.
pub fn plan_tracks(groups: &[NewGroup], opts: &PlannerOptions) -> Vec<PanelAssignment> {
    let per_track = opts.groups_per_track.max(1);
    let max_tracks = opts.max_tracks.max(1) as usize;
    groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let track = ((i / per_track) % max_tracks) as u32 + 1;
            PanelAssignment {
                group_id: g.group_id.clone(),
                track: Some(track),
                location: format!("Room {track}"),
                panel_professors: synthesized_panel(track),
                guide: Some(keep_or(Some(g.guide_name.as_str()), format!("Guide {track}"))),
                reviewer1: Some(keep_or(g.evaluator1.as_deref(), format!("Evaluator {track}.1"))),
                reviewer2: Some(keep_or(g.evaluator2.as_deref(), format!("Evaluator {track}.2"))),
                reviewer3: None,
            }
        })
        .collect()
}

/// Schedules every group that has no assignment yet (or one without a track).
pub fn generate<S: ReviewStore>(store: &S, opts: &PlannerOptions) -> anyhow::Result<GenerateReport> {
    let pending = store.find_unscheduled_groups()?;
    let mut report = GenerateReport::default();
    if pending.is_empty() {
        return Ok(report);
    }
    for row in plan_tracks(&pending, opts) {
        let track = row.track.unwrap_or(1);
        match commit_assignment(store, &row, WriteMode::Replace) {
            Ok(_) => {
                report.scheduled += 1;
                report.tracks_used = report.tracks_used.max(track);
            }
            Err(e) => {
                tracing::error!(group_id = %row.group_id, track, error = %e, "could not schedule group");
                report.failed.push(row.group_id);
            }
        }
    }
    info!(scheduled = report.scheduled, tracks = report.tracks_used, "schedule generated");
    Ok(report)
}
