//! Read models served to the UI: the project listing, single-project
//! details, the schedule board and the evaluator coverage report.

use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::LookupError;
use crate::store::{is_assigned, Division, DivisionCoverage, ReviewStore, ReviewerDrift};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub roll_no: String,
    pub student_name: String,
    pub contact_details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub group_id: String,
    pub division: String,
    pub project_domain: String,
    pub project_title: String,
    pub sponsor_company: String,
    pub guide_name: String,
    pub mentor_name: String,
    pub mentor_email: String,
    pub mentor_mobile: String,
    pub evaluator1_name: Option<String>,
    pub evaluator2_name: Option<String>,
    /// Track number as text, or `Unassigned`.
    pub track: String,
    pub location: String,
    pub has_evaluator1: bool,
    pub has_evaluator2: bool,
    pub members: Vec<MemberView>,
}

const PROJECT_COLUMNS: &str = "p.group_id, p.division, p.project_domain, p.project_title,
    p.sponsor_company, p.guide_name, p.mentor_name, p.mentor_email, p.mentor_mobile,
    p.evaluator1_name, p.evaluator2_name, pa.track, COALESCE(pa.location, '')";

fn project_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectView> {
    let evaluator1_name: Option<String> = r.get(9)?;
    let evaluator2_name: Option<String> = r.get(10)?;
    let track: Option<i64> = r.get(11)?;
    Ok(ProjectView {
        group_id: r.get(0)?,
        division: r.get(1)?,
        project_domain: r.get(2)?,
        project_title: r.get(3)?,
        sponsor_company: r.get(4)?,
        guide_name: r.get(5)?,
        mentor_name: r.get(6)?,
        mentor_email: r.get(7)?,
        mentor_mobile: r.get(8)?,
        has_evaluator1: is_assigned(evaluator1_name.as_deref()),
        has_evaluator2: is_assigned(evaluator2_name.as_deref()),
        evaluator1_name,
        evaluator2_name,
        track: track
            .map(|t| t.to_string())
            .unwrap_or_else(|| "Unassigned".to_string()),
        location: r.get(12)?,
        members: Vec::new(),
    })
}

fn members_of(conn: &Connection, group_id: &str) -> rusqlite::Result<Vec<MemberView>> {
    let mut stmt = conn.prepare(
        "SELECT roll_no, student_name, contact_details
         FROM members
         WHERE group_id = ?
         ORDER BY roll_no",
    )?;
    let rows = stmt
        .query_map([group_id], |r| {
            Ok(MemberView {
                roll_no: r.get(0)?,
                student_name: r.get(1)?,
                contact_details: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every group with its members, scheduled tracks first.
pub fn list_projects(conn: &Connection) -> anyhow::Result<Vec<ProjectView>> {
    let sql = format!(
        "SELECT {PROJECT_COLUMNS}
         FROM projects p
         LEFT JOIN panel_assignments pa ON pa.group_id = p.group_id
         ORDER BY CASE WHEN pa.track IS NULL THEN 1 ELSE 0 END, pa.track, p.division, p.group_id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut projects = stmt
        .query_map([], project_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    for p in &mut projects {
        p.members = members_of(conn, &p.group_id)?;
    }
    Ok(projects)
}

pub fn project_details(conn: &Connection, group_id: &str) -> Result<ProjectView, LookupError> {
    let sql = format!(
        "SELECT {PROJECT_COLUMNS}
         FROM projects p
         LEFT JOIN panel_assignments pa ON pa.group_id = p.group_id
         WHERE p.group_id = ?"
    );
    let found = conn
        .query_row(&sql, [group_id], project_from_row)
        .optional()
        .map_err(anyhow::Error::from)?;
    let Some(mut project) = found else {
        return Err(LookupError::NotFound(group_id.to_string()));
    };
    project.members = members_of(conn, group_id).map_err(anyhow::Error::from)?;
    Ok(project)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluatorStatus {
    Complete,
    Partial,
    Missing,
}

impl EvaluatorStatus {
    pub fn of(e1: Option<&str>, e2: Option<&str>) -> Self {
        match (is_assigned(e1), is_assigned(e2)) {
            (true, true) => EvaluatorStatus::Complete,
            (false, false) => EvaluatorStatus::Missing,
            _ => EvaluatorStatus::Partial,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub group_id: String,
    pub division: String,
    pub project_title: String,
    pub guide_name: String,
    pub evaluator1_name: Option<String>,
    pub evaluator2_name: Option<String>,
    pub track: Option<u32>,
    pub panel_professors: String,
    pub location: String,
    pub assigned_guide: String,
    pub reviewer1: Option<String>,
    pub reviewer2: Option<String>,
    pub reviewer3: Option<String>,
    pub evaluator_status: EvaluatorStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStats {
    pub total_groups: usize,
    pub total_tracks: usize,
    pub scheduled_groups: usize,
    pub with_evaluator1: usize,
    pub with_evaluator2: usize,
    pub with_both: usize,
}

fn first_assigned(candidates: [Option<&str>; 2], fallback: &str) -> String {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

pub fn schedule_board(conn: &Connection) -> anyhow::Result<(Vec<ScheduleEntry>, ScheduleStats)> {
    let mut stmt = conn.prepare(
        "SELECT p.group_id, p.division, p.project_title, p.guide_name,
                p.evaluator1_name, p.evaluator2_name,
                pa.track, pa.panel_professors, pa.location, pa.guide,
                pa.reviewer1, pa.reviewer2, pa.reviewer3
         FROM projects p
         LEFT JOIN panel_assignments pa ON pa.group_id = p.group_id
         ORDER BY CASE WHEN pa.track IS NULL THEN 1 ELSE 0 END, pa.track, p.division, p.group_id",
    )?;
    let entries = stmt
        .query_map([], |r| {
            let guide_name: String = r.get(3)?;
            let evaluator1_name: Option<String> = r.get(4)?;
            let evaluator2_name: Option<String> = r.get(5)?;
            let location: Option<String> = r.get(8)?;
            let assignment_guide: Option<String> = r.get(9)?;
            Ok(ScheduleEntry {
                group_id: r.get(0)?,
                division: r.get(1)?,
                project_title: r.get(2)?,
                evaluator_status: EvaluatorStatus::of(
                    evaluator1_name.as_deref(),
                    evaluator2_name.as_deref(),
                ),
                assigned_guide: first_assigned(
                    [assignment_guide.as_deref(), Some(guide_name.as_str())],
                    "TBD",
                ),
                guide_name,
                evaluator1_name,
                evaluator2_name,
                track: r.get(6)?,
                panel_professors: r.get::<_, Option<String>>(7)?.unwrap_or_default(),
                location: first_assigned([location.as_deref(), None], "TBD"),
                reviewer1: r.get(10)?,
                reviewer2: r.get(11)?,
                reviewer3: r.get(12)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let tracks: BTreeSet<u32> = entries.iter().filter_map(|e| e.track).collect();
    let stats = ScheduleStats {
        total_groups: entries.len(),
        total_tracks: tracks.len(),
        scheduled_groups: entries.iter().filter(|e| e.track.is_some()).count(),
        with_evaluator1: entries
            .iter()
            .filter(|e| is_assigned(e.evaluator1_name.as_deref()))
            .count(),
        with_evaluator2: entries
            .iter()
            .filter(|e| is_assigned(e.evaluator2_name.as_deref()))
            .count(),
        with_both: entries
            .iter()
            .filter(|e| e.evaluator_status == EvaluatorStatus::Complete)
            .count(),
    };
    Ok((entries, stats))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub divisions: Vec<DivisionCoverage>,
    pub drift: Vec<ReviewerDrift>,
}

pub fn coverage_report<S: ReviewStore>(store: &S) -> anyhow::Result<CoverageReport> {
    let divisions = Division::ALL
        .into_iter()
        .map(|d| store.division_coverage(d))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CoverageReport {
        divisions,
        drift: store.find_reviewer_drift()?,
    })
}
