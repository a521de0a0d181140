//! One full-replace import run: clear the store, fold both rosters into
//! groups and members, rotate evaluators over every schedule row, then sweep
//! and count.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::extract::{extract_track_row, RowSkip};
use super::reconcile;
use super::roster::{fold_roster, RosterPlan, RowIssue};
use super::rotation::assign_evaluators;
use crate::config::ImportOptions;
use crate::error::ImportError;
use crate::sheet::{SheetSources, WorkbookRows};
use crate::store::{Division, ReviewStore, TrackCount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportPhase {
    Start,
    ClearStore,
    IngestRoster,
    IngestSchedule,
    Sweep,
    Verify,
    Done,
    Failed,
}

impl std::fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ImportPhase::Start => "start",
            ImportPhase::ClearStore => "clear_store",
            ImportPhase::IngestRoster => "ingest_roster",
            ImportPhase::IngestSchedule => "ingest_schedule",
            ImportPhase::Sweep => "sweep",
            ImportPhase::Verify => "verify",
            ImportPhase::Done => "done",
            ImportPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterStats {
    pub division: String,
    pub groups: usize,
    pub members: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub groups_imported: i64,
    pub assignments_imported: i64,
    /// Division letter → groups with an evaluator1.
    pub per_division_evaluator_coverage: BTreeMap<String, i64>,
    pub track_distribution: Vec<TrackCount>,
    pub rosters: Vec<RosterStats>,
    pub schedule_rows_processed: usize,
    pub scheduled_groups: usize,
    /// Assignment rows written for groups the rosters never listed.
    pub orphan_assignments: usize,
    pub rows_skipped: usize,
    pub skipped: Vec<RowIssue>,
    /// Roster groups or members the store refused.
    pub write_failures: Vec<String>,
    pub assignment_failures: Vec<String>,
    pub sweep_repairs: Vec<String>,
    pub phases: Vec<ImportPhase>,
    pub sources: Option<SheetSources>,
}

/// Mutable state of a run in progress.
struct ImportRun<'a, S> {
    store: &'a S,
    rows: &'a WorkbookRows,
    opts: &'a ImportOptions,
    run_id: String,
    summary: ImportSummary,
    scheduled: BTreeSet<String>,
}

impl<'a, S: ReviewStore> ImportRun<'a, S> {
    fn new(store: &'a S, rows: &'a WorkbookRows, opts: &'a ImportOptions) -> Self {
        let run_id = Uuid::new_v4().to_string();
        let summary = ImportSummary {
            run_id: run_id.clone(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: String::new(),
            groups_imported: 0,
            assignments_imported: 0,
            per_division_evaluator_coverage: BTreeMap::new(),
            track_distribution: Vec::new(),
            rosters: Vec::new(),
            schedule_rows_processed: 0,
            scheduled_groups: 0,
            orphan_assignments: 0,
            rows_skipped: 0,
            skipped: Vec::new(),
            write_failures: Vec::new(),
            assignment_failures: Vec::new(),
            sweep_repairs: Vec::new(),
            phases: Vec::new(),
            sources: rows.sources.clone(),
        };
        Self {
            store,
            rows,
            opts,
            run_id,
            summary,
            scheduled: BTreeSet::new(),
        }
    }

    /// Runs one phase and returns the phase to enter next.
    fn step(&mut self, phase: ImportPhase) -> Result<ImportPhase, ImportError> {
        match phase {
            ImportPhase::Start => {
                let r = self.rows;
                if r.division_a.is_empty() && r.division_b.is_empty() && r.schedule.is_empty() {
                    return Err(ImportError::NoRows);
                }
                Ok(ImportPhase::ClearStore)
            }
            ImportPhase::ClearStore => {
                self.clear_store().map_err(|e| ImportError::store(phase, e))?;
                Ok(ImportPhase::IngestRoster)
            }
            ImportPhase::IngestRoster => {
                let plans = [
                    fold_roster(&self.rows.division_a, Division::A, self.opts),
                    fold_roster(&self.rows.division_b, Division::B, self.opts),
                ];
                for plan in plans {
                    self.persist_roster(plan);
                }
                Ok(ImportPhase::IngestSchedule)
            }
            ImportPhase::IngestSchedule => {
                self.ingest_schedule();
                Ok(ImportPhase::Sweep)
            }
            ImportPhase::Sweep => {
                let report = reconcile::sweep(self.store).map_err(|e| ImportError::store(phase, e))?;
                self.summary.sweep_repairs = report.repaired;
                self.summary.write_failures.extend(
                    report.failed.into_iter().map(|g| format!("{g}: placeholder evaluators")),
                );
                Ok(ImportPhase::Verify)
            }
            ImportPhase::Verify => {
                self.verify().map_err(|e| ImportError::store(phase, e))?;
                Ok(ImportPhase::Done)
            }
            ImportPhase::Done | ImportPhase::Failed => Ok(phase),
        }
    }

    fn clear_store(&self) -> anyhow::Result<()> {
        self.store.atomically(|s| {
            let assignments = s.clear_panel_assignments()?;
            let members = s.clear_members()?;
            let groups = s.clear_groups()?;
            info!(run_id = %self.run_id, assignments, members, groups, "store cleared");
            Ok(())
        })
    }

    fn persist_roster(&mut self, plan: RosterPlan) {
        let RosterPlan {
            division,
            groups,
            members,
            issues,
        } = plan;
        let mut stats = RosterStats {
            division: division.as_str().to_string(),
            ..Default::default()
        };
        for group in &groups {
            match self.store.upsert_group(group) {
                Ok(true) => stats.groups += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(run_id = %self.run_id, group_id = %group.group_id, error = %e, "group not stored");
                    self.summary.write_failures.push(format!("{}: {e:#}", group.group_id));
                }
            }
        }
        for member in &members {
            match self.store.insert_member(member) {
                Ok(true) => stats.members += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        run_id = %self.run_id,
                        group_id = %member.group_id,
                        roll_no = %member.roll_no,
                        error = %e,
                        "member not stored"
                    );
                    self.summary
                        .write_failures
                        .push(format!("{}/{}: {e:#}", member.group_id, member.roll_no));
                }
            }
        }
        info!(
            run_id = %self.run_id,
            %division,
            groups = stats.groups,
            members = stats.members,
            skipped = issues.len(),
            "roster ingested"
        );
        self.summary.rows_skipped += issues.len();
        self.summary.skipped.extend(issues);
        self.summary.rosters.push(stats);
    }

    fn ingest_schedule(&mut self) {
        for (idx, row) in self.rows.schedule.iter().enumerate() {
            let track = match extract_track_row(row, self.opts) {
                Ok(track) => track,
                Err(RowSkip::Blank) => continue,
                Err(skip) => {
                    warn!(run_id = %self.run_id, row = idx, reason = %skip, "schedule row skipped");
                    self.summary.rows_skipped += 1;
                    self.summary.skipped.push(RowIssue {
                        sheet: "schedule".into(),
                        row: idx,
                        reason: skip.to_string(),
                    });
                    continue;
                }
            };
            self.summary.schedule_rows_processed += 1;
            info!(
                run_id = %self.run_id,
                track = track.track,
                groups = track.group_ids.len(),
                panel = track.panel_professors.len(),
                "scheduling track"
            );
            for assignment in assign_evaluators(&track.panel_professors, &track.group_ids) {
                match reconcile::apply(self.store, &track, &assignment) {
                    Ok(applied) => {
                        if !applied.group_known {
                            warn!(group_id = %assignment.group_id, track = track.track, "scheduled group is not on any roster");
                            self.summary.orphan_assignments += 1;
                        }
                        self.scheduled.insert(assignment.group_id);
                    }
                    Err(e) => {
                        error!(
                            run_id = %self.run_id,
                            group_id = %assignment.group_id,
                            track = track.track,
                            error = %e,
                            "assignment failed"
                        );
                        self.summary.assignment_failures.push(assignment.group_id);
                    }
                }
            }
        }
        self.summary.scheduled_groups = self.scheduled.len();
    }

    fn verify(&mut self) -> anyhow::Result<()> {
        self.summary.groups_imported = self.store.count_groups()?;
        self.summary.assignments_imported = self.store.count_assignments()?;
        for division in Division::ALL {
            let n = self.store.count_groups_with_evaluator(division)?;
            self.summary
                .per_division_evaluator_coverage
                .insert(division.as_str().to_string(), n);
        }
        self.summary.track_distribution = self.store.track_distribution()?;
        let gaps = self.store.find_groups_missing_evaluator()?;
        if !gaps.is_empty() {
            warn!(run_id = %self.run_id, count = gaps.len(), "groups still missing evaluators after sweep");
        }
        Ok(())
    }
}

/// Replaces the store's contents with `rows`. Fails only on structural
/// problems; everything row-level lands in the summary.
pub fn run_import<S: ReviewStore>(
    store: &S,
    rows: &WorkbookRows,
    opts: &ImportOptions,
) -> Result<ImportSummary, ImportError> {
    let mut run = ImportRun::new(store, rows, opts);
    info!(run_id = %run.run_id, "import started");
    let mut phase = ImportPhase::Start;
    while phase != ImportPhase::Done {
        run.summary.phases.push(phase);
        phase = match run.step(phase) {
            Ok(next) => next,
            Err(e) => {
                run.summary.phases.push(ImportPhase::Failed);
                error!(run_id = %run.run_id, %phase, error = %e, "import failed");
                return Err(e);
            }
        };
    }
    run.summary.phases.push(ImportPhase::Done);
    run.summary.finished_at = Utc::now().to_rfc3339();
    info!(
        run_id = %run.run_id,
        groups = run.summary.groups_imported,
        assignments = run.summary.assignments_imported,
        skipped = run.summary.rows_skipped,
        "import finished"
    );
    Ok(run.summary)
}
