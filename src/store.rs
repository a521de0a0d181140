use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Division {
    A,
    B,
}

impl Division {
    pub const ALL: [Division; 2] = [Division::A, Division::B];

    pub fn as_str(self) -> &'static str {
        match self {
            Division::A => "A",
            Division::B => "B",
        }
    }

    pub fn parse(s: &str) -> Option<Division> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Division::A),
            "B" => Some(Division::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewGroup {
    pub group_id: String,
    pub division: String,
    pub domain: String,
    pub title: String,
    pub sponsor: String,
    pub guide_name: String,
    pub mentor_name: String,
    pub mentor_email: String,
    pub mentor_mobile: String,
    pub evaluator1: Option<String>,
    pub evaluator2: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub group_id: String,
    pub roll_no: String,
    pub student_name: String,
    pub contact_details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelAssignment {
    pub group_id: String,
    pub track: Option<u32>,
    pub location: String,
    /// Newline-joined panel names.
    pub panel_professors: String,
    pub guide: Option<String>,
    pub reviewer1: Option<String>,
    pub reviewer2: Option<String>,
    pub reviewer3: Option<String>,
}

/// A group with at least one blank evaluator slot.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorGap {
    pub group_id: String,
    pub division: String,
    pub evaluator1: Option<String>,
    pub evaluator2: Option<String>,
}

/// An assignment row whose reviewers disagree with its group's evaluators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewerDrift {
    pub group_id: String,
    pub evaluator1: Option<String>,
    pub evaluator2: Option<String>,
    pub reviewer1: Option<String>,
    pub reviewer2: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionCoverage {
    pub division: String,
    pub total: i64,
    pub with_evaluator1: i64,
    pub with_evaluator2: i64,
    pub with_both: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCount {
    pub track: u32,
    pub groups: i64,
}

/// Non-null and non-blank after trimming.
pub fn is_assigned(v: Option<&str>) -> bool {
    v.map(|s| !s.trim().is_empty()).unwrap_or(false)
}

const ASSIGNED_E1: &str = "evaluator1_name IS NOT NULL AND TRIM(evaluator1_name) != ''";
const ASSIGNED_E2: &str = "evaluator2_name IS NOT NULL AND TRIM(evaluator2_name) != ''";

/// Commands and queries the scheduling core needs from persistent storage.
/// Every call is its own auto-committed statement unless wrapped in
/// [`ReviewStore::atomically`].
pub trait ReviewStore {
    fn clear_panel_assignments(&self) -> anyhow::Result<usize>;
    fn clear_members(&self) -> anyhow::Result<usize>;
    fn clear_groups(&self) -> anyhow::Result<usize>;

    /// Insert-if-absent. Returns whether a row was created.
    fn upsert_group(&self, group: &NewGroup) -> anyhow::Result<bool>;
    /// Insert-if-absent on (group, roll number).
    fn insert_member(&self, member: &NewMember) -> anyhow::Result<bool>;
    fn group_exists(&self, group_id: &str) -> anyhow::Result<bool>;
    fn group_evaluators(&self, group_id: &str)
        -> anyhow::Result<Option<(Option<String>, Option<String>)>>;

    /// Insert, or update everything except `reviewer3`.
    fn upsert_panel_assignment(&self, assignment: &PanelAssignment) -> anyhow::Result<()>;
    /// Insert or overwrite every column.
    fn replace_panel_assignment(&self, assignment: &PanelAssignment) -> anyhow::Result<()>;
    fn delete_panel_assignments_except(&self, keep: &[String]) -> anyhow::Result<usize>;

    fn update_group_evaluators(&self, group_id: &str, e1: &str, e2: &str)
        -> anyhow::Result<usize>;
    fn update_assignment_reviewers(
        &self,
        group_id: &str,
        r1: Option<&str>,
        r2: Option<&str>,
    ) -> anyhow::Result<usize>;

    fn find_groups_missing_evaluator(&self) -> anyhow::Result<Vec<EvaluatorGap>>;
    fn find_reviewer_drift(&self) -> anyhow::Result<Vec<ReviewerDrift>>;
    /// Groups with no assignment row or a blank track, by division then id.
    fn find_unscheduled_groups(&self) -> anyhow::Result<Vec<NewGroup>>;

    fn count_groups(&self) -> anyhow::Result<i64>;
    fn count_assignments(&self) -> anyhow::Result<i64>;
    /// Groups of `division` whose evaluator1 is assigned.
    fn count_groups_with_evaluator(&self, division: Division) -> anyhow::Result<i64>;
    fn division_coverage(&self, division: Division) -> anyhow::Result<DivisionCoverage>;
    fn track_distribution(&self) -> anyhow::Result<Vec<TrackCount>>;

    /// Runs `f` so that either all of its writes land or none do.
    fn atomically<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> anyhow::Result<T>;
}

fn opt_nonblank(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

impl ReviewStore for Connection {
    fn clear_panel_assignments(&self) -> anyhow::Result<usize> {
        Ok(self.execute("DELETE FROM panel_assignments", [])?)
    }

    fn clear_members(&self) -> anyhow::Result<usize> {
        Ok(self.execute("DELETE FROM members", [])?)
    }

    fn clear_groups(&self) -> anyhow::Result<usize> {
        Ok(self.execute("DELETE FROM projects", [])?)
    }

    fn upsert_group(&self, g: &NewGroup) -> anyhow::Result<bool> {
        let n = self
            .execute(
                "INSERT OR IGNORE INTO projects(
                    group_id, division, project_domain, project_title, sponsor_company,
                    guide_name, mentor_name, mentor_email, mentor_mobile,
                    evaluator1_name, evaluator2_name)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    g.group_id,
                    g.division,
                    g.domain,
                    g.title,
                    g.sponsor,
                    g.guide_name,
                    g.mentor_name,
                    g.mentor_email,
                    g.mentor_mobile,
                    opt_nonblank(g.evaluator1.as_deref()),
                    opt_nonblank(g.evaluator2.as_deref()),
                ],
            )
            .with_context(|| format!("insert project {}", g.group_id))?;
        Ok(n > 0)
    }

    fn insert_member(&self, m: &NewMember) -> anyhow::Result<bool> {
        let id = uuid::Uuid::new_v4().to_string();
        let n = self
            .execute(
                "INSERT OR IGNORE INTO members(id, group_id, roll_no, student_name, contact_details)
                 VALUES(?, ?, ?, ?, ?)",
                (&id, &m.group_id, &m.roll_no, &m.student_name, &m.contact_details),
            )
            .with_context(|| format!("insert member {} of {}", m.roll_no, m.group_id))?;
        Ok(n > 0)
    }

    fn group_exists(&self, group_id: &str) -> anyhow::Result<bool> {
        let v: Option<i64> = self
            .query_row(
                "SELECT 1 FROM projects WHERE group_id = ?",
                [group_id],
                |r| r.get(0),
            )
            .optional()?;
        Ok(v.is_some())
    }

    fn group_evaluators(
        &self,
        group_id: &str,
    ) -> anyhow::Result<Option<(Option<String>, Option<String>)>> {
        Ok(self
            .query_row(
                "SELECT evaluator1_name, evaluator2_name FROM projects WHERE group_id = ?",
                [group_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?)
    }

    fn upsert_panel_assignment(&self, a: &PanelAssignment) -> anyhow::Result<()> {
        self.execute(
            "INSERT INTO panel_assignments(
                group_id, track, panel_professors, location, guide, reviewer1, reviewer2, reviewer3)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(group_id) DO UPDATE SET
               track = excluded.track,
               panel_professors = excluded.panel_professors,
               location = excluded.location,
               guide = excluded.guide,
               reviewer1 = excluded.reviewer1,
               reviewer2 = excluded.reviewer2",
            params![
                a.group_id,
                a.track,
                a.panel_professors,
                a.location,
                a.guide,
                a.reviewer1,
                a.reviewer2,
                a.reviewer3,
            ],
        )
        .with_context(|| format!("upsert panel assignment {}", a.group_id))?;
        Ok(())
    }

    fn replace_panel_assignment(&self, a: &PanelAssignment) -> anyhow::Result<()> {
        self.execute(
            "INSERT OR REPLACE INTO panel_assignments(
                group_id, track, panel_professors, location, guide, reviewer1, reviewer2, reviewer3)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                a.group_id,
                a.track,
                a.panel_professors,
                a.location,
                a.guide,
                a.reviewer1,
                a.reviewer2,
                a.reviewer3,
            ],
        )
        .with_context(|| format!("replace panel assignment {}", a.group_id))?;
        Ok(())
    }

    fn delete_panel_assignments_except(&self, keep: &[String]) -> anyhow::Result<usize> {
        if keep.is_empty() {
            return self.clear_panel_assignments();
        }
        let placeholders = vec!["?"; keep.len()].join(",");
        let sql = format!(
            "DELETE FROM panel_assignments WHERE group_id NOT IN ({})",
            placeholders
        );
        Ok(self.execute(&sql, rusqlite::params_from_iter(keep.iter()))?)
    }

    fn update_group_evaluators(&self, group_id: &str, e1: &str, e2: &str) -> anyhow::Result<usize> {
        Ok(self.execute(
            "UPDATE projects SET evaluator1_name = ?, evaluator2_name = ? WHERE group_id = ?",
            (e1, e2, group_id),
        )?)
    }

    fn update_assignment_reviewers(
        &self,
        group_id: &str,
        r1: Option<&str>,
        r2: Option<&str>,
    ) -> anyhow::Result<usize> {
        Ok(self.execute(
            "UPDATE panel_assignments SET reviewer1 = ?, reviewer2 = ? WHERE group_id = ?",
            (r1, r2, group_id),
        )?)
    }

    fn find_groups_missing_evaluator(&self) -> anyhow::Result<Vec<EvaluatorGap>> {
        let sql = format!(
            "SELECT group_id, division, evaluator1_name, evaluator2_name
             FROM projects
             WHERE NOT ({ASSIGNED_E1}) OR NOT ({ASSIGNED_E2})
             ORDER BY division, group_id"
        );
        let mut stmt = self.prepare(&sql)?;
        let rows = stmt
            .query_map([], |r| {
                Ok(EvaluatorGap {
                    group_id: r.get(0)?,
                    division: r.get(1)?,
                    evaluator1: r.get(2)?,
                    evaluator2: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_reviewer_drift(&self) -> anyhow::Result<Vec<ReviewerDrift>> {
        let mut stmt = self.prepare(
            "SELECT pa.group_id, p.evaluator1_name, p.evaluator2_name, pa.reviewer1, pa.reviewer2
             FROM panel_assignments pa
             JOIN projects p ON p.group_id = pa.group_id
             WHERE (p.evaluator1_name IS NOT NULL AND TRIM(p.evaluator1_name) != ''
                    AND p.evaluator1_name IS NOT pa.reviewer1)
                OR (p.evaluator2_name IS NOT NULL AND TRIM(p.evaluator2_name) != ''
                    AND p.evaluator2_name IS NOT pa.reviewer2)
             ORDER BY pa.group_id",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(ReviewerDrift {
                    group_id: r.get(0)?,
                    evaluator1: r.get(1)?,
                    evaluator2: r.get(2)?,
                    reviewer1: r.get(3)?,
                    reviewer2: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn find_unscheduled_groups(&self) -> anyhow::Result<Vec<NewGroup>> {
        let mut stmt = self.prepare(
            "SELECT p.group_id, p.division, p.project_domain, p.project_title, p.sponsor_company,
                    p.guide_name, p.mentor_name, p.mentor_email, p.mentor_mobile,
                    p.evaluator1_name, p.evaluator2_name
             FROM projects p
             LEFT JOIN panel_assignments pa ON pa.group_id = p.group_id
             WHERE pa.group_id IS NULL OR pa.track IS NULL
             ORDER BY p.division, p.group_id",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(NewGroup {
                    group_id: r.get(0)?,
                    division: r.get(1)?,
                    domain: r.get(2)?,
                    title: r.get(3)?,
                    sponsor: r.get(4)?,
                    guide_name: r.get(5)?,
                    mentor_name: r.get(6)?,
                    mentor_email: r.get(7)?,
                    mentor_mobile: r.get(8)?,
                    evaluator1: r.get(9)?,
                    evaluator2: r.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn count_groups(&self) -> anyhow::Result<i64> {
        Ok(self.query_row("SELECT COUNT(*) FROM projects", [], |r| r.get(0))?)
    }

    fn count_assignments(&self) -> anyhow::Result<i64> {
        Ok(self.query_row("SELECT COUNT(*) FROM panel_assignments", [], |r| r.get(0))?)
    }

    fn count_groups_with_evaluator(&self, division: Division) -> anyhow::Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM projects WHERE division = ? AND {ASSIGNED_E1}");
        Ok(self.query_row(&sql, [division.as_str()], |r| r.get(0))?)
    }

    fn division_coverage(&self, division: Division) -> anyhow::Result<DivisionCoverage> {
        let sql = format!(
            "SELECT
               COUNT(*),
               COUNT(CASE WHEN {ASSIGNED_E1} THEN 1 END),
               COUNT(CASE WHEN {ASSIGNED_E2} THEN 1 END),
               COUNT(CASE WHEN ({ASSIGNED_E1}) AND ({ASSIGNED_E2}) THEN 1 END)
             FROM projects
             WHERE division = ?"
        );
        Ok(self.query_row(&sql, [division.as_str()], |r| {
            Ok(DivisionCoverage {
                division: division.as_str().to_string(),
                total: r.get(0)?,
                with_evaluator1: r.get(1)?,
                with_evaluator2: r.get(2)?,
                with_both: r.get(3)?,
            })
        })?)
    }

    fn track_distribution(&self) -> anyhow::Result<Vec<TrackCount>> {
        let mut stmt = self.prepare(
            "SELECT track, COUNT(*) FROM panel_assignments
             WHERE track IS NOT NULL
             GROUP BY track
             ORDER BY track",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(TrackCount {
                    track: r.get(0)?,
                    groups: r.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn atomically<T, F>(&self, f: F) -> anyhow::Result<T>
    where
        Self: Sized,
        F: FnOnce(&Self) -> anyhow::Result<T>,
    {
        // Savepoints nest, so this also works inside an outer transaction.
        self.execute_batch("SAVEPOINT reviewd_write")?;
        match f(self) {
            Ok(v) => {
                self.execute_batch("RELEASE reviewd_write")?;
                Ok(v)
            }
            Err(e) => {
                let _ = self.execute_batch("ROLLBACK TO reviewd_write; RELEASE reviewd_write");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn group(id: &str, division: &str) -> NewGroup {
        NewGroup {
            group_id: id.into(),
            division: division.into(),
            ..Default::default()
        }
    }

    #[test]
    fn upsert_group_ignores_duplicates() {
        let conn = db::open_in_memory().expect("db");
        assert!(conn.upsert_group(&group("BIA-01", "A")).expect("insert"));
        assert!(!conn.upsert_group(&group("BIA-01", "A")).expect("dup"));
        assert_eq!(conn.count_groups().expect("count"), 1);
    }

    #[test]
    fn blank_evaluators_are_stored_as_null() {
        let conn = db::open_in_memory().expect("db");
        let mut g = group("BIA-01", "A");
        g.evaluator1 = Some("  ".into());
        g.evaluator2 = Some("Dr. Rao".into());
        conn.upsert_group(&g).expect("insert");
        let (e1, e2) = conn
            .group_evaluators("BIA-01")
            .expect("query")
            .expect("present");
        assert_eq!(e1, None);
        assert_eq!(e2.as_deref(), Some("Dr. Rao"));
        assert_eq!(conn.find_groups_missing_evaluator().expect("gaps").len(), 1);
    }

    #[test]
    fn members_are_unique_per_roll_number() {
        let conn = db::open_in_memory().expect("db");
        conn.upsert_group(&group("BIB-02", "B")).expect("group");
        let m = NewMember {
            group_id: "BIB-02".into(),
            roll_no: "101".into(),
            student_name: "Asha".into(),
            contact_details: String::new(),
        };
        assert!(conn.insert_member(&m).expect("insert"));
        assert!(!conn.insert_member(&m).expect("dup"));
    }

    #[test]
    fn members_need_an_existing_group() {
        let conn = db::open_in_memory().expect("db");
        let m = NewMember {
            group_id: "BIB-09".into(),
            roll_no: "7".into(),
            student_name: "Ravi".into(),
            contact_details: String::new(),
        };
        assert!(conn.insert_member(&m).is_err());
    }

    #[test]
    fn upsert_assignment_keeps_reviewer3() {
        let conn = db::open_in_memory().expect("db");
        let mut a = PanelAssignment {
            group_id: "BIA-01".into(),
            track: Some(1),
            reviewer3: Some("External".into()),
            ..Default::default()
        };
        conn.replace_panel_assignment(&a).expect("replace");
        a.track = Some(2);
        a.reviewer3 = None;
        conn.upsert_panel_assignment(&a).expect("upsert");
        let (track, r3): (u32, Option<String>) = conn
            .query_row(
                "SELECT track, reviewer3 FROM panel_assignments WHERE group_id = 'BIA-01'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .expect("row");
        assert_eq!(track, 2);
        assert_eq!(r3.as_deref(), Some("External"));
    }

    #[test]
    fn failed_atomic_block_leaves_no_writes() {
        let conn = db::open_in_memory().expect("db");
        let res: anyhow::Result<()> = conn.atomically(|s| {
            s.upsert_group(&group("BIA-01", "A"))?;
            anyhow::bail!("boom")
        });
        assert!(res.is_err());
        assert_eq!(conn.count_groups().expect("count"), 0);
    }

    #[test]
    fn coverage_counts_only_nonblank_names() {
        let conn = db::open_in_memory().expect("db");
        let mut g1 = group("BIA-01", "A");
        g1.evaluator1 = Some("X".into());
        g1.evaluator2 = Some("Y".into());
        let mut g2 = group("BIA-02", "A");
        g2.evaluator1 = Some("X".into());
        conn.upsert_group(&g1).expect("g1");
        conn.upsert_group(&g2).expect("g2");
        conn.upsert_group(&group("BIB-01", "B")).expect("g3");
        let a = conn.division_coverage(Division::A).expect("cov");
        assert_eq!((a.total, a.with_evaluator1, a.with_evaluator2, a.with_both), (2, 2, 1, 1));
        assert_eq!(conn.count_groups_with_evaluator(Division::B).expect("b"), 0);
    }
}
