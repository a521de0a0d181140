use serde::Serialize;
use tracing::warn;

use super::ident;
use crate::config::ImportOptions;
use crate::sheet::{clean_numeric_text, SheetRow};
use crate::store::{Division, NewGroup, NewMember};

/// A roster or schedule row that was dropped, with its position on the sheet
/// (zero-based, counted from the first data row).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    pub sheet: String,
    pub row: usize,
    pub reason: String,
}

/// Groups and members read off one division sheet, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterPlan {
    pub division: Division,
    pub groups: Vec<NewGroup>,
    pub members: Vec<NewMember>,
    pub issues: Vec<RowIssue>,
}

/// Fold state: the group that member-only rows attach to, plus everything
/// collected so far.
#[derive(Debug, Clone)]
struct RosterAcc {
    current_group: Option<String>,
    plan: RosterPlan,
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.trim().chars().take(max_chars).collect()
}

fn sheet_label(division: Division) -> String {
    format!("division{}", division.as_str())
}

impl RosterAcc {
    fn new(division: Division) -> Self {
        Self {
            current_group: None,
            plan: RosterPlan {
                division,
                groups: Vec::new(),
                members: Vec::new(),
                issues: Vec::new(),
            },
        }
    }

    fn issue(&mut self, row: usize, reason: String) {
        warn!(sheet = %sheet_label(self.plan.division), row, %reason, "roster row skipped");
        self.plan.issues.push(RowIssue {
            sheet: sheet_label(self.plan.division),
            row,
            reason,
        });
    }

    fn step(mut self, idx: usize, row: &SheetRow, opts: &ImportOptions) -> Self {
        if row.is_blank() {
            return self;
        }
        let cols = &opts.columns;
        let division = self.plan.division;

        if let Some(marker) = row.get_any(&cols.group_no) {
            match ident::normalize_group_id(marker) {
                Some(group_id) => {
                    if ident::division_of(&group_id) != division.as_str().chars().next() {
                        warn!(%group_id, %division, "group id prefix does not match its sheet");
                    }
                    if !self.plan.groups.iter().any(|g| g.group_id == group_id) {
                        let text = |names: &[String], max: usize| {
                            row.get_any(names).map(|v| truncate(v, max)).unwrap_or_default()
                        };
                        self.plan.groups.push(NewGroup {
                            group_id: group_id.clone(),
                            division: division.as_str().to_string(),
                            domain: text(&cols.domain, 255),
                            title: text(&cols.title, 500),
                            sponsor: text(&cols.sponsor, 255),
                            guide_name: text(&cols.guide, 100),
                            mentor_name: text(&cols.mentor_name, 100),
                            mentor_email: text(&cols.mentor_email, 255),
                            mentor_mobile: row
                                .get_any(&cols.mentor_mobile)
                                .map(clean_numeric_text)
                                .unwrap_or_default(),
                            evaluator1: None,
                            evaluator2: None,
                        });
                    }
                    self.current_group = Some(group_id);
                }
                None => {
                    self.current_group = None;
                    self.issue(idx, format!("unrecognized group id {marker:?}"));
                    return self;
                }
            }
        }

        let roll_no = row.get_any(&cols.roll_no).map(clean_numeric_text);
        let student_name = row.get_any(&cols.student_name).map(|v| truncate(v, 100));
        let (Some(roll_no), Some(student_name)) = (roll_no, student_name) else {
            return self;
        };
        let Some(group_id) = self.current_group.clone() else {
            self.issue(idx, format!("member {roll_no} appears before any group"));
            return self;
        };
        self.plan.members.push(NewMember {
            group_id,
            roll_no,
            student_name,
            contact_details: row
                .get_any(&cols.contact)
                .map(clean_numeric_text)
                .unwrap_or_default(),
        });
        self
    }
}

/// Reads a division sheet top to bottom. A row carrying a group marker opens
/// that group; rows after it without a marker add members to it.
pub fn fold_roster(rows: &[SheetRow], division: Division, opts: &ImportOptions) -> RosterPlan {
    rows.iter()
        .enumerate()
        .fold(RosterAcc::new(division), |acc, (idx, row)| {
            acc.step(idx, row, opts)
        })
        .plan
}
