use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook};

use crate::views::ProjectView;

pub const EXPORT_SHEET: &str = "Project Data";

pub const EXPORT_HEADERS: [&str; 16] = [
    "group_id",
    "division",
    "project_domain",
    "project_title",
    "sponsor_company",
    "guide_name",
    "mentor_name",
    "mentor_email",
    "mentor_mobile",
    "evaluator1_name",
    "evaluator2_name",
    "track",
    "location",
    "roll_no",
    "student_name",
    "contact_details",
];

pub fn default_export_name(now: DateTime<Local>) -> String {
    format!("project_data_{}.xlsx", now.format("%Y%m%d_%H%M%S"))
}

/// One line per member with the group's fields repeated; groups without
/// members still get a line.
fn flat_rows(projects: &[ProjectView]) -> Vec<[String; 16]> {
    let mut out = Vec::new();
    for p in projects {
        let group = |roll: &str, name: &str, contact: &str| -> [String; 16] {
            [
                p.group_id.clone(),
                p.division.clone(),
                p.project_domain.clone(),
                p.project_title.clone(),
                p.sponsor_company.clone(),
                p.guide_name.clone(),
                p.mentor_name.clone(),
                p.mentor_email.clone(),
                p.mentor_mobile.clone(),
                p.evaluator1_name.clone().unwrap_or_default(),
                p.evaluator2_name.clone().unwrap_or_default(),
                p.track.clone(),
                p.location.clone(),
                roll.to_string(),
                name.to_string(),
                contact.to_string(),
            ]
        };
        if p.members.is_empty() {
            out.push(group("", "", ""));
        }
        for m in &p.members {
            out.push(group(&m.roll_no, &m.student_name, &m.contact_details));
        }
    }
    out
}

/// Writes the project listing to `path`. Returns the number of data rows.
pub fn write_projects_xlsx(projects: &[ProjectView], path: &Path) -> anyhow::Result<usize> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    let rows = flat_rows(projects);
    for (i, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            worksheet.write_string(i as u32 + 1, col as u16, value)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(rows.len())
}
