//! Reads a review workbook (roster sheets for both divisions plus the
//! schedule sheet) into plain header → value rows.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use tracing::{debug, info};

use crate::config::ImportOptions;
use crate::error::ImportError;
use crate::sheet::{clean_numeric_text, format_number, SheetRow, SheetSources, WorkbookRows};

/// Renders a cell the way the rest of the pipeline expects. Empty cells and
/// whitespace-only text give `None`.
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => clean_numeric_text(s),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(_) => return None,
        other => other.to_string().trim().to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn header_names(cells: &[Data]) -> Vec<String> {
    cells
        .iter()
        .enumerate()
        .map(|(i, c)| cell_text(c).unwrap_or_else(|| format!("col_{i}")))
        .collect()
}

/// Turns a sheet into rows keyed by its header. The header is the first
/// non-empty row at or after `header_row` (counted from the top of the sheet,
/// not from the first used cell). Fully blank rows after it are dropped.
pub fn rows_from_range(range: &Range<Data>, header_row: usize) -> Vec<SheetRow> {
    let first_used = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut headers: Option<Vec<String>> = None;
    let mut out = Vec::new();
    for (i, cells) in range.rows().enumerate() {
        if first_used + i < header_row {
            continue;
        }
        let blank = cells.iter().all(|c| cell_text(c).is_none());
        let Some(names) = headers.as_ref() else {
            if !blank {
                headers = Some(header_names(cells));
            }
            continue;
        };
        if blank {
            continue;
        }
        let mut row = SheetRow::new();
        for (name, cell) in names.iter().zip(cells) {
            if let Some(text) = cell_text(cell) {
                row.push(name.clone(), text);
            }
        }
        out.push(row);
    }
    out
}

fn matches_any(upper_name: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|k| upper_name.contains(&k.to_ascii_uppercase()))
}

/// Picks the division A, division B and schedule sheets by keyword. A sheet
/// is claimed by the first role it matches; a later sheet matching the same
/// role replaces an earlier one.
pub fn detect_sheets(names: &[String], opts: &ImportOptions) -> Result<SheetSources, ImportError> {
    let mut division_a = None;
    let mut division_b = None;
    let mut schedule = None;
    for name in names {
        let upper = name.to_ascii_uppercase();
        if matches_any(&upper, &opts.division_a_sheet_keywords) {
            division_a = Some(name.clone());
        } else if matches_any(&upper, &opts.division_b_sheet_keywords) {
            division_b = Some(name.clone());
        } else if matches_any(&upper, &opts.schedule_sheet_keywords) {
            schedule = Some(name.clone());
        }
    }
    match (division_a, division_b, schedule) {
        (Some(division_a), Some(division_b), Some(schedule)) => Ok(SheetSources {
            division_a,
            division_b,
            schedule,
        }),
        (a, b, s) => {
            let missing = [("division A", a), ("division B", b), ("schedule", s)]
                .into_iter()
                .filter(|(_, v)| v.is_none())
                .map(|(role, _)| role.to_string())
                .collect();
            Err(ImportError::MissingSheets {
                missing,
                found: names.to_vec(),
            })
        }
    }
}

pub fn read_workbook(path: &Path, opts: &ImportOptions) -> Result<WorkbookRows, ImportError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ImportError::WorkbookUnreadable(format!("{}: {e}", path.display())))?;
    let names = workbook.sheet_names().to_vec();
    debug!(sheets = ?names, "workbook opened");
    let sources = detect_sheets(&names, opts)?;
    info!(
        division_a = %sources.division_a,
        division_b = %sources.division_b,
        schedule = %sources.schedule,
        "sheets detected"
    );

    let mut read = |sheet: &str, header_row: usize| -> Result<Vec<SheetRow>, ImportError> {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|e| ImportError::WorkbookUnreadable(format!("sheet {sheet}: {e}")))?;
        Ok(rows_from_range(&range, header_row))
    };
    let division_a = read(&sources.division_a, opts.roster_header_row)?;
    let division_b = read(&sources.division_b, opts.roster_header_row)?;
    let schedule = read(&sources.schedule, opts.schedule_header_row)?;

    Ok(WorkbookRows {
        division_a,
        division_b,
        schedule,
        sources: Some(sources),
    })
}
