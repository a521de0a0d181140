use std::collections::BTreeSet;

use serde::Serialize;

use super::ident;
use crate::config::ImportOptions;
use crate::sheet::{header_key, SheetRow};

/// Normalized view of one schedule row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRow {
    pub track: u32,
    pub location: String,
    /// Sorted, deduplicated canonical ids.
    pub group_ids: Vec<String>,
    /// Extraction order; never empty.
    pub panel_professors: Vec<String>,
}

/// Why a schedule row produced nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSkip {
    Blank,
    MissingTrack,
    InvalidTrack(String),
    NoGroups { track: u32 },
}

impl std::fmt::Display for RowSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowSkip::Blank => write!(f, "blank row"),
            RowSkip::MissingTrack => write!(f, "no track number"),
            RowSkip::InvalidTrack(raw) => write!(f, "track is not a positive number: {raw:?}"),
            RowSkip::NoGroups { track } => write!(f, "no group ids found for track {track}"),
        }
    }
}

/// Accepts `3`, `3.0`, `Track 3`.
pub fn parse_track(raw: &str) -> Option<u32> {
    let t = raw.trim();
    let t = t
        .strip_prefix("Track")
        .or_else(|| t.strip_prefix("TRACK"))
        .or_else(|| t.strip_prefix("track"))
        .unwrap_or(t)
        .trim();
    let t = t.strip_suffix(".0").unwrap_or(t);
    match t.parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

/// Names listed in a panel cell, split on newlines and commas, first
/// occurrence kept. Tokens of fewer than four characters or made only of
/// digits are dropped.
pub fn extract_panel_professors(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.split(['\n', '\r', ','])
        .map(str::trim)
        .filter(|p| p.chars().count() > 3)
        .filter(|p| !p.chars().all(|c| c.is_ascii_digit()))
        .filter(|p| seen.insert(p.to_string()))
        .map(str::to_string)
        .collect()
}

pub fn placeholder_panel(track: u32) -> Vec<String> {
    (1..=3)
        .map(|n| format!("Default Panel {track} Prof {n}"))
        .collect()
}

/// Every canonical id found in the row's cells, skipping non-data columns.
pub fn extract_group_ids(row: &SheetRow, non_data_columns: &[String]) -> Vec<String> {
    let skip: Vec<String> = non_data_columns.iter().map(|c| header_key(c)).collect();
    let mut found = BTreeSet::new();
    for (column, value) in row.cells() {
        if skip.contains(&header_key(column)) {
            continue;
        }
        found.extend(ident::find_group_ids(value));
    }
    found.into_iter().collect()
}

pub fn extract_track_row(row: &SheetRow, opts: &ImportOptions) -> Result<TrackRow, RowSkip> {
    if row.is_blank() {
        return Err(RowSkip::Blank);
    }
    let cols = &opts.columns;
    let Some(raw_track) = row.get_any(&cols.track) else {
        return Err(RowSkip::MissingTrack);
    };
    let track = parse_track(raw_track).ok_or_else(|| RowSkip::InvalidTrack(raw_track.into()))?;

    let mut panel_professors = row
        .get_any(&cols.panel)
        .map(extract_panel_professors)
        .unwrap_or_default();
    if panel_professors.is_empty() {
        panel_professors = placeholder_panel(track);
    }

    let location = row
        .get_any(&cols.location)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Room {track}"));

    let group_ids = extract_group_ids(row, &opts.non_data_columns());
    if group_ids.is_empty() {
        return Err(RowSkip::NoGroups { track });
    }

    Ok(TrackRow {
        track,
        location,
        group_ids,
        panel_professors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ImportOptions {
        ImportOptions::default()
    }

    #[test]
    fn free_text_cells_yield_sorted_ids() {
        let row = SheetRow::new()
            .with("Track", "3")
            .with("Groups", "Room 3, BIB- 07 and BIA01 present")
            .with("Time", "10:30");
        let ids = extract_group_ids(&row, &opts().non_data_columns());
        assert_eq!(ids, vec!["BIA-01", "BIB-07"]);
    }

    #[test]
    fn non_data_columns_are_not_scanned() {
        let row = SheetRow::new()
            .with("Track", "1")
            .with("Location", "Lab BIA 9")
            .with("Name of the Panel", "Prof BIB 4")
            .with("Slot 1", "bia-2, BIA-02");
        let ids = extract_group_ids(&row, &opts().non_data_columns());
        assert_eq!(ids, vec!["BIA-02"]);
    }

    #[test]
    fn short_panel_header_is_not_scanned() {
        let row = SheetRow::new()
            .with("Track", "2")
            .with("Panel", "Prof BIB 4\nDr. Rao")
            .with("Slot 1", "BIA-06");
        let tr = extract_track_row(&row, &opts()).expect("row");
        assert_eq!(tr.group_ids, vec!["BIA-06"]);
        assert_eq!(tr.panel_professors, vec!["Prof BIB 4", "Dr. Rao"]);
    }

    #[test]
    fn panel_cell_is_split_and_filtered() {
        let got = extract_panel_professors("Dr. Rao\nProf. Iyer, 12\n  ab ,Ms. Shah\n\n1234");
        assert_eq!(got, vec!["Dr. Rao", "Prof. Iyer", "Ms. Shah"]);
    }

    #[test]
    fn repeated_panel_names_are_listed_once() {
        let got = extract_panel_professors("Dr. Rao\nDr. Rao, Dr. Rao, Dr. Shah, Dr. Iyer\nDr. Shah");
        assert_eq!(got, vec!["Dr. Rao", "Dr. Shah", "Dr. Iyer"]);
    }

    #[test]
    fn empty_panel_falls_back_to_track_placeholders() {
        let row = SheetRow::new().with("Track", "4").with("Groups", "BIA-03");
        let tr = extract_track_row(&row, &opts()).expect("row");
        assert_eq!(tr.track, 4);
        assert_eq!(tr.location, "Room 4");
        assert_eq!(
            tr.panel_professors,
            vec![
                "Default Panel 4 Prof 1",
                "Default Panel 4 Prof 2",
                "Default Panel 4 Prof 3"
            ]
        );
    }

    #[test]
    fn track_forms() {
        assert_eq!(parse_track("2"), Some(2));
        assert_eq!(parse_track("2.0"), Some(2));
        assert_eq!(parse_track("Track 5"), Some(5));
        assert_eq!(parse_track("0"), None);
        assert_eq!(parse_track("two"), None);
    }

    #[test]
    fn rows_without_usable_track_are_skipped() {
        let o = opts();
        assert_eq!(
            extract_track_row(&SheetRow::new(), &o),
            Err(RowSkip::Blank)
        );
        let no_track = SheetRow::new().with("Groups", "BIA-01");
        assert_eq!(extract_track_row(&no_track, &o), Err(RowSkip::MissingTrack));
        let bad = SheetRow::new().with("Track", "TBD").with("Groups", "BIA-01");
        assert_eq!(
            extract_track_row(&bad, &o),
            Err(RowSkip::InvalidTrack("TBD".into()))
        );
        let empty = SheetRow::new().with("Track", "2").with("Notes", "lunch");
        assert_eq!(
            extract_track_row(&empty, &o),
            Err(RowSkip::NoGroups { track: 2 })
        );
    }
}
