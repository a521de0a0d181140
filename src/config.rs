use serde::Deserialize;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Knobs for one import run. Every field has a default so callers may pass a
/// partial object (or nothing) as `params.options`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Zero-based index of the header row on each roster sheet.
    pub roster_header_row: usize,
    /// Zero-based index of the header row on the schedule sheet.
    pub schedule_header_row: usize,
    pub division_a_sheet_keywords: Vec<String>,
    pub division_b_sheet_keywords: Vec<String>,
    pub schedule_sheet_keywords: Vec<String>,
    pub columns: ColumnNames,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            roster_header_row: 3,
            schedule_header_row: 2,
            division_a_sheet_keywords: strings(&["DIV A", "DIVA", "DIVISION A"]),
            division_b_sheet_keywords: strings(&["DIV B", "DIVB", "DIVISION B"]),
            schedule_sheet_keywords: strings(&["SCHEDULE", "SCHED"]),
            columns: ColumnNames::default(),
        }
    }
}

impl ImportOptions {
    /// Schedule columns never scanned for group ids: every spelling of the
    /// track, panel and location headers.
    pub fn non_data_columns(&self) -> Vec<String> {
        let c = &self.columns;
        c.track
            .iter()
            .chain(&c.panel)
            .chain(&c.location)
            .cloned()
            .collect()
    }
}

/// Header spellings, tried in order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnNames {
    pub group_no: Vec<String>,
    pub domain: Vec<String>,
    pub title: Vec<String>,
    pub sponsor: Vec<String>,
    pub guide: Vec<String>,
    pub mentor_name: Vec<String>,
    pub mentor_email: Vec<String>,
    pub mentor_mobile: Vec<String>,
    pub roll_no: Vec<String>,
    pub student_name: Vec<String>,
    pub contact: Vec<String>,
    pub track: Vec<String>,
    pub panel: Vec<String>,
    pub location: Vec<String>,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            group_no: strings(&["Group No.", "Group No", "Group ID"]),
            domain: strings(&["Project Domain"]),
            title: strings(&["Proposed Title of the Project if any", "Project Title"]),
            sponsor: strings(&["Name of the sponsored company", "Sponsor Company"]),
            guide: strings(&["Name of the Guide", "Guide Name"]),
            mentor_name: strings(&["Name of the Mentor", "Mentor Name"]),
            mentor_email: strings(&["Mentor Email", "Email of the Mentor"]),
            mentor_mobile: strings(&["Mentor Mobile", "Mentor Contact"]),
            roll_no: strings(&["Roll No.", "Roll No"]),
            student_name: strings(&["Name of the group member", "Student Name"]),
            contact: strings(&["Contact Details", "Contact No.", "Mobile No."]),
            track: strings(&["Track"]),
            panel: strings(&["Name of the Panel", "Panel"]),
            location: strings(&["Location"]),
        }
    }
}

/// Sequential placement used by `schedule.generate`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerOptions {
    pub groups_per_track: usize,
    pub max_tracks: u32,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            groups_per_track: 5,
            max_tracks: 7,
        }
    }
}

/// Parses optional `params.options`; absent or null means defaults.
pub fn options_from_params<T>(value: Option<&serde_json::Value>) -> Result<T, String>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match value {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_options_keep_defaults() {
        let v = json!({ "rosterHeaderRow": 0 });
        let opts: ImportOptions = options_from_params(Some(&v)).expect("options");
        assert_eq!(opts.roster_header_row, 0);
        assert_eq!(opts.schedule_header_row, 2);
        assert!(opts.columns.panel.iter().any(|c| c == "Name of the Panel"));
    }

    #[test]
    fn skipped_columns_follow_the_aliases() {
        let v = json!({ "columns": { "location": ["Venue"] } });
        let opts: ImportOptions = options_from_params(Some(&v)).expect("options");
        let skip = opts.non_data_columns();
        assert!(skip.iter().any(|c| c == "Panel"));
        assert!(skip.iter().any(|c| c == "Venue"));
        assert!(!skip.iter().any(|c| c == "Location"));
        assert!(skip.iter().any(|c| c == "Track"));
    }

    #[test]
    fn null_options_are_defaults() {
        let opts: PlannerOptions =
            options_from_params(Some(&serde_json::Value::Null)).expect("options");
        assert_eq!(opts.groups_per_track, 5);
        assert_eq!(opts.max_tracks, 7);
    }

    #[test]
    fn wrong_types_are_reported() {
        let v = json!({ "groupsPerTrack": "five" });
        assert!(options_from_params::<PlannerOptions>(Some(&v)).is_err());
    }
}
