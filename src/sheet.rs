use serde::Serialize;

/// One spreadsheet row as handed over by the ingestion layer: header → value,
/// in column order. Empty cells are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetRow {
    cells: Vec<(String, String)>,
}

impl SheetRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.cells.push((column.into(), value));
    }

    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.push(column, value);
        self
    }

    /// Case-insensitive, whitespace-insensitive header lookup.
    pub fn get(&self, column: &str) -> Option<&str> {
        let want = header_key(column);
        self.cells
            .iter()
            .find(|(c, _)| header_key(c) == want)
            .map(|(_, v)| v.as_str())
    }

    /// First non-blank value among several header spellings.
    pub fn get_any(&self, columns: &[String]) -> Option<&str> {
        columns
            .iter()
            .filter_map(|c| self.get(c))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }

    /// Builds a row from a JSON object; numbers and booleans are rendered the
    /// same way the workbook reader renders them.
    pub fn from_json(obj: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut row = SheetRow::new();
        for (k, v) in obj {
            let text = match v {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => clean_numeric_text(s),
                serde_json::Value::Number(n) => match n.as_f64() {
                    Some(f) => format_number(f),
                    None => n.to_string(),
                },
                serde_json::Value::Bool(b) => b.to_string(),
                other => other.to_string(),
            };
            row.push(k.clone(), text);
        }
        row
    }
}

pub fn header_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// The three logical row sequences of one review workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookRows {
    pub division_a: Vec<SheetRow>,
    pub division_b: Vec<SheetRow>,
    pub schedule: Vec<SheetRow>,
    /// Sheet names the rows came from, when read from a file.
    pub sources: Option<SheetSources>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSources {
    pub division_a: String,
    pub division_b: String,
    pub schedule: String,
}

/// Strips the `.0` that numeric coercion leaves on phone numbers and roll
/// numbers (`9876543210.0` → `9876543210`).
pub fn clean_numeric_text(s: &str) -> String {
    let t = s.trim();
    match t.strip_suffix(".0") {
        Some(head) if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) => {
            head.to_string()
        }
        _ => t.to_string(),
    }
}

pub fn format_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trailing_zero_fraction_is_removed_from_numbers() {
        assert_eq!(clean_numeric_text("9876543210.0"), "9876543210");
        assert_eq!(clean_numeric_text(" 12.0 "), "12");
        assert_eq!(clean_numeric_text("12.05"), "12.05");
        assert_eq!(clean_numeric_text("v1.0"), "v1.0");
        assert_eq!(clean_numeric_text(".0"), ".0");
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn header_lookup_ignores_case_and_spacing() {
        let row = SheetRow::new()
            .with(" Proposed Title of the Project if any", "Smart Farm")
            .with("Name of the sponsored company ", "Acme");
        assert_eq!(
            row.get("proposed title of the project if any"),
            Some("Smart Farm")
        );
        assert_eq!(row.get("Name of the sponsored company"), Some("Acme"));
        assert_eq!(row.get("Missing"), None);
    }

    #[test]
    fn json_rows_skip_nulls_and_render_numbers() {
        let v = json!({ "Track": 2.0, "Location": null, "Roll No.": "101.0", "Flag": true });
        let row = SheetRow::from_json(v.as_object().expect("object"));
        assert_eq!(row.get("Track"), Some("2"));
        assert_eq!(row.get("Location"), None);
        assert_eq!(row.get("Roll No."), Some("101"));
        assert_eq!(row.get("Flag"), Some("true"));
    }

    #[test]
    fn blank_cells_are_not_stored() {
        let row = SheetRow::new().with("A", "  ").with("B", "");
        assert!(row.is_blank());
        assert_eq!(row.cells().count(), 0);
    }
}
