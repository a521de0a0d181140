use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use calamine::{open_workbook_auto, Data, Reader};
use reviewd::config::ImportOptions;
use reviewd::error::ImportError;
use reviewd::scheduling::run_import;
use reviewd::store::ReviewStore;
use reviewd::{db, export, views, workbook};
use rust_xlsxwriter::Workbook;

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

const ROSTER_HEADERS: [&str; 6] = [
    "Group No.",
    "Project Domain",
    "Proposed Title of the Project if any",
    "Name of the Guide",
    "Roll No.",
    "Name of the group member",
];

/// Three title lines above the header, like the department's sheets.
fn write_roster(
    wb: &mut Workbook,
    name: &str,
    rows: &[(&str, &str, &str, &str, f64, &str)],
) {
    let ws = wb.add_worksheet();
    ws.set_name(name).expect("sheet name");
    ws.write_string(0, 0, "Final Year Project Groups").expect("title");
    ws.write_string(1, 0, name).expect("subtitle");
    for (c, h) in ROSTER_HEADERS.iter().enumerate() {
        ws.write_string(3, c as u16, *h).expect("header");
    }
    for (i, (group, domain, title, guide, roll, student)) in rows.iter().enumerate() {
        let r = 4 + i as u32;
        for (c, v) in [group, domain, title, guide].iter().enumerate() {
            if !v.is_empty() {
                ws.write_string(r, c as u16, **v).expect("cell");
            }
        }
        ws.write_number(r, 4, *roll).expect("roll");
        ws.write_string(r, 5, *student).expect("student");
    }
}

fn write_sample(path: &Path, with_schedule: bool) {
    let mut wb = Workbook::new();
    write_roster(
        &mut wb,
        "FINAL DIV A",
        &[
            ("BIA1", "IoT", "Smart Irrigation", "Dr. Rao", 101.0, "Asha"),
            ("", "", "", "", 102.0, "Bina"),
            ("BIA-02", "ML", "Crop Advisor", "Dr. Iyer", 103.0, "Chetan"),
        ],
    );
    write_roster(
        &mut wb,
        "DIV B",
        &[("BIB 01", "Web", "Campus Portal", "Dr. Shah", 201.0, "Dev")],
    );
    if with_schedule {
        let ws = wb.add_worksheet();
        ws.set_name("Review Schedule").expect("sheet name");
        ws.write_string(0, 0, "Review II Schedule").expect("title");
        for (c, h) in ["Track", "Name of the Panel", "Location", "Group 1", "Group 2"]
            .iter()
            .enumerate()
        {
            ws.write_string(2, c as u16, *h).expect("header");
        }
        ws.write_number(3, 0, 1.0).expect("track");
        ws.write_string(3, 1, "Dr. Kulkarni\nDr. Mehta\nDr. Shah")
            .expect("panel");
        ws.write_string(3, 2, "Lab 4").expect("location");
        ws.write_string(3, 3, "BIA01").expect("g1");
        ws.write_string(3, 4, "BIB- 01").expect("g2");
    }
    wb.save(path).expect("save workbook");
}

#[test]
fn workbook_import_reads_rosters_and_schedule() {
    let dir = temp_dir("reviewd-xlsx-import");
    let path = dir.join("reviews.xlsx");
    write_sample(&path, true);

    let opts = ImportOptions::default();
    let rows = workbook::read_workbook(&path, &opts).expect("read workbook");
    let sources = rows.sources.clone().expect("sources");
    assert_eq!(sources.division_a, "FINAL DIV A");
    assert_eq!(sources.schedule, "Review Schedule");
    assert_eq!(rows.division_a.len(), 3);
    assert_eq!(rows.division_a[0].get("Roll No."), Some("101"));

    let conn = db::open_in_memory().expect("db");
    let summary = run_import(&conn, &rows, &opts).expect("import");
    assert_eq!(summary.groups_imported, 3);
    assert_eq!(summary.assignments_imported, 2);
    assert_eq!(summary.sweep_repairs, vec!["BIA-02"]);
    assert_eq!(summary.sources, Some(sources));

    let details = views::project_details(&conn, "BIA-01").expect("details");
    assert_eq!(details.project_title, "Smart Irrigation");
    assert_eq!(details.members.len(), 2);
    assert_eq!(details.location, "Lab 4");
    assert_eq!(details.evaluator1_name.as_deref(), Some("Dr. Mehta"));

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_schedule_sheet_is_structural() {
    let dir = temp_dir("reviewd-xlsx-missing");
    let path = dir.join("rosters-only.xlsx");
    write_sample(&path, false);

    match workbook::read_workbook(&path, &ImportOptions::default()) {
        Err(ImportError::MissingSheets { missing, found }) => {
            assert_eq!(missing, vec!["schedule"]);
            assert_eq!(found.len(), 2);
        }
        other => panic!("expected missing sheets, got {other:?}"),
    }
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn unreadable_file_is_reported() {
    let dir = temp_dir("reviewd-xlsx-bad");
    let path = dir.join("not-a-workbook.xlsx");
    std::fs::write(&path, b"plain text").expect("write");
    assert!(matches!(
        workbook::read_workbook(&path, &ImportOptions::default()),
        Err(ImportError::WorkbookUnreadable(_))
    ));
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn export_writes_project_data_sheet() {
    let dir = temp_dir("reviewd-xlsx-export");
    let src = dir.join("reviews.xlsx");
    write_sample(&src, true);
    let opts = ImportOptions::default();
    let conn = db::open_in_memory().expect("db");
    run_import(
        &conn,
        &workbook::read_workbook(&src, &opts).expect("read"),
        &opts,
    )
    .expect("import");
    assert_eq!(conn.count_groups().expect("count"), 3);

    let out = dir.join("export.xlsx");
    let projects = views::list_projects(&conn).expect("list");
    let written = export::write_projects_xlsx(&projects, &out).expect("export");
    assert_eq!(written, 4);

    let mut wb = open_workbook_auto(&out).expect("reopen");
    let range = wb
        .worksheet_range(export::EXPORT_SHEET)
        .expect("project sheet");
    assert_eq!(range.get_size().0, 5);
    assert_eq!(
        range.get((0, 0)),
        Some(&Data::String("group_id".to_string()))
    );
    let _ = std::fs::remove_dir_all(dir);
}
