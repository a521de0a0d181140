use reviewd::config::ImportOptions;
use reviewd::db;
use reviewd::scheduling::{ident, run_import, ImportPhase};
use reviewd::sheet::{SheetRow, WorkbookRows};
use reviewd::store::{Division, ReviewStore};

fn roster(rows: &[(&str, &str, &str)]) -> Vec<SheetRow> {
    rows.iter()
        .map(|(group, roll, name)| {
            SheetRow::new()
                .with("Group No.", group)
                .with("Roll No.", roll)
                .with("Name of the group member", name)
        })
        .collect()
}

fn schedule_row(track: &str, panel: &str, groups: &str) -> SheetRow {
    SheetRow::new()
        .with("Track", track)
        .with("Name of the Panel", panel)
        .with("Location", "Seminar Hall")
        .with("Groups", groups)
}

fn sample() -> WorkbookRows {
    WorkbookRows {
        division_a: roster(&[
            ("BIA1", "101", "Asha"),
            ("", "102", "Bina"),
            ("BIA-02", "103", "Chetan"),
            ("BIA 3", "104", "Dev"),
            ("BIA-04", "105", "Farah"),
        ]),
        division_b: roster(&[("bib-01", "201", "Gita"), ("", "202.0", "Hari")]),
        schedule: vec![
            schedule_row(
                "1",
                "Dr. Kulkarni\nDr. Mehta, Dr. Shah",
                "BIA01, BIA-02 / BIB 1",
            ),
            schedule_row("2.0", "Dr. Joshi\nDr. Rao", "BIA-03"),
            SheetRow::new().with("Name of the Panel", "Dr. Nobody"),
        ],
        sources: None,
    }
}

fn evaluators(conn: &rusqlite::Connection, id: &str) -> (String, String) {
    let (e1, e2) = conn
        .group_evaluators(id)
        .expect("query")
        .expect("group exists");
    (e1.unwrap_or_default(), e2.unwrap_or_default())
}

#[test]
fn rotation_is_applied_per_track() {
    let conn = db::open_in_memory().expect("db");
    let summary = run_import(&conn, &sample(), &ImportOptions::default()).expect("import");

    // Track 1 groups sorted: BIA-01, BIA-02, BIB-01 over three professors.
    assert_eq!(
        evaluators(&conn, "BIA-01"),
        ("Dr. Mehta".to_string(), "Dr. Shah".to_string())
    );
    assert_eq!(
        evaluators(&conn, "BIA-02"),
        ("Dr. Shah".to_string(), "Dr. Kulkarni".to_string())
    );
    assert_eq!(
        evaluators(&conn, "BIB-01"),
        ("Dr. Kulkarni".to_string(), "Dr. Mehta".to_string())
    );
    // Two-professor track: evaluator2 falls back onto the guide.
    assert_eq!(
        evaluators(&conn, "BIA-03"),
        ("Dr. Rao".to_string(), "Dr. Joshi".to_string())
    );
    assert_eq!(summary.scheduled_groups, 4);
    assert_eq!(summary.rows_skipped, 1);
}

#[test]
fn unscheduled_roster_group_gets_placeholders() {
    let conn = db::open_in_memory().expect("db");
    let summary = run_import(&conn, &sample(), &ImportOptions::default()).expect("import");
    assert_eq!(summary.sweep_repairs, vec!["BIA-04"]);
    assert_eq!(
        evaluators(&conn, "BIA-04"),
        (
            "Default Evaluator A.1".to_string(),
            "Default Evaluator A.2".to_string()
        )
    );
    assert!(conn.find_groups_missing_evaluator().expect("gaps").is_empty());
}

#[test]
fn every_stored_id_is_canonical() {
    let conn = db::open_in_memory().expect("db");
    run_import(&conn, &sample(), &ImportOptions::default()).expect("import");
    let mut stmt = conn
        .prepare("SELECT group_id FROM projects UNION SELECT group_id FROM panel_assignments")
        .expect("prepare");
    let ids: Vec<String> = stmt
        .query_map([], |r| r.get(0))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("rows");
    assert_eq!(ids.len(), 5);
    assert!(ids.iter().all(|id| ident::is_canonical(id)), "{ids:?}");
}

#[test]
fn members_follow_their_group_and_numbers_are_cleaned() {
    let conn = db::open_in_memory().expect("db");
    let summary = run_import(&conn, &sample(), &ImportOptions::default()).expect("import");
    let rolls: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT roll_no FROM members WHERE group_id = 'BIB-01' ORDER BY roll_no")
            .expect("prepare");
        stmt.query_map([], |r| r.get(0))
            .expect("query")
            .collect::<Result<_, _>>()
            .expect("rows")
    };
    assert_eq!(rolls, vec!["201", "202"]);
    assert_eq!(summary.rosters[0].members, 5);
    assert_eq!(summary.rosters[1].groups, 1);
}

#[test]
fn reimport_yields_identical_counts() {
    let conn = db::open_in_memory().expect("db");
    let opts = ImportOptions::default();
    let first = run_import(&conn, &sample(), &opts).expect("first");
    let second = run_import(&conn, &sample(), &opts).expect("second");
    assert_eq!(first.groups_imported, second.groups_imported);
    assert_eq!(first.assignments_imported, second.assignments_imported);
    assert_eq!(first.track_distribution, second.track_distribution);
    assert_eq!(
        first.per_division_evaluator_coverage,
        second.per_division_evaluator_coverage
    );
    assert_eq!(second.phases.last(), Some(&ImportPhase::Done));
    assert_eq!(conn.count_groups_with_evaluator(Division::A).expect("a"), 4);
}
