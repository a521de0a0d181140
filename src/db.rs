use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "reviewd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Fresh in-memory store with the full schema; used by tests and previews.
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS projects(
            group_id TEXT PRIMARY KEY,
            division TEXT NOT NULL,
            project_domain TEXT NOT NULL DEFAULT '',
            project_title TEXT NOT NULL DEFAULT '',
            sponsor_company TEXT NOT NULL DEFAULT '',
            guide_name TEXT NOT NULL DEFAULT '',
            mentor_name TEXT NOT NULL DEFAULT '',
            mentor_email TEXT NOT NULL DEFAULT '',
            mentor_mobile TEXT NOT NULL DEFAULT '',
            evaluator1_name TEXT,
            evaluator2_name TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_projects_division ON projects(division)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS members(
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            roll_no TEXT NOT NULL,
            student_name TEXT NOT NULL,
            contact_details TEXT NOT NULL DEFAULT '',
            FOREIGN KEY(group_id) REFERENCES projects(group_id),
            UNIQUE(group_id, roll_no)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_members_group ON members(group_id)",
        [],
    )?;

    // No foreign key: a schedule may name a group before the roster does.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS panel_assignments(
            group_id TEXT PRIMARY KEY,
            track INTEGER,
            panel_professors TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            guide TEXT,
            reviewer1 TEXT,
            reviewer2 TEXT,
            reviewer3 TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_panel_assignments_track ON panel_assignments(track)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
pub(crate) fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
