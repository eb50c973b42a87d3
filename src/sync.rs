//! One-shot copy of process definitions between two databases.
//!
//! Rows are upserted by id in dependency order: processes, then steps, then
//! transitions. Comments stay where they were written.

use crate::db::{Database, DbError, Process, ProcessStore, Step, Transition};
use crate::schema::{processes, steps, transitions};
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

#[derive(Debug, thiserror::Error)]
#[error("sync of table '{table}' failed: {source}")]
pub struct SyncError {
    pub table: &'static str,
    #[source]
    pub source: DbError,
}

impl SyncError {
    fn new(table: &'static str, source: impl Into<DbError>) -> Self {
        Self {
            table,
            source: source.into(),
        }
    }
}

/// Row counts for one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: &'static str,
    pub inserted: usize,
    pub updated: usize,
}

impl TableReport {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for TableReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<12} {} inserted, {} updated",
            self.table, self.inserted, self.updated
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub tables: Vec<TableReport>,
}

impl SyncReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    pub fn total(&self) -> usize {
        self.tables.iter().map(TableReport::total).sum()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run, nothing written:")?;
        }
        for table in &self.tables {
            writeln!(f, "  {}", table)?;
        }
        Ok(())
    }
}

/// Split `ids` into (new, existing) counts against `existing`
fn count_split<'a>(ids: impl Iterator<Item = &'a str>, existing: &HashSet<String>, report: &mut TableReport) {
    for id in ids {
        if existing.contains(id) {
            report.updated += 1;
        } else {
            report.inserted += 1;
        }
    }
}

/// Copy processes, steps and transitions from `source` into `target`.
///
/// Each table is written in its own transaction; a failing table aborts the
/// sync and earlier tables stay committed.
pub fn sync_databases(source: &Database, target: &Database, dry_run: bool) -> Result<SyncReport, SyncError> {
    let source_processes = source
        .list_processes()
        .map_err(|e| SyncError::new("processes", e))?;

    let mut source_steps: Vec<Step> = Vec::new();
    let mut source_transitions: Vec<Transition> = Vec::new();
    for process in &source_processes {
        source_steps.extend(source.steps_for(&process.id).map_err(|e| SyncError::new("steps", e))?);
        source_transitions.extend(
            source
                .transitions_for(&process.id)
                .map_err(|e| SyncError::new("transitions", e))?,
        );
    }

    let mut conn = target.get_conn().map_err(|e| SyncError::new("processes", e))?;

    let tables = vec![
        upsert_processes(&mut conn, &source_processes, dry_run)?,
        upsert_steps(&mut conn, &source_steps, dry_run)?,
        upsert_transitions(&mut conn, &source_transitions, dry_run)?,
    ];

    let report = SyncReport { dry_run, tables };
    info!(rows = report.total(), dry_run, "sync finished");
    Ok(report)
}

fn upsert_processes(
    conn: &mut SqliteConnection,
    rows: &[Process],
    dry_run: bool,
) -> Result<TableReport, SyncError> {
    const TABLE: &str = "processes";
    conn.transaction::<_, DbError, _>(|conn| {
        let existing: HashSet<String> = processes::table
            .select(processes::id)
            .load::<String>(conn)?
            .into_iter()
            .collect();
        let mut report = TableReport::new(TABLE);
        count_split(rows.iter().map(|r| r.id.as_str()), &existing, &mut report);
        if !dry_run {
            for row in rows {
                diesel::insert_into(processes::table)
                    .values(row)
                    .on_conflict(processes::id)
                    .do_update()
                    .set(row)
                    .execute(conn)?;
            }
        }
        Ok(report)
    })
    .map_err(|e| SyncError::new(TABLE, e))
}

fn upsert_steps(conn: &mut SqliteConnection, rows: &[Step], dry_run: bool) -> Result<TableReport, SyncError> {
    const TABLE: &str = "steps";
    conn.transaction::<_, DbError, _>(|conn| {
        let existing: HashSet<String> = steps::table
            .select(steps::id)
            .load::<String>(conn)?
            .into_iter()
            .collect();
        let mut report = TableReport::new(TABLE);
        count_split(rows.iter().map(|r| r.id.as_str()), &existing, &mut report);
        if !dry_run {
            for row in rows {
                diesel::insert_into(steps::table)
                    .values(row)
                    .on_conflict(steps::id)
                    .do_update()
                    .set(row)
                    .execute(conn)?;
            }
        }
        Ok(report)
    })
    .map_err(|e| SyncError::new(TABLE, e))
}

fn upsert_transitions(
    conn: &mut SqliteConnection,
    rows: &[Transition],
    dry_run: bool,
) -> Result<TableReport, SyncError> {
    const TABLE: &str = "transitions";
    conn.transaction::<_, DbError, _>(|conn| {
        let existing: HashSet<String> = transitions::table
            .select(transitions::id)
            .load::<String>(conn)?
            .into_iter()
            .collect();
        let mut report = TableReport::new(TABLE);
        count_split(rows.iter().map(|r| r.id.as_str()), &existing, &mut report);
        if !dry_run {
            for row in rows {
                diesel::insert_into(transitions::table)
                    .values(row)
                    .on_conflict(transitions::id)
                    .do_update()
                    .set(row)
                    .execute(conn)?;
            }
        }
        Ok(report)
    })
    .map_err(|e| SyncError::new(TABLE, e))
}
