use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::PathBuf;
use tracing::{debug, instrument};

use crate::app::ports::RelationalSourcePort;
use crate::error::{EtlError, Result};
use crate::table::{Cell, Column, Table};

/// Reads legacy relational tables out of a SQLite database, opened read-only per call.
pub struct SqliteSource {
    path: PathBuf,
}

impl SqliteSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Names of the user tables in the database, sorted.
    #[instrument(skip(self), fields(db = %self.path.display()))]
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            list_tables(&conn)
        })
        .await
        .map_err(|e| EtlError::Source {
            message: format!("table listing task failed: {}", e),
        })?
    }
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn cell_from_sql(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Int(i),
        ValueRef::Real(f) => Cell::Float(f),
        ValueRef::Text(t) => Cell::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Cell::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

pub(crate) fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

pub(crate) fn read_table(conn: &Connection, table_name: &str) -> Result<Table> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table_name)))?;
    let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut columns: Vec<Column> = names.iter().map(|n| Column::new(n.clone(), Vec::new())).collect();

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        for (i, column) in columns.iter_mut().enumerate() {
            column.cells.push(cell_from_sql(row.get_ref(i)?));
        }
    }

    if columns.is_empty() {
        return Err(EtlError::Schema(format!("table '{}' has no columns", table_name)));
    }
    Table::from_columns(table_name, columns)
}

#[async_trait]
impl RelationalSourcePort for SqliteSource {
    #[instrument(skip(self), fields(db = %self.path.display()))]
    async fn read(&self, table_name: &str) -> Result<Table> {
        let path = self.path.clone();
        let table_name = table_name.to_string();
        let table = tokio::task::spawn_blocking(move || -> Result<Table> {
            let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            read_table(&conn, &table_name)
        })
        .await
        .map_err(|e| EtlError::Source {
            message: format!("relational read task failed: {}", e),
        })??;
        debug!(rows = table.num_rows(), columns = table.num_columns(), "Read relational table");
        Ok(table)
    }
}
