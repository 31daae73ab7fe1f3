use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::app::ports::WarehousePort;
use crate::error::{EtlError, Result};
use crate::infra::sqlite_source::quote_ident;
use crate::table::{Cell, Column, Table};

/// Loads cleaned tables into a SQLite warehouse, replacing each destination wholesale.
pub struct SqliteWarehouse {
    path: PathBuf,
    write_index: bool,
}

impl SqliteWarehouse {
    pub fn new(path: impl Into<PathBuf>, write_index: bool) -> Self {
        Self {
            path: path.into(),
            write_index,
        }
    }
}

/// Storage class for a column, from the cells it holds.
fn column_type(column: &Column) -> &'static str {
    let mut kind = None;
    for cell in &column.cells {
        let this = match cell {
            Cell::Null | Cell::Missing => continue,
            Cell::Bool(_) | Cell::Int(_) => "INTEGER",
            Cell::Float(_) => "REAL",
            Cell::Text(_) | Cell::Date(_) | Cell::Time(_) => "TEXT",
        };
        kind = match (kind, this) {
            (None, t) => Some(t),
            (Some(a), b) if a == b => Some(a),
            (Some("INTEGER"), "REAL") | (Some("REAL"), "INTEGER") => Some("REAL"),
            _ => Some("TEXT"),
        };
    }
    kind.unwrap_or("TEXT")
}

fn sql_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null | Cell::Missing => Value::Null,
        Cell::Bool(b) => Value::Integer(i64::from(*b)),
        Cell::Int(i) => Value::Integer(*i),
        Cell::Float(f) => Value::Real(*f),
        Cell::Text(s) => Value::Text(s.clone()),
        Cell::Date(_) | Cell::Time(_) => Value::Text(cell.to_string()),
    }
}

/// Drop, recreate and fill `destination` inside one transaction.
pub(crate) fn replace_table(
    conn: &mut Connection,
    table: &Table,
    destination: &str,
    write_index: bool,
) -> Result<()> {
    if table.num_columns() == 0 {
        return Err(EtlError::Schema(format!(
            "refusing to write '{}' with no columns",
            destination
        )));
    }

    let mut definitions = Vec::with_capacity(table.num_columns() + 1);
    if write_index {
        definitions.push(format!("{} INTEGER", quote_ident("index")));
    }
    for column in table.columns() {
        definitions.push(format!("{} {}", quote_ident(&column.name), column_type(column)));
    }
    let width = definitions.len();
    let placeholders = vec!["?"; width].join(", ");
    let target = quote_ident(destination);

    let tx = conn.transaction()?;
    tx.execute(&format!("DROP TABLE IF EXISTS {}", target), [])?;
    tx.execute(&format!("CREATE TABLE {} ({})", target, definitions.join(", ")), [])?;
    {
        let mut insert = tx.prepare(&format!("INSERT INTO {} VALUES ({})", target, placeholders))?;
        for (row, label) in table.index().iter().enumerate() {
            let mut values = Vec::with_capacity(width);
            if write_index {
                values.push(Value::Integer(*label));
            }
            values.extend(table.columns().iter().map(|c| sql_value(&c.cells[row])));
            insert.execute(params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl WarehousePort for SqliteWarehouse {
    #[instrument(skip(self, table), fields(db = %self.path.display(), rows = table.num_rows()))]
    async fn write(&self, table: &Table, destination: &str) -> Result<()> {
        let path = self.path.clone();
        let write_index = self.write_index;
        let table = table.clone();
        let destination = destination.to_string();
        let target = destination.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let mut conn = Connection::open(&path)?;
            replace_table(&mut conn, &table, &destination, write_index)
        })
        .await
        .map_err(|e| EtlError::Source {
            message: format!("warehouse write task failed: {}", e),
        })??;
        info!(destination = %target, "Replaced warehouse table");
        Ok(())
    }
}
