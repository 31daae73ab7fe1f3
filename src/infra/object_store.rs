use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::app::ports::ObjectStorePort;
use crate::config::ObjectStoreConfig;
use crate::error::{EtlError, Result};
use crate::infra::http_client::fetch_bytes;
use crate::table::{Cell, Table};

/// Fetches CSV or JSON objects from `s3://` references, http(s) URLs or local paths.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint_template: String,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, config: &ObjectStoreConfig) -> Self {
        Self {
            client,
            endpoint_template: config.endpoint_template.clone(),
        }
    }

    /// Turn `s3://bucket/key` into a fetchable location; other references pass through.
    pub fn resolve(&self, object_ref: &str) -> Result<String> {
        let Some(rest) = object_ref.strip_prefix("s3://") else {
            return Ok(object_ref.to_string());
        };
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(self
                .endpoint_template
                .replace("{bucket}", bucket)
                .replace("{key}", key)),
            _ => Err(EtlError::Config(format!(
                "object reference '{}' is not of the form s3://bucket/key",
                object_ref
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ObjectFormat {
    Csv,
    Json,
}

fn object_format(object_ref: &str) -> Result<ObjectFormat> {
    let path = object_ref.split(['?', '#']).next().unwrap_or(object_ref).to_lowercase();
    if path.ends_with(".csv") {
        Ok(ObjectFormat::Csv)
    } else if path.ends_with(".json") {
        Ok(ObjectFormat::Json)
    } else {
        Err(EtlError::Config(format!(
            "cannot tell the format of '{}': expected a .csv or .json object",
            object_ref
        )))
    }
}

/// Parse a headed CSV with a positional index.
pub fn parse_csv_rows(name: &str, bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(EtlError::Schema(format!("CSV object '{}' has no header", name)));
    }
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(Cell::from_field).collect());
    }
    Ok(Table::from_rows(name, &headers, rows))
}

/// Parse a CSV whose first column carries the row labels.
pub fn parse_csv(name: &str, bytes: &[u8]) -> Result<Table> {
    let mut table = parse_csv_rows(name, bytes)?;
    let first = table.columns()[0].name.clone();
    table.set_index_from_column(&first)?;
    Ok(table)
}

/// Write a table as CSV with the index as a leading `index` column.
pub fn write_csv<W: std::io::Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    let mut header = vec!["index"];
    header.extend(table.column_names());
    out.write_record(&header)?;
    for (row, label) in table.index().iter().enumerate() {
        let mut record = vec![label.to_string()];
        record.extend(table.columns().iter().map(|c| c.cells[row].to_string()));
        out.write_record(&record)?;
    }
    out.flush()?;
    Ok(())
}

/// Parse either an array of records or a column-oriented object
/// `{column: {row_label: value}}`.
pub fn parse_json(name: &str, bytes: &[u8]) -> Result<Table> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Array(records) => Table::from_records(name, &records),
        Value::Object(columns) => {
            let mut labels: Vec<String> = Vec::new();
            for (column, cells) in &columns {
                let cells = cells.as_object().ok_or_else(|| {
                    EtlError::Schema(format!("column '{}' in '{}' is not an object of rows", column, name))
                })?;
                for label in cells.keys() {
                    if !labels.contains(label) {
                        labels.push(label.clone());
                    }
                }
            }
            let numeric: Option<Vec<i64>> = labels.iter().map(|l| l.parse().ok()).collect();
            let index = match numeric {
                Some(mut index) => {
                    let mut order: Vec<usize> = (0..labels.len()).collect();
                    order.sort_by_key(|&i| index[i]);
                    labels = order.iter().map(|&i| labels[i].clone()).collect();
                    index.sort_unstable();
                    index
                }
                None => (0..labels.len() as i64).collect(),
            };

            let headers: Vec<String> = columns.keys().cloned().collect();
            let rows = labels
                .iter()
                .map(|label| {
                    columns
                        .values()
                        .map(|cells| cells.get(label).map(Cell::from_json).unwrap_or(Cell::Null))
                        .collect()
                })
                .collect();
            Table::from_rows(name, &headers, rows).with_index(index)
        }
        _ => Err(EtlError::Schema(format!(
            "JSON object '{}' is neither an array of records nor an object of columns",
            name
        ))),
    }
}

#[async_trait]
impl ObjectStorePort for HttpObjectStore {
    #[instrument(skip(self))]
    async fn fetch(&self, object_ref: &str) -> Result<Table> {
        let format = object_format(object_ref)?;
        let location = self.resolve(object_ref)?;
        let bytes = fetch_bytes(&self.client, &location).await?;
        debug!(%location, bytes = bytes.len(), "Fetched object");
        match format {
            ObjectFormat::Csv => parse_csv(object_ref, &bytes),
            ObjectFormat::Json => parse_json(object_ref, &bytes),
        }
    }
}
