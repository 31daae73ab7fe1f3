use async_trait::async_trait;

use crate::error::Result;
use crate::table::Table;

/// Reads a whole table, every column as stored.
#[async_trait]
pub trait RelationalSourcePort: Send + Sync {
    async fn read(&self, table_name: &str) -> Result<Table>;
}

/// Reads the tables on every page of a document into one table.
#[async_trait]
pub trait PdfTablePort: Send + Sync {
    async fn read(&self, document_ref: &str) -> Result<Table>;
}

/// Store directory API: a count endpoint plus one detail endpoint per store.
#[async_trait]
pub trait StoreApiPort: Send + Sync {
    async fn list_count(&self) -> Result<usize>;
    async fn fetch(&self, store_index: usize) -> Result<serde_json::Value>;
}

/// Fetches a delimited or JSON object and parses it into a table.
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    async fn fetch(&self, object_ref: &str) -> Result<Table>;
}

/// Writes a table, discarding any previous contents and schema of `destination`.
#[async_trait]
pub trait WarehousePort: Send + Sync {
    async fn write(&self, table: &Table, destination: &str) -> Result<()>;
}
