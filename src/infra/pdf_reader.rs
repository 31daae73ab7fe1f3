use async_trait::async_trait;
use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::app::ports::PdfTablePort;
use crate::error::{EtlError, Result};
use crate::infra::http_client::fetch_bytes;
use crate::table::{Cell, Table};

/// Field separator in extracted page text: a tab or a run of two or more spaces.
static FIELD_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t|\s{2,}").expect("static field separator regex"));

/// Reads the table printed on every page of a PDF, from a local path or URL.
pub struct LopdfTableReader {
    client: reqwest::Client,
}

impl LopdfTableReader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn split_fields(line: &str) -> Vec<String> {
    FIELD_SEPARATOR
        .split(line.trim())
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect()
}

/// Assemble per-page text into one table. The first non-blank line of the
/// first page is the header; the header repeated on later pages is skipped.
pub fn parse_pages(name: &str, pages: &[String]) -> Result<Table> {
    let mut lines = pages
        .iter()
        .flat_map(|page| page.lines())
        .filter(|line| !line.trim().is_empty());

    let headers = lines
        .next()
        .map(split_fields)
        .ok_or_else(|| EtlError::Schema(format!("document '{}' contains no text", name)))?;

    let mut rows = Vec::new();
    for line in lines {
        let fields = split_fields(line);
        if fields == headers {
            continue;
        }
        if fields.len() > headers.len() {
            warn!(document = name, line, "Row has more fields than the header, extra fields dropped");
        }
        rows.push(fields.iter().map(|f| Cell::from_field(f)).collect());
    }
    Ok(Table::from_rows(name, &headers, rows))
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let doc = Document::load_mem(bytes)?;
    doc.get_pages()
        .keys()
        .map(|page| doc.extract_text(&[*page]).map_err(EtlError::from))
        .collect()
}

#[async_trait]
impl PdfTablePort for LopdfTableReader {
    #[instrument(skip(self))]
    async fn read(&self, document_ref: &str) -> Result<Table> {
        let bytes = fetch_bytes(&self.client, document_ref).await?;
        let pages = tokio::task::spawn_blocking(move || extract_pages(&bytes))
            .await
            .map_err(|e| EtlError::Source {
                message: format!("pdf extraction task failed: {}", e),
            })??;
        debug!(pages = pages.len(), "Extracted document text");
        parse_pages(document_ref, &pages)
    }
}
