//! Google Sheets v4 client: visit rows, header bootstrap and option columns.

use std::sync::Arc;

use canvass_core::VisitRecord;
use chrono::Utc;
use futures::future::BoxFuture;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::sync::OnceCell;

use super::{trim_base, GoogleClient};
use crate::error::StorageError;
use crate::row::{to_row, VISIT_HEADER};
use crate::store::VisitStore;

pub struct SheetsClient {
    google: Arc<GoogleClient>,
    base_url: String,
    spreadsheet_id: String,
    visit_sheet: String,
    visit_sheet_ready: OnceCell<()>,
}

impl SheetsClient {
    #[must_use]
    pub fn new(
        google: Arc<GoogleClient>,
        base_url: &str,
        spreadsheet_id: &str,
        visit_sheet: &str,
    ) -> Self {
        Self {
            google,
            base_url: trim_base(base_url),
            spreadsheet_id: spreadsheet_id.to_owned(),
            visit_sheet: visit_sheet.to_owned(),
            visit_sheet_ready: OnceCell::new(),
        }
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            utf8_percent_encode(range, NON_ALPHANUMERIC)
        )
    }

    /// Titles of every tab in the spreadsheet.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the spreadsheet cannot be read.
    pub async fn sheet_titles(&self) -> Result<Vec<String>, StorageError> {
        let request = self
            .google
            .http()
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties.title")]);
        let body = self.google.send_json("sheets metadata", request).await?;

        Ok(body
            .get("sheets")
            .and_then(serde_json::Value::as_array)
            .map(|sheets| {
                sheets
                    .iter()
                    .filter_map(|s| s.pointer("/properties/title")?.as_str())
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Creates the visit tab with its header row if it does not exist yet.
    /// Checked once per client.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the tab cannot be listed or created.
    pub async fn ensure_visit_sheet(&self) -> Result<(), StorageError> {
        self.visit_sheet_ready
            .get_or_try_init(|| async {
                let titles = self.sheet_titles().await?;
                if titles.iter().any(|t| t == &self.visit_sheet) {
                    return Ok(());
                }
                tracing::info!(sheet = %self.visit_sheet, "visit sheet missing, creating it");
                self.add_sheet(&self.visit_sheet).await?;
                self.write_row(&self.visit_sheet, &VISIT_HEADER.map(str::to_owned))
                    .await
            })
            .await
            .map(|_| ())
    }

    async fn add_sheet(&self, title: &str) -> Result<(), StorageError> {
        let request = self
            .google
            .http()
            .post(format!("{}:batchUpdate", self.spreadsheet_url()))
            .json(&serde_json::json!({
                "requests": [{ "addSheet": { "properties": { "title": title } } }]
            }));
        self.google.send_json("sheets addSheet", request).await?;
        Ok(())
    }

    async fn write_row(&self, title: &str, cells: &[String]) -> Result<(), StorageError> {
        let request = self
            .google
            .http()
            .put(self.values_url(&a1_range(title, Some("A1"))))
            .query(&[("valueInputOption", "RAW")])
            .json(&serde_json::json!({ "values": [cells] }));
        self.google.send_json("sheets header", request).await?;
        Ok(())
    }

    /// Appends one row below the last non-empty row of `title`. Values are
    /// stored as entered so leading zeros in phone numbers survive.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the append is rejected.
    pub async fn append_row(&self, title: &str, cells: &[String]) -> Result<(), StorageError> {
        let request = self
            .google
            .http()
            .post(format!("{}:append", self.values_url(&a1_range(title, Some("A1")))))
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&serde_json::json!({ "values": [cells] }));
        self.google.send_json("sheets append", request).await?;
        Ok(())
    }

    /// Reads the non-blank values under the first header in `columns` found
    /// in the first row of `title`. Empty when no such header exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the tab cannot be read.
    pub async fn read_column(&self, title: &str, columns: &[&str]) -> Result<Vec<String>, StorageError> {
        let request = self
            .google
            .http()
            .get(self.values_url(&a1_range(title, None)))
            .query(&[("majorDimension", "ROWS")]);
        let body = self.google.send_json("sheets read", request).await?;

        let rows: Vec<Vec<String>> = body
            .get("values")
            .and_then(serde_json::Value::as_array)
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .map(|cells| cells.iter().map(cell_text).collect())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();

        let Some((header, data)) = rows.split_first() else {
            return Ok(Vec::new());
        };
        let Some(index) = columns
            .iter()
            .find_map(|name| header.iter().position(|h| h.trim() == *name))
        else {
            tracing::warn!(sheet = title, ?columns, "no matching column header");
            return Ok(Vec::new());
        };

        Ok(data
            .iter()
            .filter_map(|row| row.get(index))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }
}

impl VisitStore for SheetsClient {
    fn append(&self, record: VisitRecord) -> BoxFuture<'_, Result<(), StorageError>> {
        Box::pin(async move {
            self.ensure_visit_sheet().await?;
            let row = to_row(&record, Utc::now());
            self.append_row(&self.visit_sheet, &row).await?;
            tracing::info!(
                sheet = %self.visit_sheet,
                store = %record.store_name,
                salesperson = %record.salesperson,
                "visit row appended"
            );
            Ok(())
        })
    }
}

/// Quotes a tab title for A1 notation, doubling embedded quotes.
fn a1_range(title: &str, cells: Option<&str>) -> String {
    let quoted = format!("'{}'", title.replace('\'', "''"));
    match cells {
        Some(cells) => format!("{quoted}!{cells}"),
        None => quoted,
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "sheets_test.rs"]
mod tests;
