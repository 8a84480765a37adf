//! Salesperson and visit-status choices for the form.
//!
//! Lists come from their own tabs of the spreadsheet. A missing tab, a
//! missing column, an empty column or any API failure yields the built-in
//! sample list instead of an error, so the form always has choices.

use std::sync::Arc;

use canvass_core::AppConfig;

use crate::google::SheetsClient;

pub const SAMPLE_SALES: &[&str] = &[
    "Ahmad Rizki",
    "Budi Santoso",
    "Citra Dewi",
    "Dian Pratama",
    "Eko Wijaya",
    "Fitri Handayani",
    "Gunawan Putra",
    "Hendra Kusuma",
];

pub const SAMPLE_STATUSES: &[&str] = &["Follow-Up", "Tidak Tertarik", "Activated"];

const SALES_COLUMNS: &[&str] = &["Nama Sales", "Nama"];
const STATUS_COLUMNS: &[&str] = &["Status", "Name"];

pub struct OptionLists {
    sheets: Arc<SheetsClient>,
    sales_sheet: String,
    status_sheet: String,
}

impl OptionLists {
    #[must_use]
    pub fn new(sheets: Arc<SheetsClient>, sales_sheet: &str, status_sheet: &str) -> Self {
        Self {
            sheets,
            sales_sheet: sales_sheet.to_owned(),
            status_sheet: status_sheet.to_owned(),
        }
    }

    #[must_use]
    pub fn from_config(sheets: Arc<SheetsClient>, config: &AppConfig) -> Self {
        Self::new(sheets, &config.sales_sheet, &config.status_sheet)
    }

    pub async fn salespeople(&self) -> Vec<String> {
        self.load(&self.sales_sheet, SALES_COLUMNS, SAMPLE_SALES).await
    }

    pub async fn visit_statuses(&self) -> Vec<String> {
        self.load(&self.status_sheet, STATUS_COLUMNS, SAMPLE_STATUSES)
            .await
    }

    async fn load(&self, sheet: &str, columns: &[&str], sample: &[&str]) -> Vec<String> {
        match self.sheets.read_column(sheet, columns).await {
            Ok(values) if !values.is_empty() => values,
            Ok(_) => {
                tracing::warn!(sheet, "option sheet has no values, using sample list");
                sample_list(sample)
            }
            Err(error) => {
                tracing::warn!(sheet, error = %error, "option sheet unavailable, using sample list");
                sample_list(sample)
            }
        }
    }
}

fn sample_list(sample: &[&str]) -> Vec<String> {
    sample.iter().map(|s| (*s).to_owned()).collect()
}
