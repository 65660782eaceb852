//! In-memory sheet source for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CellValue, SheetSource, SourceError};

/// Serves fixed rows per sheet. Sheets that were never set fail with
/// [`SourceError::Sheet`], like a missing tab would.
#[derive(Debug, Default)]
pub struct StaticSheetSource {
    sheets: RwLock<HashMap<String, Result<Vec<Vec<CellValue>>, SourceError>>>,
    unavailable: RwLock<Option<String>>,
}

impl StaticSheetSource {
    /// Creates a source with no sheets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_rows`](Self::set_rows).
    #[must_use]
    pub fn with_rows(mut self, sheet: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        self.sheets.get_mut().insert(sheet.into(), Ok(rows));
        self
    }

    /// Replaces the rows of `sheet`.
    pub async fn set_rows(&self, sheet: impl Into<String>, rows: Vec<Vec<CellValue>>) {
        self.sheets.write().await.insert(sheet.into(), Ok(rows));
    }

    /// Makes `sheet` fail with a per-sheet error.
    pub async fn fail_sheet(&self, sheet: impl Into<String>, reason: impl Into<String>) {
        let sheet = sheet.into();
        let err = SourceError::Sheet {
            sheet: sheet.clone(),
            reason: reason.into(),
        };
        self.sheets.write().await.insert(sheet, Err(err));
    }

    /// Makes every fetch fail as unavailable (`Some`) or restores it (`None`).
    pub async fn set_unavailable(&self, reason: Option<String>) {
        *self.unavailable.write().await = reason;
    }
}

#[async_trait]
impl SheetSource for StaticSheetSource {
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, SourceError> {
        if let Some(reason) = self.unavailable.read().await.clone() {
            return Err(SourceError::Unavailable(reason));
        }
        self.sheets
            .read()
            .await
            .get(sheet)
            .cloned()
            .unwrap_or_else(|| {
                Err(SourceError::Sheet {
                    sheet: sheet.to_string(),
                    reason: "sheet not found".to_string(),
                })
            })
    }
}
