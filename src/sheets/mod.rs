//! Spreadsheet pricing source.
//!
//! The pricing team maintains one sheet per category. [`SheetSource`]
//! fetches the raw rows of a sheet; [`parse_sheet`] turns them into
//! [`PricingEntry`] values according to a [`SheetMapping`], collecting
//! per-row problems instead of aborting.

pub mod google;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Cents;
use crate::domain::pricing::{CategoryPrices, NEST_CATEGORY, PricingEntry};

pub use google::GoogleSheetsSource;
pub use memory::StaticSheetSource;

/// Marker a price cell uses for "price on request".
pub const ON_REQUEST_MARKER: &str = "-";

/// A single cell as delivered by the source (unformatted values).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Blank cell or cell beyond the end of a short row.
    Empty,
    /// Numeric cell.
    Number(f64),
    /// Text cell, untrimmed.
    Text(String),
    /// Checkbox cell.
    Bool(bool),
}

impl CellValue {
    /// Returns `true` for blank cells and whitespace-only text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// Text content of the cell, trimmed. Numbers are rendered without a
    /// trailing `.0`.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(format!("{n:.0}")),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Self::Empty, Self::Number),
            Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Failure fetching a sheet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source as a whole is unreachable or refuses access. Fatal to a
    /// sync run.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// This sheet could not be read (missing tab, bad range). Other sheets
    /// may still succeed.
    #[error("sheet '{sheet}' unreadable: {reason}")]
    Sheet {
        /// Sheet name.
        sheet: String,
        /// What went wrong.
        reason: String,
    },
}

/// Raw row access to a pricing spreadsheet.
#[async_trait]
pub trait SheetSource: Send + Sync + std::fmt::Debug {
    /// Returns the data rows of `sheet`, header row excluded, in sheet
    /// order. Trailing blank cells may be omitted by the source.
    ///
    /// # Errors
    ///
    /// See [`SourceError`] for the distinction between fatal and
    /// per-sheet failures.
    async fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<CellValue>>, SourceError>;
}

/// Where a category lives in the spreadsheet. Column indices are zero
/// based (`A` = 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMapping {
    /// Sheet (tab) name.
    pub sheet: String,
    /// Category key written into the dataset.
    pub category: String,
    /// Column holding the item key.
    pub key_column: usize,
    /// Column holding the display name.
    pub name_column: usize,
    /// Column holding the price in euros.
    pub price_column: usize,
    /// Column holding the floor area, if the category has one.
    pub square_meters_column: Option<usize>,
    /// Column holding the maximum selectable quantity.
    pub max_quantity_column: Option<usize>,
}

impl SheetMapping {
    /// Mapping with the common `key | name | price` layout in columns A-C.
    #[must_use]
    pub fn simple(sheet: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            category: category.into(),
            key_column: 0,
            name_column: 1,
            price_column: 2,
            square_meters_column: None,
            max_quantity_column: None,
        }
    }

    /// Reads the floor area from `column`.
    #[must_use]
    pub fn with_square_meters(mut self, column: usize) -> Self {
        self.square_meters_column = Some(column);
        self
    }

    /// Reads the maximum quantity from `column`.
    #[must_use]
    pub fn with_max_quantity(mut self, column: usize) -> Self {
        self.max_quantity_column = Some(column);
        self
    }
}

/// The sheet layout of the pricing workbook.
#[must_use]
pub fn default_mappings() -> Vec<SheetMapping> {
    vec![
        SheetMapping::simple("Nest", NEST_CATEGORY).with_square_meters(3),
        SheetMapping::simple("Gebaeudehuelle", "gebaeudehuelle"),
        SheetMapping::simple("Innenverkleidung", "innenverkleidung"),
        SheetMapping::simple("Fussboden", "fussboden"),
        SheetMapping::simple("Fenster", "fenster"),
        SheetMapping::simple("Belichtungspaket", "belichtungspaket"),
        SheetMapping::simple("PV-Anlage", "pvanlage").with_max_quantity(3),
        SheetMapping::simple("Planungspaket", "planungspaket"),
        SheetMapping::simple("Optionen", "optionen"),
    ]
}

/// Entries parsed from one sheet plus the rows that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSheet {
    /// Valid entries keyed by item key.
    pub items: CategoryPrices,
    /// `"<sheet> row <n>: <reason>"` for every skipped row.
    pub errors: Vec<String>,
}

/// Parses the rows of one sheet.
///
/// Row numbers in error messages are spreadsheet row numbers, i.e. the
/// first data row is row 2.
#[must_use]
pub fn parse_sheet(mapping: &SheetMapping, rows: &[Vec<CellValue>]) -> ParsedSheet {
    let mut parsed = ParsedSheet::default();

    for (idx, row) in rows.iter().enumerate() {
        let row_number = idx + 2;
        if row.iter().all(CellValue::is_blank) {
            continue;
        }
        match parse_row(mapping, row) {
            Ok((key, entry)) => {
                if parsed.items.contains_key(&key) {
                    parsed.errors.push(format!(
                        "{} row {row_number}: duplicate item key '{key}'",
                        mapping.sheet
                    ));
                    continue;
                }
                parsed.items.insert(key, entry);
            }
            Err(reason) => parsed
                .errors
                .push(format!("{} row {row_number}: {reason}", mapping.sheet)),
        }
    }

    parsed
}

fn parse_row(mapping: &SheetMapping, row: &[CellValue]) -> Result<(String, PricingEntry), String> {
    let cell = |column: usize| row.get(column).unwrap_or(&CellValue::Empty);

    let key = cell(mapping.key_column)
        .as_text()
        .ok_or_else(|| "empty item key".to_string())?;
    let name = cell(mapping.name_column).as_text().unwrap_or_else(|| key.clone());

    let mut entry = match parse_price(cell(mapping.price_column))? {
        PriceCell::OnRequest => PricingEntry::new(name, Cents::ZERO).on_request(),
        PriceCell::Amount(price) => PricingEntry::new(name, price),
    };

    if let Some(column) = mapping.square_meters_column
        && let Some(area) = parse_count(cell(column), "floor area")?
    {
        entry = entry.with_square_meters(area);
    }
    if let Some(column) = mapping.max_quantity_column
        && let Some(max) = parse_count(cell(column), "max quantity")?
    {
        entry = entry.with_max_quantity(max);
    }

    Ok((key, entry))
}

enum PriceCell {
    OnRequest,
    Amount(Cents),
}

fn parse_price(cell: &CellValue) -> Result<PriceCell, String> {
    let price = match cell {
        CellValue::Empty => return Err("missing price".to_string()),
        CellValue::Bool(_) => return Err("price is not a number".to_string()),
        CellValue::Number(n) => {
            Cents::from_euros_f64(*n).ok_or_else(|| format!("unparsable price '{n}'"))?
        }
        CellValue::Text(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err("missing price".to_string());
            }
            if trimmed == ON_REQUEST_MARKER {
                return Ok(PriceCell::OnRequest);
            }
            Cents::parse_euros(trimmed).ok_or_else(|| format!("unparsable price '{trimmed}'"))?
        }
    };
    if price.is_negative() {
        return Err(format!("negative price {}", price.to_major_string()));
    }
    Ok(PriceCell::Amount(price))
}

fn parse_count(cell: &CellValue, what: &str) -> Result<Option<u32>, String> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= f64::from(u32::MAX) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let value = *n as u32;
            Ok(Some(value))
        }
        CellValue::Text(s) if s.trim().is_empty() => Ok(None),
        CellValue::Text(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("invalid {what} '{}'", s.trim())),
        other => Err(format!("invalid {what} {other:?}")),
    }
}
