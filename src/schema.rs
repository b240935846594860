use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{LedgerError, Result};

/// The kinds of paper report the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Batch,
    Day1,
    Day2,
    Day3,
    Handwritten,
    Lotto,
    HandwrittenLottoEnd,
    Shift,
}

impl ReportType {
    pub const ALL: [ReportType; 8] = [
        ReportType::Batch,
        ReportType::Day1,
        ReportType::Day2,
        ReportType::Day3,
        ReportType::Handwritten,
        ReportType::Lotto,
        ReportType::HandwrittenLottoEnd,
        ReportType::Shift,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Batch => "batch",
            ReportType::Day1 => "day1",
            ReportType::Day2 => "day2",
            ReportType::Day3 => "day3",
            ReportType::Handwritten => "handwritten",
            ReportType::Lotto => "lotto",
            ReportType::HandwrittenLottoEnd => "handwritten_lotto_end",
            ReportType::Shift => "shift",
        }
    }

    /// How many images a single request of this type may carry.
    pub fn max_images(&self) -> usize {
        match self {
            ReportType::HandwrittenLottoEnd => 2,
            ReportType::Shift => 3,
            _ => 1,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ReportType::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| LedgerError::InputValidation(format!("Unknown report type '{}'", s)))
    }
}

/// Logical handle (1-31) for one sheet of the ledger workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DayIdentifier(u8);

impl DayIdentifier {
    pub fn new(day: u32) -> Result<Self> {
        if !(1..=31).contains(&day) {
            return Err(LedgerError::InputValidation(format!(
                "Day number {} is out of range: must be between 1 and 31",
                day
            )));
        }
        Ok(Self(day as u8))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for DayIdentifier {
    type Error = LedgerError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(LedgerError::InputValidation(format!(
                "Day number {} is not a whole number",
                value
            )));
        }
        if !(1.0..=31.0).contains(&value) {
            return Err(LedgerError::InputValidation(format!(
                "Day number {} is out of range: must be between 1 and 31",
                value
            )));
        }
        Self::new(value as u32)
    }
}

impl FromStr for DayIdentifier {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InputValidation("Day number is missing".to_string()));
        }
        let value: f64 = trimmed.parse().map_err(|_| {
            LedgerError::InputValidation(format!("Day number '{}' is not a number", trimmed))
        })?;
        Self::try_from(value)
    }
}

impl fmt::Display for DayIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A spreadsheet cell such as `Z10`: column letters plus a 1-based row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    column: u32,
    row: u32,
}

impl CellAddress {
    /// `column` is 1-based (`A` = 1).
    pub fn new(column: u32, row: u32) -> Result<Self> {
        if column == 0 || row == 0 {
            return Err(LedgerError::InvalidCellAddress(format!(
                "column {} row {}",
                column, row
            )));
        }
        Ok(Self { column, row })
    }

    pub fn parse(address: &str) -> Result<Self> {
        let invalid = || LedgerError::InvalidCellAddress(address.to_string());
        let split = address
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = address.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        let column = column_index(letters).ok_or_else(invalid)?;
        Self::new(column, row)
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn column_letters(&self) -> String {
        column_letters(self.column)
    }

    /// The cell `offset` columns to the right on the same row.
    pub fn shifted_right(&self, offset: u32) -> Self {
        Self {
            column: self.column + offset,
            row: self.row,
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letters(), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for CellAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        c.is_ascii_uppercase()
            .then(|| acc * 26 + (c as u32 - 'A' as u32 + 1))
    })
}

pub fn column_letters(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// One photographed report page, held in memory for the inference call.
#[derive(Debug, Clone)]
pub struct ReportImage {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ReportImage {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LedgerError::InputValidation(format!("Invalid image path: {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            LedgerError::InputValidation(format!("Could not read image {}: {}", path.display(), e))
        })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();
        Ok(Self::new(name, mime_type, bytes))
    }
}

/// Field values recovered from one request's inference responses.
///
/// `None` means "not found" and is never conflated with zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub report: ReportType,
    pub values: BTreeMap<String, Option<f64>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sequences: BTreeMap<String, Vec<Option<f64>>>,
}

impl ExtractionResult {
    pub fn new(report: ReportType) -> Self {
        Self {
            report,
            values: BTreeMap::new(),
            sequences: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: &str, value: Option<f64>) -> Self {
        self.values.insert(field.to_string(), value);
        self
    }

    pub fn with_sequence(mut self, field: &str, values: Vec<Option<f64>>) -> Self {
        self.sequences.insert(field.to_string(), values);
        self
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }

    pub fn sequence(&self, field: &str) -> Option<&[Option<f64>]> {
        self.sequences.get(field).map(Vec::as_slice)
    }

    pub fn has_usable_value(&self) -> bool {
        self.values.values().any(Option::is_some)
            || self
                .sequences
                .values()
                .any(|seq| seq.iter().any(Option::is_some))
    }
}
