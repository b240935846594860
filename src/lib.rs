//! # Report Ledger
//!
//! A library for turning photographed business reports into numbers in a
//! day-per-sheet xlsx ledger.
//!
//! ## Core Concepts
//!
//! - **Report Type**: One of a fixed set of report layouts (batch, day pages, lotto, shift, ...)
//! - **Recovery**: The vision model's free-form answer is mined for a JSON object, then for labelled numbers
//! - **Field Mapping**: Each report type writes its fields to fixed cells of the day's sheet
//! - **Sheet Location**: A day number 1-31 resolves to a sheet by exact name, position, then alternate names
//! - **Absent Values**: A field that could not be read is never written; the cell keeps its prior content
//!
//! ## Example
//!
//! ```rust,ignore
//! use report_ledger::*;
//! use std::path::Path;
//!
//! let config = LedgerConfig::from_env()?;
//! let processor = ReportProcessor::from_config(&config)?;
//!
//! let image = ReportImage::from_path(Path::new("lotto.jpg")).await?;
//! let request = ReportRequest::new(ReportType::Lotto, DayIdentifier::new(7)?, image);
//!
//! let outcome = processor.process(request).await;
//! println!("{}", serde_json::to_string_pretty(&outcome)?);
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod manifest;
pub mod mapping;
pub mod parsing;
pub mod processor;
pub mod recovery;
pub mod reports;
pub mod schema;
pub mod workbook;

pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, Result};
pub use llm::VisionModel;
#[cfg(feature = "gemini")]
pub use llm::GeminiClient;
pub use manifest::{load_manifest, parse_manifest, ManifestEntry};
pub use mapping::{CellWrite, FieldMapping};
pub use parsing::TrailingMinus;
pub use processor::{ProcessingOutcome, ReportProcessor, ReportRequest, Stage};
pub use recovery::recover_json_object;
pub use reports::ReportValues;
pub use schema::*;
pub use workbook::{locate_sheet, SheetHandle, SheetStrategy, WorkbookHandle, WorkbookStore};
