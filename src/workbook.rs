//! The ledger workbook: locating a day's sheet and persisting the document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use log::{debug, info, warn};
use tokio::sync::{Mutex, MutexGuard};
use umya_spreadsheet::{Spreadsheet, Worksheet};

use crate::error::{LedgerError, Result};
use crate::mapping::CellWrite;
use crate::schema::{CellAddress, DayIdentifier};

/// The rules tried, in order, to turn a day number into a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetStrategy {
    /// A sheet named exactly `"7"`.
    ExactName,
    /// The 7th sheet of the workbook.
    Position,
    /// A sheet named `"Sheet7"` or `"Day 7"`.
    AlternateName,
}

pub const SHEET_STRATEGIES: [SheetStrategy; 3] = [
    SheetStrategy::ExactName,
    SheetStrategy::Position,
    SheetStrategy::AlternateName,
];

impl SheetStrategy {
    pub fn resolve(&self, names: &[String], day: DayIdentifier) -> Option<usize> {
        let n = day.get() as usize;
        match self {
            SheetStrategy::ExactName => {
                let wanted = n.to_string();
                names.iter().position(|name| *name == wanted)
            }
            SheetStrategy::Position => (n <= names.len()).then(|| n - 1),
            SheetStrategy::AlternateName => {
                let candidates = [format!("Sheet{}", n), format!("Day {}", n)];
                names.iter().position(|name| candidates.contains(name))
            }
        }
    }
}

/// Resolves `day` against the sheet names, read-only. On failure the error
/// carries every sheet name that was present.
pub fn locate_sheet(names: &[String], day: DayIdentifier) -> Result<(SheetStrategy, usize)> {
    SHEET_STRATEGIES
        .iter()
        .find_map(|s| s.resolve(names, day).map(|idx| (*s, idx)))
        .ok_or_else(|| LedgerError::SheetNotFound {
            day: day.get(),
            available: names.to_vec(),
        })
}

/// Gateway to the single persisted workbook document.
///
/// Clones share one write lock, so holding [`WorkbookStore::lock`] across a
/// load/mutate/save cycle serializes writers that use the same store. The
/// bare `load`/`save` pair takes no lock: overlapping cycles are
/// last-writer-wins.
#[derive(Debug, Clone)]
pub struct WorkbookStore {
    path: PathBuf,
    backup_on_save: bool,
    write_lock: Arc<Mutex<()>>,
}

impl WorkbookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_on_save: false,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_backup(mut self, enabled: bool) -> Self {
        self.backup_on_save = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// Parses the document on the blocking pool.
    pub async fn load(&self) -> Result<WorkbookHandle> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(LedgerError::Persistence(format!(
                "Workbook not found at {}",
                self.path.display()
            )));
        }

        let path = self.path.clone();
        let book = tokio::task::spawn_blocking(move || {
            umya_spreadsheet::reader::xlsx::read(&path).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| LedgerError::Persistence(format!("Workbook reader task failed: {}", e)))?
        .map_err(|e| {
            LedgerError::Persistence(format!(
                "Could not read workbook {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!("Loaded workbook {}", self.path.display());
        Ok(WorkbookHandle { book })
    }

    /// Writes the whole document back: serialize to a temporary sibling file
    /// on the blocking pool, then rename it over the target. The temporary
    /// file never outlives a failed save.
    pub async fn save(&self, handle: WorkbookHandle) -> Result<()> {
        let tmp_path = self.tmp_path()?;

        let target = tmp_path.clone();
        let written = tokio::task::spawn_blocking(move || {
            umya_spreadsheet::writer::xlsx::write(&handle.book, &target).map_err(|e| e.to_string())
        })
        .await;
        let failure = match written {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("Could not serialize workbook: {}", e)),
            Err(e) => Some(format!("Workbook writer task failed: {}", e)),
        };
        if let Some(message) = failure {
            discard(&tmp_path).await;
            return Err(LedgerError::Persistence(message));
        }

        if self.backup_on_save && tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            let backup = self.backup_path().await;
            match tokio::fs::copy(&self.path, &backup).await {
                Ok(_) => info!("Backup saved as {}", backup.display()),
                Err(e) => warn!("Could not create backup {}: {}", backup.display(), e),
            }
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            discard(&tmp_path).await;
            return Err(LedgerError::Persistence(format!(
                "Could not replace {}: {}",
                self.path.display(),
                e
            )));
        }

        info!("Workbook saved to {}", self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                LedgerError::Persistence(format!("Invalid workbook path {}", self.path.display()))
            })?;
        Ok(self.path.with_file_name(format!(".{}.tmp.xlsx", file_name)))
    }

    /// `<stem>.backup_<timestamp>.xlsx`, with a counter suffix if that name is
    /// already taken.
    async fn backup_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("workbook");
        let stamp = Local::now().format("%Y%m%dT%H%M%S%3f");

        let mut candidate = self
            .path
            .with_file_name(format!("{}.backup_{}.xlsx", stem, stamp));
        let mut counter = 1;
        while tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            candidate = self
                .path
                .with_file_name(format!("{}.backup_{}_{}.xlsx", stem, stamp, counter));
            counter += 1;
        }
        candidate
    }
}

async fn discard(tmp_path: &Path) {
    if let Err(e) = tokio::fs::remove_file(tmp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove temporary file {}: {}", tmp_path.display(), e);
        }
    }
}

/// One request's in-memory copy of the workbook.
pub struct WorkbookHandle {
    book: Spreadsheet,
}

impl From<Spreadsheet> for WorkbookHandle {
    fn from(book: Spreadsheet) -> Self {
        Self { book }
    }
}

impl WorkbookHandle {
    pub fn sheet_names(&self) -> Vec<String> {
        self.book
            .get_sheet_collection()
            .iter()
            .map(|ws| ws.get_name().to_string())
            .collect()
    }

    /// Finds the sheet for `day` without creating anything.
    pub fn sheet_for_day(&mut self, day: DayIdentifier) -> Result<SheetHandle<'_>> {
        let names = self.sheet_names();
        let (strategy, idx) = locate_sheet(&names, day)?;
        let name = &names[idx];
        debug!("Day {} resolved to sheet '{}' via {:?}", day, name, strategy);

        let sheet = self
            .book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| LedgerError::SheetNotFound {
                day: day.get(),
                available: names.clone(),
            })?;
        Ok(SheetHandle { sheet })
    }

    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.book.get_sheet_by_name(name)
    }

    pub fn into_inner(self) -> Spreadsheet {
        self.book
    }
}

/// Mutable view of one day sheet, borrowed from its [`WorkbookHandle`].
pub struct SheetHandle<'a> {
    sheet: &'a mut Worksheet,
}

impl SheetHandle<'_> {
    pub fn name(&self) -> &str {
        self.sheet.get_name()
    }

    /// Assigns a number to `cell`; style and neighbouring cells are untouched.
    pub fn write_number(&mut self, cell: &CellAddress, value: f64) {
        self.sheet
            .get_cell_mut(cell.to_string().as_str())
            .set_value_number(value);
    }

    pub fn apply(&mut self, writes: &[CellWrite]) {
        for write in writes {
            debug!(
                "Writing {} = {} to {}!{}",
                write.field,
                write.value,
                self.name(),
                write.cell
            );
            self.write_number(&write.cell, write.value);
        }
    }

    pub fn number_at(&self, cell: &CellAddress) -> Option<f64> {
        self.sheet
            .get_cell(cell.to_string().as_str())
            .and_then(|c| c.get_value_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn day(n: u32) -> DayIdentifier {
        DayIdentifier::new(n).unwrap()
    }

    #[test]
    fn test_exact_name_wins_over_position() {
        let sheets = names(&["Summary", "5", "x", "y", "z"]);
        assert_eq!(
            locate_sheet(&sheets, day(5)).unwrap(),
            (SheetStrategy::ExactName, 1)
        );
    }

    #[test]
    fn test_positional_fallback() {
        let sheets = names(&["a", "b", "c", "d", "e", "f"]);
        assert_eq!(
            locate_sheet(&sheets, day(5)).unwrap(),
            (SheetStrategy::Position, 4)
        );
    }

    #[test]
    fn test_alternate_names() {
        let sheets = names(&["Cover", "Day 9"]);
        assert_eq!(
            locate_sheet(&sheets, day(9)).unwrap(),
            (SheetStrategy::AlternateName, 1)
        );
        let sheets = names(&["Sheet12"]);
        assert_eq!(
            locate_sheet(&sheets, day(12)).unwrap(),
            (SheetStrategy::AlternateName, 0)
        );
    }

    #[test]
    fn test_missing_sheet_lists_available_names() {
        let sheets = names(&["Jan", "Feb"]);
        match locate_sheet(&sheets, day(3)) {
            Err(LedgerError::SheetNotFound { day, available }) => {
                assert_eq!(day, 3);
                assert_eq!(available, sheets);
            }
            other => panic!("expected SheetNotFound, got {:?}", other),
        }
    }
}
