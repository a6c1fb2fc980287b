//! In-memory spreadsheet backend, used for `save --dry-run` and in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::sheets::{CellFormat, CellRange, Spreadsheet, SpreadsheetBackend, Worksheet};

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTab {
    pub id: i64,
    pub title: String,
    pub rows: u32,
    pub columns: u32,
    pub values: Vec<Vec<Value>>,
    pub frozen_rows: u32,
    pub formats: Vec<(CellRange, CellFormat)>,
    pub column_widths: BTreeMap<u32, u32>,
}

#[derive(Debug, Default)]
struct Book {
    id: String,
    tabs: Vec<MemoryTab>,
}

#[derive(Debug, Default)]
pub struct MemorySpreadsheets {
    books: Mutex<BTreeMap<String, Book>>,
    next_sheet_id: AtomicI64,
}

impl MemorySpreadsheets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty spreadsheet that `open_by_name` can find
    pub fn with_spreadsheet(self, name: &str) -> Self {
        {
            let mut books = self.lock();
            let id = format!("memory-{}", books.len() + 1);
            books.insert(name.to_string(), Book { id, tabs: Vec::new() });
        }
        self
    }

    /// Snapshot of every tab in the named spreadsheet
    pub fn tabs(&self, spreadsheet: &str) -> Vec<MemoryTab> {
        self.lock()
            .get(spreadsheet)
            .map(|b| b.tabs.clone())
            .unwrap_or_default()
    }

    pub fn tab(&self, spreadsheet: &str, title: &str) -> Option<MemoryTab> {
        self.tabs(spreadsheet).into_iter().find(|t| t.title == title)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Book>> {
        self.books.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_tab<T>(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        f: impl FnOnce(&mut MemoryTab) -> T,
    ) -> Result<T> {
        let mut books = self.lock();
        let book = books
            .get_mut(&spreadsheet.title)
            .ok_or_else(|| Error::SpreadsheetNotFound(spreadsheet.title.clone()))?;
        let tab = book
            .tabs
            .iter_mut()
            .find(|t| t.id == worksheet.id)
            .ok_or_else(|| Error::Api {
                service: "Sheets",
                status: 400,
                message: format!("No grid with id: {}", worksheet.id),
            })?;
        Ok(f(tab))
    }
}

#[async_trait]
impl SpreadsheetBackend for MemorySpreadsheets {
    async fn open_by_name(&self, name: &str) -> Result<Spreadsheet> {
        self.lock()
            .get(name)
            .map(|b| Spreadsheet {
                id: b.id.clone(),
                title: name.to_string(),
            })
            .ok_or_else(|| Error::SpreadsheetNotFound(name.to_string()))
    }

    async fn worksheet(&self, spreadsheet: &Spreadsheet, title: &str) -> Result<Option<Worksheet>> {
        Ok(self.tab(&spreadsheet.title, title).map(|t| Worksheet {
            id: t.id,
            title: t.title,
        }))
    }

    async fn delete_worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
    ) -> Result<()> {
        let mut books = self.lock();
        let book = books
            .get_mut(&spreadsheet.title)
            .ok_or_else(|| Error::SpreadsheetNotFound(spreadsheet.title.clone()))?;
        book.tabs.retain(|t| t.id != worksheet.id);
        Ok(())
    }

    async fn add_worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<Worksheet> {
        let mut books = self.lock();
        let book = books
            .get_mut(&spreadsheet.title)
            .ok_or_else(|| Error::SpreadsheetNotFound(spreadsheet.title.clone()))?;

        if book.tabs.iter().any(|t| t.title == title) {
            return Err(Error::Api {
                service: "Sheets",
                status: 400,
                message: format!("A sheet with the name \"{}\" already exists.", title),
            });
        }

        let id = self.next_sheet_id.fetch_add(1, Ordering::Relaxed) + 1;
        book.tabs.push(MemoryTab {
            id,
            title: title.to_string(),
            rows,
            columns,
            values: Vec::new(),
            frozen_rows: 0,
            formats: Vec::new(),
            column_widths: BTreeMap::new(),
        });

        Ok(Worksheet {
            id,
            title: title.to_string(),
        })
    }

    async fn append_row(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        values: &[Value],
    ) -> Result<()> {
        self.with_tab(spreadsheet, worksheet, |tab| {
            tab.values.push(values.to_vec());
            tab.rows = tab.rows.max(tab.values.len() as u32);
        })
    }

    async fn freeze_rows(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        rows: u32,
    ) -> Result<()> {
        self.with_tab(spreadsheet, worksheet, |tab| tab.frozen_rows = rows)
    }

    async fn format_range(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        range: CellRange,
        format: &CellFormat,
    ) -> Result<()> {
        self.with_tab(spreadsheet, worksheet, |tab| tab.formats.push((range, *format)))
    }

    async fn set_column_width(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        column: u32,
        pixels: u32,
    ) -> Result<()> {
        self.with_tab(spreadsheet, worksheet, |tab| {
            tab.column_widths.insert(column, pixels);
        })
    }
}
