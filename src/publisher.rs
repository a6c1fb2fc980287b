use chrono::{Local, NaiveDate};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::VideoRecord;
use crate::sheets::{CellFormat, CellRange, Color, Spreadsheet, SpreadsheetBackend, Worksheet};

/// Grid size of a freshly created tab
pub const GRID_ROWS: u32 = 100;
pub const GRID_COLUMNS: u32 = 10;

/// Characters of the query kept in the tab name
pub const TAB_QUERY_CHARS: usize = 20;
/// Characters of a description kept per cell
pub const DESCRIPTION_LIMIT: usize = 500;
pub const NO_DESCRIPTION: &str = "No description.";

pub const HEADERS: [&str; 8] = [
    "#",
    "Title",
    "Views",
    "Published At",
    "Video URL",
    "Description",
    "Thumbnail URL",
    "Language",
];

/// A1:H1
const HEADER_RANGE: CellRange = CellRange {
    start_row: 0,
    end_row: 1,
    start_column: 0,
    end_column: HEADERS.len() as u32,
};
const HEADER_BACKGROUND: Color = Color {
    red: 0.9,
    green: 0.9,
    blue: 0.9,
};
/// (zero-based column, width in pixels) for Title (B) and Description (F)
const WIDE_COLUMNS: [(u32, u32); 2] = [(1, 400), (5, 500)];

/// Outcome of a publish that wrote its rows
#[derive(Debug)]
pub struct PublishReport {
    pub spreadsheet: String,
    pub tab_name: String,
    pub rows_written: usize,
    /// A same-named tab existed and was deleted first
    pub replaced_existing: bool,
    /// Set when the data was saved but the cosmetic formatting failed
    pub formatting_error: Option<Error>,
}

impl PublishReport {
    pub fn is_formatted(&self) -> bool {
        self.formatting_error.is_none()
    }
}

/// Tab name for a query on a given day: first 20 characters, trimmed,
/// lowercased, spaces replaced by underscores, then `_YYYY-MM-DD`.
pub fn tab_name(query: &str, date: NaiveDate) -> String {
    let prefix: String = query.chars().take(TAB_QUERY_CHARS).collect();
    format!(
        "{}_{}",
        prefix.trim().to_lowercase().replace(' ', "_"),
        date.format("%Y-%m-%d")
    )
}

/// Description as stored in the sheet
pub fn cell_description(description: &str) -> String {
    if description.trim().is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    description.chars().take(DESCRIPTION_LIMIT).collect()
}

/// One data row, `index` being the 1-based position in the ranked list
pub fn video_row(index: usize, video: &VideoRecord) -> Vec<Value> {
    vec![
        json!(index),
        json!(video.title),
        json!(video.view_count),
        json!(video.published_at),
        json!(video.video_url),
        json!(cell_description(&video.description)),
        json!(video.thumbnail_url),
        json!(video.audio_language),
    ]
}

pub fn header_row() -> Vec<Value> {
    HEADERS.iter().map(|h| json!(h)).collect()
}

/// Writes a ranked video list into a fresh tab of a spreadsheet.
///
/// The tab is replaced by deleting any same-named tab and creating a new one.
/// The steps are not transactional: if the process stops after the tab is
/// created, the tab is left with only the rows written so far.
pub struct SheetPublisher<S> {
    backend: S,
}

impl<S: SpreadsheetBackend> SheetPublisher<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Publish under today's local date
    pub async fn publish(
        &self,
        records: &[VideoRecord],
        topic: &str,
        spreadsheet_name: &str,
    ) -> Result<PublishReport> {
        self.publish_on(records, topic, spreadsheet_name, Local::now().date_naive())
            .await
    }

    pub async fn publish_on(
        &self,
        records: &[VideoRecord],
        topic: &str,
        spreadsheet_name: &str,
        date: NaiveDate,
    ) -> Result<PublishReport> {
        let spreadsheet = self.backend.open_by_name(spreadsheet_name).await?;
        let title = tab_name(topic, date);

        let replaced_existing = match self.backend.worksheet(&spreadsheet, &title).await? {
            Some(existing) => {
                info!(tab = %title, "replacing existing tab");
                self.backend.delete_worksheet(&spreadsheet, &existing).await?;
                true
            }
            None => false,
        };

        let worksheet = self
            .backend
            .add_worksheet(&spreadsheet, &title, GRID_ROWS, GRID_COLUMNS)
            .await?;

        self.backend
            .append_row(&spreadsheet, &worksheet, &header_row())
            .await?;
        for (i, video) in records.iter().enumerate() {
            self.backend
                .append_row(&spreadsheet, &worksheet, &video_row(i + 1, video))
                .await?;
        }
        info!(tab = %title, rows = records.len(), "rows written");

        let formatting_error = match self.apply_formatting(&spreadsheet, &worksheet).await {
            Ok(()) => None,
            Err(e) => {
                warn!(tab = %title, error = %e, "formatting failed, data was saved unformatted");
                Some(e)
            }
        };

        Ok(PublishReport {
            spreadsheet: spreadsheet.title,
            tab_name: title,
            rows_written: records.len(),
            replaced_existing,
            formatting_error,
        })
    }

    async fn apply_formatting(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
    ) -> Result<()> {
        self.backend.freeze_rows(spreadsheet, worksheet, 1).await?;

        let header = CellFormat {
            bold: true,
            background: Some(HEADER_BACKGROUND),
        };
        self.backend
            .format_range(spreadsheet, worksheet, HEADER_RANGE, &header)
            .await?;

        for (column, pixels) in WIDE_COLUMNS {
            self.backend
                .set_column_width(spreadsheet, worksheet, column, pixels)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::memory::MemorySpreadsheets;

    const BOOK: &str = "Videos YouTube";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn video(id: &str, views: u64, description: &str) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: format!("Video {}", id),
            description: description.to_string(),
            thumbnail_url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id),
            video_url: VideoRecord::watch_url(id),
            view_count: views,
            published_at: "2024-04-30T12:00:00Z".to_string(),
            audio_language: "pt-BR".to_string(),
        }
    }

    /// Delegates to memory but refuses to freeze rows
    struct NoFormatting(MemorySpreadsheets);

    #[async_trait]
    impl SpreadsheetBackend for NoFormatting {
        async fn open_by_name(&self, name: &str) -> Result<Spreadsheet> {
            self.0.open_by_name(name).await
        }
        async fn worksheet(&self, s: &Spreadsheet, title: &str) -> Result<Option<Worksheet>> {
            self.0.worksheet(s, title).await
        }
        async fn delete_worksheet(&self, s: &Spreadsheet, w: &Worksheet) -> Result<()> {
            self.0.delete_worksheet(s, w).await
        }
        async fn add_worksheet(
            &self,
            s: &Spreadsheet,
            title: &str,
            rows: u32,
            cols: u32,
        ) -> Result<Worksheet> {
            self.0.add_worksheet(s, title, rows, cols).await
        }
        async fn append_row(
            &self,
            s: &Spreadsheet,
            w: &Worksheet,
            values: &[Value],
        ) -> Result<()> {
            self.0.append_row(s, w, values).await
        }
        async fn freeze_rows(&self, _: &Spreadsheet, _: &Worksheet, _: u32) -> Result<()> {
            Err(Error::Api {
                service: "Sheets",
                status: 500,
                message: "formatting unavailable".into(),
            })
        }
        async fn format_range(
            &self,
            _: &Spreadsheet,
            _: &Worksheet,
            _: CellRange,
            _: &CellFormat,
        ) -> Result<()> {
            Ok(())
        }
        async fn set_column_width(
            &self,
            _: &Spreadsheet,
            _: &Worksheet,
            _: u32,
            _: u32,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tab_name_truncates_by_characters() {
        assert_eq!(
            tab_name("Inteligência Artificial para negócios", date()),
            "inteligência_artific_2024-05-01"
        );
    }

    #[test]
    fn tab_name_trims_after_truncating() {
        assert_eq!(tab_name("  Rust  ", date()), "rust_2024-05-01");
        // 20th character is a space
        assert_eq!(
            tab_name("Nineteen characters here", date()),
            "nineteen_characters_2024-05-01"
        );
        assert_eq!(tab_name("Short", date()), "short_2024-05-01");
    }

    #[test]
    fn long_descriptions_are_cut_to_limit() {
        let long = "é".repeat(DESCRIPTION_LIMIT + 25);
        let cell = cell_description(&long);
        assert_eq!(cell.chars().count(), DESCRIPTION_LIMIT);

        let exact = "x".repeat(DESCRIPTION_LIMIT);
        assert_eq!(cell_description(&exact), exact);
        assert_eq!(cell_description("short one"), "short one");
    }

    #[test]
    fn empty_description_gets_placeholder() {
        assert_eq!(cell_description(""), NO_DESCRIPTION);
        assert_eq!(cell_description("   "), NO_DESCRIPTION);
    }

    #[test]
    fn row_layout_matches_headers() {
        let row = video_row(3, &video("abc", 1500, "desc"));
        assert_eq!(row.len(), HEADERS.len());
        assert_eq!(row[0], json!(3));
        assert_eq!(row[2], json!(1500));
        assert_eq!(row[4], json!("https://www.youtube.com/watch?v=abc"));
        assert_eq!(row[5], json!("desc"));
        assert_eq!(row[7], json!("pt-BR"));
    }

    #[tokio::test]
    async fn publish_writes_header_and_rows_in_input_order() {
        let publisher = SheetPublisher::new(MemorySpreadsheets::new().with_spreadsheet(BOOK));
        let records = vec![video("low", 1, "a"), video("high", 900, "b")];

        let report = publisher
            .publish_on(&records, "Rust async", BOOK, date())
            .await
            .unwrap();

        assert_eq!(report.tab_name, "rust_async_2024-05-01");
        assert_eq!(report.rows_written, 2);
        assert!(!report.replaced_existing);
        assert!(report.is_formatted());

        let tab = publisher.backend().tab(BOOK, &report.tab_name).unwrap();
        assert_eq!((tab.rows, tab.columns), (GRID_ROWS, GRID_COLUMNS));
        assert_eq!(tab.values.len(), 3);
        assert_eq!(tab.values[0], header_row());
        assert_eq!(tab.values[1][1], json!("Video low"));
        assert_eq!(tab.values[2][1], json!("Video high"));
    }

    #[tokio::test]
    async fn publish_applies_header_formatting() {
        let publisher = SheetPublisher::new(MemorySpreadsheets::new().with_spreadsheet(BOOK));
        let report = publisher
            .publish_on(&[video("a", 1, "")], "topic", BOOK, date())
            .await
            .unwrap();

        let tab = publisher.backend().tab(BOOK, &report.tab_name).unwrap();
        assert_eq!(tab.frozen_rows, 1);
        assert_eq!(tab.formats.len(), 1);
        let (range, format) = tab.formats[0];
        assert_eq!(
            range,
            CellRange {
                start_row: 0,
                end_row: 1,
                start_column: 0,
                end_column: 8,
            }
        );
        assert!(format.bold);
        assert_eq!(tab.column_widths.len(), 2);
        assert_eq!(tab.column_widths.get(&1), Some(&400));
        assert_eq!(tab.column_widths.get(&5), Some(&500));
        assert_eq!(tab.values[1][5], json!(NO_DESCRIPTION));
    }

    #[tokio::test]
    async fn publishing_twice_replaces_the_tab() {
        let publisher = SheetPublisher::new(MemorySpreadsheets::new().with_spreadsheet(BOOK));

        publisher
            .publish_on(&[video("a", 1, ""), video("b", 2, "")], "topic", BOOK, date())
            .await
            .unwrap();
        let second = publisher
            .publish_on(&[video("c", 3, "")], "topic", BOOK, date())
            .await
            .unwrap();

        assert!(second.replaced_existing);
        let tabs = publisher.backend().tabs(BOOK);
        let matching: Vec<_> = tabs.iter().filter(|t| t.title == second.tab_name).collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].values.len(), 2);
        assert_eq!(matching[0].values[1][1], json!("Video c"));
    }

    #[tokio::test]
    async fn other_days_keep_their_own_tabs() {
        let publisher = SheetPublisher::new(MemorySpreadsheets::new().with_spreadsheet(BOOK));
        let next_day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();

        publisher.publish_on(&[], "topic", BOOK, date()).await.unwrap();
        publisher.publish_on(&[], "topic", BOOK, next_day).await.unwrap();

        assert_eq!(publisher.backend().tabs(BOOK).len(), 2);
    }

    #[tokio::test]
    async fn missing_spreadsheet_writes_nothing() {
        let publisher = SheetPublisher::new(MemorySpreadsheets::new().with_spreadsheet(BOOK));

        let err = publisher
            .publish_on(&[video("a", 1, "")], "topic", "Nope", date())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SpreadsheetNotFound(_)));
        assert!(publisher.backend().tabs(BOOK).is_empty());
    }

    #[tokio::test]
    async fn formatting_failure_keeps_the_data() {
        let publisher =
            SheetPublisher::new(NoFormatting(MemorySpreadsheets::new().with_spreadsheet(BOOK)));

        let report = publisher
            .publish_on(&[video("a", 1, "")], "topic", BOOK, date())
            .await
            .unwrap();

        assert!(!report.is_formatted());
        assert!(matches!(report.formatting_error, Some(Error::Api { status: 500, .. })));
        let tab = publisher.backend().0.tab(BOOK, &report.tab_name).unwrap();
        assert_eq!(tab.values.len(), 2);
    }
}
