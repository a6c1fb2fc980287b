use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

use crate::error::{Error, Result};
use crate::google::ensure_success_with;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// OAuth scopes requested for the service account
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// An opened spreadsheet document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spreadsheet {
    pub id: String,
    pub title: String,
}

/// One tab inside a spreadsheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub id: i64,
    pub title: String,
}

/// Zero-based, end-exclusive cell rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: u32,
    pub end_row: u32,
    pub start_column: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CellFormat {
    pub bold: bool,
    pub background: Option<Color>,
}

/// The spreadsheet operations the publisher relies on
#[async_trait]
pub trait SpreadsheetBackend: Send + Sync {
    async fn open_by_name(&self, name: &str) -> Result<Spreadsheet>;

    /// Look up a tab by exact title
    async fn worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        title: &str,
    ) -> Result<Option<Worksheet>>;

    async fn delete_worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
    ) -> Result<()>;

    async fn add_worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<Worksheet>;

    /// Append one row after the last non-empty row of the tab
    async fn append_row(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        values: &[Value],
    ) -> Result<()>;

    async fn freeze_rows(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        rows: u32,
    ) -> Result<()>;

    async fn format_range(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        range: CellRange,
        format: &CellFormat,
    ) -> Result<()>;

    async fn set_column_width(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        column: u32,
        pixels: u32,
    ) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<BatchReply>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchReply {
    add_sheet: Option<SheetEntry>,
}

/// Drive `q` expression that finds a spreadsheet by exact name
pub fn spreadsheet_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME
    )
}

/// A1 range naming a whole tab, used as the append target
pub fn tab_range(title: &str) -> String {
    format!("'{}'!A1", title.replace('\'', "''"))
}

pub fn add_sheet_request(title: &str, rows: u32, columns: u32) -> Value {
    json!({
        "addSheet": {
            "properties": {
                "title": title,
                "gridProperties": { "rowCount": rows, "columnCount": columns }
            }
        }
    })
}

pub fn delete_sheet_request(sheet_id: i64) -> Value {
    json!({ "deleteSheet": { "sheetId": sheet_id } })
}

pub fn freeze_rows_request(sheet_id: i64, rows: u32) -> Value {
    json!({
        "updateSheetProperties": {
            "properties": {
                "sheetId": sheet_id,
                "gridProperties": { "frozenRowCount": rows }
            },
            "fields": "gridProperties.frozenRowCount"
        }
    })
}

pub fn format_range_request(sheet_id: i64, range: CellRange, format: &CellFormat) -> Value {
    let mut user_format = json!({ "textFormat": { "bold": format.bold } });
    let mut fields = vec!["userEnteredFormat.textFormat.bold"];
    if let Some(color) = format.background {
        user_format["backgroundColor"] = json!({
            "red": color.red,
            "green": color.green,
            "blue": color.blue
        });
        fields.push("userEnteredFormat.backgroundColor");
    }

    json!({
        "repeatCell": {
            "range": {
                "sheetId": sheet_id,
                "startRowIndex": range.start_row,
                "endRowIndex": range.end_row,
                "startColumnIndex": range.start_column,
                "endColumnIndex": range.end_column
            },
            "cell": { "userEnteredFormat": user_format },
            "fields": fields.join(",")
        }
    })
}

pub fn column_width_request(sheet_id: i64, column: u32, pixels: u32) -> Value {
    json!({
        "updateDimensionProperties": {
            "range": {
                "sheetId": sheet_id,
                "dimension": "COLUMNS",
                "startIndex": column,
                "endIndex": column + 1
            },
            "properties": { "pixelSize": pixels },
            "fields": "pixelSize"
        }
    })
}

/// Google reason codes that mean the service account lacks access
const PERMISSION_CODES: &[&str] = &[
    "PERMISSION_DENIED",
    "forbidden",
    "insufficientPermissions",
    "insufficientFilePermissions",
    "appNotAuthorizedToFile",
];

/// Map statuses that mean "you cannot use this spreadsheet".
///
/// A 403 only counts as access denied when Google says so; quota and rate
/// limit 403s stay API errors.
pub(crate) fn spreadsheet_error(status: StatusCode, codes: &[String], name: &str) -> Option<Error> {
    if status == StatusCode::NOT_FOUND {
        return Some(Error::SpreadsheetNotFound(name.to_string()));
    }
    let denied = codes.iter().any(|c| PERMISSION_CODES.contains(&c.as_str()));
    if status == StatusCode::FORBIDDEN && denied {
        return Some(Error::AccessDenied(name.to_string()));
    }
    None
}

/// Google Sheets client authorized as a service account
pub struct GoogleSheets {
    client: Client,
    token: String,
}

impl GoogleSheets {
    /// Read a service account JSON key from disk and authorize with it
    pub async fn from_key_file(path: &Path) -> Result<Self> {
        let key = yup_oauth2::read_service_account_key(path).await.map_err(|e| {
            Error::InvalidCredentials(format!(
                "could not read service account key {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::connect(key).await
    }

    /// Exchange the service account key for an access token
    pub async fn connect(key: ServiceAccountKey) -> Result<Self> {
        let auth = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|e| Error::InvalidCredentials(format!("service account: {}", e)))?;

        let token = auth
            .token(SCOPES)
            .await
            .map_err(|e| Error::InvalidCredentials(format!("token request failed: {}", e)))?;
        let token = token
            .token()
            .ok_or_else(|| Error::InvalidCredentials("no access token returned".to_string()))?;

        Self::with_token(token)
    }

    /// Use an already issued OAuth access token
    pub fn with_token(token: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    fn sheets_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_BASE_URL)
            .map_err(|e| Error::Config(format!("bad Sheets URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config("Sheets URL cannot be a base".to_string()))?
            .extend(segments);
        Ok(url)
    }

    async fn batch_update(
        &self,
        spreadsheet: &Spreadsheet,
        requests: Vec<Value>,
    ) -> Result<BatchUpdateResponse> {
        let segment = format!("{}:batchUpdate", spreadsheet.id);
        let url = self.sheets_url(&[segment.as_str()])?;
        debug!(spreadsheet = %spreadsheet.title, requests = requests.len(), "Sheets batchUpdate");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({ "requests": requests }))
            .send()
            .await?;

        let response = ensure_success_with("Sheets", response, |status, codes| {
            spreadsheet_error(status, codes, &spreadsheet.title)
        })
        .await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SpreadsheetBackend for GoogleSheets {
    async fn open_by_name(&self, name: &str) -> Result<Spreadsheet> {
        debug!(name, "looking up spreadsheet in Drive");
        let response = self
            .client
            .get(DRIVE_FILES_URL)
            .bearer_auth(&self.token)
            .query(&[
                ("q", spreadsheet_query(name).as_str()),
                ("fields", "files(id,name)"),
                ("pageSize", "1"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;

        let response = ensure_success_with("Drive", response, |status, codes| {
            spreadsheet_error(status, codes, name)
        })
        .await?;
        let list: DriveFileList = response.json().await?;

        list.files
            .into_iter()
            .next()
            .map(|f| Spreadsheet {
                id: f.id,
                title: f.name,
            })
            .ok_or_else(|| Error::SpreadsheetNotFound(name.to_string()))
    }

    async fn worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        title: &str,
    ) -> Result<Option<Worksheet>> {
        let url = self.sheets_url(&[spreadsheet.id.as_str()])?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .send()
            .await?;

        let response = ensure_success_with("Sheets", response, |status, codes| {
            spreadsheet_error(status, codes, &spreadsheet.title)
        })
        .await?;
        let meta: SpreadsheetMeta = response.json().await?;

        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .find(|p| p.title == title)
            .map(|p| Worksheet {
                id: p.sheet_id,
                title: p.title,
            }))
    }

    async fn delete_worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
    ) -> Result<()> {
        self.batch_update(spreadsheet, vec![delete_sheet_request(worksheet.id)])
            .await?;
        Ok(())
    }

    async fn add_worksheet(
        &self,
        spreadsheet: &Spreadsheet,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<Worksheet> {
        let response = self
            .batch_update(spreadsheet, vec![add_sheet_request(title, rows, columns)])
            .await?;

        response
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|s| Worksheet {
                id: s.properties.sheet_id,
                title: s.properties.title,
            })
            .ok_or_else(|| Error::Api {
                service: "Sheets",
                status: 200,
                message: "addSheet reply missing from batchUpdate response".to_string(),
            })
    }

    async fn append_row(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        values: &[Value],
    ) -> Result<()> {
        let range = format!("{}:append", tab_range(&worksheet.title));
        let url = self.sheets_url(&[spreadsheet.id.as_str(), "values", range.as_str()])?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [values] }))
            .send()
            .await?;

        ensure_success_with("Sheets", response, |status, codes| {
            spreadsheet_error(status, codes, &spreadsheet.title)
        })
        .await?;
        Ok(())
    }

    async fn freeze_rows(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        rows: u32,
    ) -> Result<()> {
        self.batch_update(spreadsheet, vec![freeze_rows_request(worksheet.id, rows)])
            .await?;
        Ok(())
    }

    async fn format_range(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        range: CellRange,
        format: &CellFormat,
    ) -> Result<()> {
        self.batch_update(
            spreadsheet,
            vec![format_range_request(worksheet.id, range, format)],
        )
        .await?;
        Ok(())
    }

    async fn set_column_width(
        &self,
        spreadsheet: &Spreadsheet,
        worksheet: &Worksheet,
        column: u32,
        pixels: u32,
    ) -> Result<()> {
        self.batch_update(
            spreadsheet,
            vec![column_width_request(worksheet.id, column, pixels)],
        )
        .await?;
        Ok(())
    }
}
