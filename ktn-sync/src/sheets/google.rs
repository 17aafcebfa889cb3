//! Google Sheets API v4 client
//!
//! Reads spreadsheet metadata (sheet ids, titles, merges) and the formatted
//! cell values of one sheet. Authenticates with either an API key (public or
//! link-shared spreadsheets) or an OAuth bearer token.

use super::{MergeRegion, RawGrid, SheetInfo, Spreadsheet, SpreadsheetSource};
use async_trait::async_trait;
use ktn_common::config::AppConfig;
use ktn_common::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const USER_AGENT: &str = concat!("ktn-sync/", env!("CARGO_PKG_VERSION"));
const METADATA_FIELDS: &str = "spreadsheetId,properties.title,sheets(properties(sheetId,title),merges)";

/// Sheets client errors
#[derive(Debug, thiserror::Error)]
pub enum SheetsApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<SheetsApiError> for Error {
    fn from(err: SheetsApiError) -> Self {
        Error::RemoteFetch(err.to_string())
    }
}

/// Credentials for the Sheets API
#[derive(Debug, Clone)]
pub enum SheetsAuth {
    ApiKey(String),
    AccessToken(String),
}

impl SheetsAuth {
    /// Credentials from configuration, the access token wins when both are set
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match (&config.sheets_access_token, &config.sheets_api_key) {
            (Some(token), _) => Ok(SheetsAuth::AccessToken(token.clone())),
            (None, Some(key)) => Ok(SheetsAuth::ApiKey(key.clone())),
            (None, None) => Err(Error::Config(
                "Sheets API credentials not configured".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetResponse {
    spreadsheet_id: String,
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetResponse>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetResponse {
    properties: SheetProperties,
    #[serde(default)]
    merges: Vec<GridRange>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    // Zero-valued fields are omitted from API responses
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridRange {
    #[serde(default)]
    start_row_index: usize,
    #[serde(default)]
    end_row_index: usize,
    #[serde(default)]
    start_column_index: usize,
    #[serde(default)]
    end_column_index: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: RawGrid,
}

impl From<SpreadsheetResponse> for Spreadsheet {
    fn from(response: SpreadsheetResponse) -> Self {
        Spreadsheet {
            id: response.spreadsheet_id,
            title: response.properties.title,
            sheets: response
                .sheets
                .into_iter()
                .map(|sheet| SheetInfo {
                    sheet_id: sheet.properties.sheet_id,
                    title: sheet.properties.title,
                    merges: sheet
                        .merges
                        .iter()
                        .map(|m| {
                            MergeRegion::new(
                                m.start_row_index,
                                m.end_row_index,
                                m.start_column_index,
                                m.end_column_index,
                            )
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Quote a sheet title for A1 notation
fn a1_range(sheet_title: &str, range: &str) -> String {
    format!("'{}'!{}", sheet_title.replace('\'', "''"), range)
}

/// Google Sheets API client
pub struct GoogleSheetsClient {
    http_client: reqwest::Client,
    auth: SheetsAuth,
    parse_range: String,
    base_url: String,
}

impl GoogleSheetsClient {
    pub fn new(auth: SheetsAuth, parse_range: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SheetsApiError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            auth,
            parse_range: parse_range.into(),
            base_url: SHEETS_BASE_URL.to_string(),
        })
    }

    /// Client configured from [`AppConfig`]
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(SheetsAuth::from_config(config)?, config.sheet_parse_range.clone())
    }

    fn url(&self, segments: &[&str]) -> std::result::Result<reqwest::Url, SheetsApiError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| SheetsApiError::ParseError(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SheetsApiError::ParseError(format!("Invalid base URL {}", self.base_url)))?
            .push("spreadsheets")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: reqwest::Url,
        query: &[(&str, &str)],
    ) -> std::result::Result<T, SheetsApiError> {
        let mut request = self.http_client.get(url.clone()).query(query);
        request = match &self.auth {
            SheetsAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
            SheetsAuth::AccessToken(token) => request.bearer_auth(token),
        };

        tracing::debug!(url = %url, "Querying Sheets API");

        let response = request
            .send()
            .await
            .map_err(|e| SheetsApiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsApiError::ApiError(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| SheetsApiError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl SpreadsheetSource for GoogleSheetsClient {
    async fn spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        let url = self.url(&[spreadsheet_id])?;
        let response: SpreadsheetResponse =
            self.get_json(url, &[("fields", METADATA_FIELDS)]).await?;

        let spreadsheet = Spreadsheet::from(response);
        tracing::debug!(
            spreadsheet_id = %spreadsheet.id,
            title = %spreadsheet.title,
            sheets = spreadsheet.sheets.len(),
            "Retrieved spreadsheet metadata"
        );
        Ok(spreadsheet)
    }

    async fn fetch_grid(&self, spreadsheet_id: &str, sheet_title: &str) -> Result<RawGrid> {
        let range = a1_range(sheet_title, &self.parse_range);
        let url = self.url(&[spreadsheet_id, "values", &range])?;
        let response: ValueRange = self.get_json(url, &[]).await?;

        tracing::debug!(
            sheet = %sheet_title,
            rows = response.values.len(),
            "Retrieved sheet values"
        );
        Ok(response.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a1_range_quotes_title() {
        assert_eq!(a1_range("17.05", "A1:AZ"), "'17.05'!A1:AZ");
        assert_eq!(a1_range("Срочные заказы", "A1:AZ"), "'Срочные заказы'!A1:AZ");
        assert_eq!(a1_range("it's", "A1:B"), "'it''s'!A1:B");
    }

    #[test]
    fn test_metadata_parsing_defaults_omitted_zeros() {
        let json = r#"{
            "spreadsheetId": "abc",
            "properties": {"title": "Заказы 2023"},
            "sheets": [
                {"properties": {"title": "Наличие"}},
                {
                    "properties": {"sheetId": 17, "title": "17.05"},
                    "merges": [{"sheetId": 17, "startRowIndex": 2, "endRowIndex": 5, "endColumnIndex": 2}]
                }
            ]
        }"#;
        let response: SpreadsheetResponse = serde_json::from_str(json).unwrap();
        let spreadsheet = Spreadsheet::from(response);

        assert_eq!(spreadsheet.year(), Some(2023));
        assert_eq!(spreadsheet.sheets[0].sheet_id, 0);
        assert!(spreadsheet.sheets[0].merges.is_empty());
        assert_eq!(spreadsheet.sheets[1].merges, vec![MergeRegion::new(2, 5, 0, 2)]);
    }

    #[test]
    fn test_url_encodes_range() {
        let client =
            GoogleSheetsClient::new(SheetsAuth::ApiKey("k".to_string()), "A1:AZ").unwrap();
        let url = client.url(&["abc", "values", "'Наличие'!A1:AZ"]).unwrap();
        assert!(url.as_str().starts_with("https://sheets.googleapis.com/v4/spreadsheets/abc/values/"));
        assert!(!url.as_str().contains("Наличие"));
    }
}
