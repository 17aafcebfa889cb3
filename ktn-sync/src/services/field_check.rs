//! Field-name check
//!
//! Compares the header row of every dated sheet against the declared field
//! dictionary. New columns added by operators would otherwise be dropped
//! silently during normalization.

use crate::sheets::{Spreadsheet, SpreadsheetSource};
use crate::utils::RateLimiter;
use ktn_common::fields::EXCLUDED_HEADERS;
use ktn_common::partition::is_dated_sheet;
use ktn_common::{Error, OrderField, Result};
use std::collections::BTreeSet;

/// Header cells made of digits (after removing non-breaking spaces)
fn is_numeric_header(header: &str) -> bool {
    header.replace('\u{00A0}', "").parse::<i64>().is_ok()
}

/// Header texts with no declared field, excluding ignorable ones
pub fn unmapped_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    headers
        .into_iter()
        .filter(|h| !h.trim().is_empty())
        .filter(|h| !is_numeric_header(h))
        .filter(|h| !EXCLUDED_HEADERS.contains(h))
        .filter(|h| OrderField::from_header(h).is_none())
        .map(str::to_string)
        .collect()
}

/// Validates sheet headers against the field dictionary
pub struct FieldCheck<'a> {
    source: &'a dyn SpreadsheetSource,
    rate_limiter: &'a RateLimiter,
}

impl<'a> FieldCheck<'a> {
    pub fn new(source: &'a dyn SpreadsheetSource, rate_limiter: &'a RateLimiter) -> Self {
        Self {
            source,
            rate_limiter,
        }
    }

    /// Check every dated sheet of a spreadsheet.
    ///
    /// Returns [`Error::SchemaMismatch`] listing every unmapped header.
    pub async fn check_spreadsheet(&self, spreadsheet: &Spreadsheet) -> Result<()> {
        let mut unmapped = BTreeSet::new();

        for sheet in spreadsheet.sheets.iter().filter(|s| is_dated_sheet(&s.title)) {
            self.rate_limiter.wait().await;
            let grid = self.source.fetch_grid(&spreadsheet.id, &sheet.title).await?;

            let Some(header) = grid.first() else {
                continue;
            };

            for name in unmapped_headers(header.iter().filter_map(|cell| cell.as_str())) {
                if unmapped.insert(name.clone()) {
                    tracing::warn!(sheet = %sheet.title, header = %name, "Unmapped header");
                }
            }
        }

        if unmapped.is_empty() {
            tracing::info!(spreadsheet = %spreadsheet.title, "Field names check passed");
            Ok(())
        } else {
            Err(Error::SchemaMismatch(unmapped.into_iter().collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_headers() {
        let headers = [
            "Ссылка",
            "Надпись",
            "да",
            "12\u{00A0}000",
            "",
            "Новая колонка",
            "Сумма",
        ];
        let unmapped = unmapped_headers(headers.iter().copied());
        assert_eq!(
            unmapped.into_iter().collect::<Vec<_>>(),
            vec!["Новая колонка".to_string()]
        );
    }

    #[test]
    fn test_numeric_header() {
        assert!(is_numeric_header("15"));
        assert!(is_numeric_header("1\u{00A0}500"));
        assert!(!is_numeric_header("15.05"));
    }
}
