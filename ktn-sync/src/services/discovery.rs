//! Spreadsheet discovery
//!
//! Configuration lists spreadsheet ids only. The year a spreadsheet covers
//! is the first standalone four-digit number of its title. Metadata reads
//! are remote reads and wait on the rate limiter like grid reads do.

use crate::sheets::{Spreadsheet, SpreadsheetSource};
use crate::utils::RateLimiter;
use ktn_common::Result;

/// First configured spreadsheet whose title year is `year`
pub async fn find_spreadsheet_by_year(
    source: &dyn SpreadsheetSource,
    spreadsheet_ids: &[String],
    year: i32,
    rate_limiter: &RateLimiter,
) -> Result<Option<Spreadsheet>> {
    for id in spreadsheet_ids {
        rate_limiter.wait().await;
        let spreadsheet = source.spreadsheet(id).await?;
        if spreadsheet.year() == Some(year) {
            tracing::debug!(
                year,
                spreadsheet_id = %spreadsheet.id,
                title = %spreadsheet.title,
                "Found spreadsheet for year"
            );
            return Ok(Some(spreadsheet));
        }
    }
    Ok(None)
}

/// Metadata of every configured spreadsheet, one read per id, in config order
pub async fn resolve_spreadsheets(
    source: &dyn SpreadsheetSource,
    spreadsheet_ids: &[String],
    rate_limiter: &RateLimiter,
) -> Result<Vec<Spreadsheet>> {
    let mut spreadsheets = Vec::with_capacity(spreadsheet_ids.len());
    for id in spreadsheet_ids {
        rate_limiter.wait().await;
        spreadsheets.push(source.spreadsheet(id).await?);
    }
    tracing::debug!(count = spreadsheets.len(), "Resolved spreadsheets");
    Ok(spreadsheets)
}

/// First resolved spreadsheet covering `year`
pub fn spreadsheet_for_year(spreadsheets: &[Spreadsheet], year: i32) -> Option<&Spreadsheet> {
    spreadsheets.iter().find(|s| s.year() == Some(year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spreadsheet(id: &str, title: &str) -> Spreadsheet {
        Spreadsheet {
            id: id.to_string(),
            title: title.to_string(),
            sheets: Vec::new(),
        }
    }

    #[test]
    fn test_first_match_in_config_order_wins() {
        let spreadsheets = vec![
            spreadsheet("a", "Заказы 2022"),
            spreadsheet("b", "Заказы 2023"),
            spreadsheet("c", "Копия 2023"),
        ];
        assert_eq!(spreadsheet_for_year(&spreadsheets, 2023).map(|s| s.id.as_str()), Some("b"));
        assert!(spreadsheet_for_year(&spreadsheets, 2021).is_none());
    }
}
