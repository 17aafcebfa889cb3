//! Partition keys
//!
//! Every dated sheet is stored as one partition keyed by a normalized
//! `YYYY.MM.DD` string. Two reserved sheets have no date in their name and
//! are mapped to pseudo-dates with month `00` inside the spreadsheet year, so
//! they sort before every real day and never collide with one.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Sheet holding the standing stock
pub const SHEET_NAME_STOCK: &str = "Наличие";

/// Sheet holding urgent orders
pub const SHEET_NAME_URGENT_ORDERS: &str = "Срочные заказы";

// ASCII word boundaries: a date glued to Cyrillic text ("15.05г") still counts
static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)([0-9]{1,2})\.([0-9]{1,2})(?-u:\b)").expect("valid day.month pattern")
});

static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u:\b)([0-9]{4})(?-u:\b)").expect("valid year pattern"));

/// Normalized date-partition identifier (`YYYY.MM.DD`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Build a key from calendar parts
    pub fn from_parts(year: i32, month: u32, day: u32) -> Self {
        Self(format!("{:04}.{:02}.{:02}", year, month, day))
    }

    /// Sentinel partition of the standing-stock sheet
    pub fn stock(year: i32) -> Self {
        Self::from_parts(year, 0, 0)
    }

    /// Sentinel partition of the urgent-orders sheet
    pub fn urgent_orders(year: i32) -> Self {
        Self::from_parts(year, 0, 1)
    }

    /// Detect the partition a sheet belongs to.
    ///
    /// Returns `None` for sheets that are neither dated nor reserved.
    pub fn from_sheet_name(sheet_name: &str, year: i32) -> Option<Self> {
        let trimmed = sheet_name.trim();
        if trimmed == SHEET_NAME_STOCK {
            return Some(Self::stock(year));
        }
        if trimmed == SHEET_NAME_URGENT_ORDERS {
            return Some(Self::urgent_orders(year));
        }

        let captures = DAY_MONTH.captures(sheet_name)?;
        let day: u32 = captures[1].parse().ok()?;
        let month: u32 = captures[2].parse().ok()?;
        Some(Self::from_parts(year, month, day))
    }

    /// Parse an already normalized key
    pub fn parse(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('.').collect();
        let well_formed = parts.len() == 3
            && parts[0].len() == 4
            && parts[1].len() == 2
            && parts[2].len() == 2
            && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit()));

        if !well_formed {
            return Err(Error::InvalidInput(format!("Invalid partition key: {}", value)));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Extract the year a spreadsheet covers from its title
pub fn year_from_title(title: &str) -> Option<i32> {
    YEAR.captures(title).and_then(|c| c[1].parse().ok())
}

/// Whether a sheet name carries a `D.M` date
pub fn is_dated_sheet(sheet_name: &str) -> bool {
    DAY_MONTH.is_match(sheet_name)
}
