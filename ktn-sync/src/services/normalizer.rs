//! Merge-aware row normalizer
//!
//! Turns the raw grid of one sheet into one field map per data row, keyed by
//! header text. The header row is read once into a [`ColumnSchema`].
//!
//! Rules applied per data row:
//! - cells beyond the header width are ignored
//! - empty cells are absent from the map
//! - non-string cells are reported and skipped
//! - without a link column, column 0 holds the link
//! - rows continuing a merge over the lead columns take the link of the
//!   previous emitted row
//! - rows with neither link nor sum are dropped; rows with a sum but no
//!   link are kept and reported

use crate::sheets::{Cell, MergeRegion, RawGrid};
use ktn_common::fields::{LINK_HEADER, SUM_HEADER};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Data-quality finding; reported, never fatal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityIssue {
    /// Row has a sum but no customer link
    MissingLink { row_number: i64 },
    /// Cell holds something other than a string
    MalformedCell {
        row_number: i64,
        column: usize,
        value: String,
    },
}

impl fmt::Display for DataQualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityIssue::MissingLink { row_number } => {
                write!(f, "link is missing in a row with a sum (row {})", row_number)
            }
            DataQualityIssue::MalformedCell {
                row_number,
                column,
                value,
            } => write!(
                f,
                "non-string cell skipped (row {}, column {}): {}",
                row_number,
                column + 1,
                value
            ),
        }
    }
}

/// Column names of one sheet, by position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    /// `None` for header cells that are not strings
    names: Vec<Option<String>>,
    has_link_column: bool,
}

impl ColumnSchema {
    pub fn from_header(header: &[Cell]) -> Self {
        let names: Vec<Option<String>> = header
            .iter()
            .map(|cell| cell.as_str().map(str::to_string))
            .collect();
        let has_link_column = names.iter().any(|n| n.as_deref() == Some(LINK_HEADER));

        Self {
            names,
            has_link_column,
        }
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, column: usize) -> Option<&str> {
        self.names.get(column).and_then(|n| n.as_deref())
    }

    pub fn has_link_column(&self) -> bool {
        self.has_link_column
    }
}

/// One data row after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    /// 1-based position in the raw grid
    pub row_number: i64,
    pub is_merged: bool,
    /// Header text -> non-empty cell text
    pub fields: HashMap<String, String>,
}

impl NormalizedRow {
    pub fn link(&self) -> &str {
        self.fields.get(LINK_HEADER).map(String::as_str).unwrap_or("")
    }

    fn set_link(&mut self, link: String) {
        self.fields.insert(LINK_HEADER.to_string(), link);
    }
}

/// Normalized rows of one sheet plus the findings met on the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedSheet {
    pub rows: Vec<NormalizedRow>,
    pub issues: Vec<DataQualityIssue>,
}

/// Grid rows (0-based) that continue a merge over the lead columns
fn merged_rows(merges: &[MergeRegion]) -> HashSet<usize> {
    merges
        .iter()
        .filter(|m| m.touches_lead_columns())
        .flat_map(MergeRegion::continuation_rows)
        .collect()
}

fn cell_text(cell: &Cell) -> Option<Option<&str>> {
    match cell {
        Cell::String(s) => Some(Some(s.as_str())),
        Cell::Null => Some(None),
        _ => None,
    }
}

/// Normalize a sheet grid (header row first)
pub fn normalize(grid: &RawGrid, merges: &[MergeRegion]) -> NormalizedSheet {
    let mut sheet = NormalizedSheet::default();

    let Some(header) = grid.first() else {
        return sheet;
    };
    let schema = ColumnSchema::from_header(header);
    let merged = merged_rows(merges);

    for (row_idx, raw_row) in grid.iter().enumerate().skip(1) {
        let row_number = row_idx as i64 + 1;
        let mut row = NormalizedRow {
            row_number,
            is_merged: merged.contains(&row_idx),
            fields: HashMap::new(),
        };

        for (column, cell) in raw_row.iter().enumerate().take(schema.width()) {
            let text = match cell_text(cell) {
                Some(Some(text)) => text,
                Some(None) => continue,
                None => {
                    sheet.issues.push(DataQualityIssue::MalformedCell {
                        row_number,
                        column,
                        value: cell.to_string(),
                    });
                    continue;
                }
            };

            if !schema.has_link_column() && column == 0 {
                if !text.is_empty() {
                    row.set_link(text.to_string());
                }
            } else if !text.is_empty() {
                if let Some(name) = schema.name(column) {
                    row.fields.insert(name.to_string(), text.to_string());
                }
            }
        }

        if row.is_merged && !sheet.rows.is_empty() {
            let previous_link = sheet.rows.last().map(|r| r.link().to_string()).unwrap_or_default();
            row.set_link(previous_link);
        } else if row.link().is_empty() {
            if row.fields.contains_key(SUM_HEADER) {
                sheet.issues.push(DataQualityIssue::MissingLink { row_number });
            } else {
                continue;
            }
        }

        sheet.rows.push(row);
    }

    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header() -> Vec<Cell> {
        vec![json!("Ссылка"), json!("Надпись"), json!("Сумма")]
    }

    #[test]
    fn test_merged_rows_inherit_link() {
        let grid = vec![
            header(),
            vec![json!("L0"), json!("a"), json!("100")],
            vec![json!("L1"), json!("b"), json!("200")],
            vec![json!(""), json!("c")],
            vec![json!(""), json!("d")],
            vec![json!("L2"), json!("e")],
        ];
        // Rows 3-5 (1-based) merged over the first two columns
        let merges = vec![MergeRegion::new(2, 5, 0, 2)];

        let sheet = normalize(&grid, &merges);
        let links: Vec<(i64, &str, bool)> = sheet
            .rows
            .iter()
            .map(|r| (r.row_number, r.link(), r.is_merged))
            .collect();

        assert_eq!(
            links,
            vec![
                (2, "L0", false),
                (3, "L1", false),
                (4, "L1", true),
                (5, "L1", true),
                (6, "L2", false),
            ]
        );
        assert!(sheet.issues.is_empty());
    }

    #[test]
    fn test_merges_outside_lead_columns_ignored() {
        let grid = vec![
            header(),
            vec![json!("L1"), json!("a")],
            vec![json!(""), json!("b")],
        ];
        let sheet = normalize(&grid, &[MergeRegion::new(1, 3, 2, 3)]);
        assert_eq!(sheet.rows.len(), 1);
    }

    #[test]
    fn test_row_drop_rule() {
        let grid = vec![
            header(),
            vec![json!(""), json!("no link, no sum")],
            vec![json!(""), json!("no link"), json!("1500")],
            vec![],
        ];

        let sheet = normalize(&grid, &[]);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].row_number, 3);
        assert_eq!(sheet.rows[0].fields.get("Сумма").map(String::as_str), Some("1500"));
        assert_eq!(sheet.issues, vec![DataQualityIssue::MissingLink { row_number: 3 }]);
    }

    #[test]
    fn test_without_link_column_first_cell_is_link() {
        let grid = vec![
            vec![json!("Заказчик"), json!("Надпись")],
            vec![json!("https://vk.com/x"), json!("дар")],
        ];

        let sheet = normalize(&grid, &[]);
        assert_eq!(sheet.rows[0].link(), "https://vk.com/x");
        assert!(!sheet.rows[0].fields.contains_key("Заказчик"));
        assert_eq!(sheet.rows[0].fields.get("Надпись").map(String::as_str), Some("дар"));
    }

    #[test]
    fn test_cells_beyond_header_ignored() {
        let grid = vec![
            vec![json!("Ссылка"), json!("Надпись")],
            vec![json!("L1"), json!("дар"), json!("лишнее")],
        ];

        let sheet = normalize(&grid, &[]);
        assert_eq!(sheet.rows[0].fields.len(), 2);
    }

    #[test]
    fn test_non_string_cell_reported_and_skipped() {
        let grid = vec![
            header(),
            vec![json!("L1"), json!(42), json!("100")],
        ];

        let sheet = normalize(&grid, &[]);
        assert_eq!(sheet.rows.len(), 1);
        assert!(!sheet.rows[0].fields.contains_key("Надпись"));
        assert!(matches!(
            sheet.issues[0],
            DataQualityIssue::MalformedCell { row_number: 2, column: 1, .. }
        ));
    }

    #[test]
    fn test_non_string_header_keeps_positions() {
        let grid = vec![
            vec![json!("Ссылка"), json!(7), json!("Надпись")],
            vec![json!("L1"), json!("x"), json!("дар")],
        ];

        let sheet = normalize(&grid, &[]);
        assert_eq!(sheet.rows[0].fields.get("Надпись").map(String::as_str), Some("дар"));
        assert_eq!(sheet.rows[0].fields.len(), 2);
    }

    #[test]
    fn test_empty_grid() {
        assert_eq!(normalize(&Vec::new(), &[]), NormalizedSheet::default());
    }
}
