//! Typed record construction from a normalized field map

use ktn_common::db::OrderRecord;
use ktn_common::{FieldKind, OrderField, PartitionKey};
use std::collections::HashMap;

/// Coerce a sheet value to an integer.
///
/// Accepts plain integers and decimals with a comma or period separator
/// (rounded half away from zero). Anything else becomes 0.
pub fn coerce_integer(value: &str) -> i64 {
    let value = value.trim();
    if let Ok(int_value) = value.parse::<i64>() {
        return int_value;
    }

    match value.replacen(',', ".", 1).parse::<f64>() {
        Ok(float_value) if float_value.is_finite() => float_value.round() as i64,
        _ => 0,
    }
}

/// Upper-cased non-empty inscription fields joined by single spaces
pub fn search_text(record: &OrderRecord) -> String {
    OrderField::INSCRIPTIONS
        .iter()
        .filter_map(|field| record.text(*field))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_uppercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a record from header text -> value pairs.
///
/// Declared fields missing from the map keep their zero value; the `Type`
/// field is upper-cased. `search` is derived after all fields are set.
pub fn build_record(
    fields: &HashMap<String, String>,
    key: &PartitionKey,
    row_number: i64,
) -> OrderRecord {
    let mut record = OrderRecord::new(key, row_number);

    for field in OrderField::ALL {
        let Some(value) = fields.get(field.header()) else {
            continue;
        };

        match field.kind() {
            FieldKind::Integer => {
                if let Some(slot) = record.int_mut(field) {
                    *slot = coerce_integer(value);
                }
            }
            FieldKind::Text => {
                let value = if field == OrderField::Type {
                    value.to_uppercase()
                } else {
                    value.clone()
                };
                if let Some(slot) = record.text_mut(field) {
                    *slot = value;
                }
            }
        }
    }

    record.search = search_text(&record);
    record
}
