//! Database models

use crate::fields::OrderField;
use crate::partition::PartitionKey;
use serde::{Deserialize, Serialize};

/// Stored content hash of a partition plus its derived essentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub date: PartitionKey,
    pub hash: String,
    /// JSON object token -> count
    pub words: Option<String>,
    /// JSON object phrase -> count
    pub phrases: Option<String>,
}

/// One normalized order row.
///
/// Keyed by `(date, row_number)`; `row_number` is the 1-based row of the
/// source sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub date: String,
    pub row_number: i64,
    /// Upper-cased inscription-bearing fields joined by spaces
    pub search: String,
    pub is_merged: bool,
    /// URL of the source row
    pub order_link: String,

    pub payment: String,
    pub pickup_point: String,
    pub email: String,
    pub inscription: String,
    pub details: String,
    pub texture: String,
    pub pendant: String,
    pub ring: String,
    pub for_notes: String,
    pub socials: String,
    pub full_name: String,
    pub inscription_bracelet: String,
    pub description: String,
    pub post_code: String,
    pub customer_link: String,
    pub time_to: String,
    pub edge_lower: String,
    pub delivery_cost: String,
    pub phone: String,
    pub earrings: String,
    pub city: String,
    pub time_from: String,
    pub delivery_type: String,
    pub notes: String,
    pub boxberry_number: String,
    pub edge_upper: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub extras: String,
    pub delivery_address: String,
    pub for_confirmation: String,
    pub symbol: String,
    pub subtype: String,
    pub sum: i64,
    pub pickup_number: String,
}

impl OrderRecord {
    /// Empty record for a row of a partition
    pub fn new(date: &PartitionKey, row_number: i64) -> Self {
        Self {
            date: date.to_string(),
            row_number,
            ..Default::default()
        }
    }

    /// Mutable access to a text field; `None` for integer fields
    pub fn text_mut(&mut self, field: OrderField) -> Option<&mut String> {
        let slot = match field {
            OrderField::Payment => &mut self.payment,
            OrderField::PickupPoint => &mut self.pickup_point,
            OrderField::Email => &mut self.email,
            OrderField::Inscription => &mut self.inscription,
            OrderField::Details => &mut self.details,
            OrderField::Texture => &mut self.texture,
            OrderField::Pendant => &mut self.pendant,
            OrderField::Ring => &mut self.ring,
            OrderField::ForNotes => &mut self.for_notes,
            OrderField::Socials => &mut self.socials,
            OrderField::FullName => &mut self.full_name,
            OrderField::InscriptionBracelet => &mut self.inscription_bracelet,
            OrderField::Description => &mut self.description,
            OrderField::PostCode => &mut self.post_code,
            OrderField::CustomerLink => &mut self.customer_link,
            OrderField::TimeTo => &mut self.time_to,
            OrderField::EdgeLower => &mut self.edge_lower,
            OrderField::DeliveryCost => &mut self.delivery_cost,
            OrderField::Phone => &mut self.phone,
            OrderField::Earrings => &mut self.earrings,
            OrderField::City => &mut self.city,
            OrderField::TimeFrom => &mut self.time_from,
            OrderField::DeliveryType => &mut self.delivery_type,
            OrderField::Notes => &mut self.notes,
            OrderField::BoxberryNumber => &mut self.boxberry_number,
            OrderField::EdgeUpper => &mut self.edge_upper,
            OrderField::Type => &mut self.order_type,
            OrderField::Extras => &mut self.extras,
            OrderField::DeliveryAddress => &mut self.delivery_address,
            OrderField::ForConfirmation => &mut self.for_confirmation,
            OrderField::Symbol => &mut self.symbol,
            OrderField::Subtype => &mut self.subtype,
            OrderField::PickupNumber => &mut self.pickup_number,
            OrderField::Sum => return None,
        };
        Some(slot)
    }

    /// Mutable access to an integer field; `None` for text fields
    pub fn int_mut(&mut self, field: OrderField) -> Option<&mut i64> {
        match field {
            OrderField::Sum => Some(&mut self.sum),
            _ => None,
        }
    }

    /// Integer value of a field; `None` for text fields
    pub fn int(&self, field: OrderField) -> Option<i64> {
        match field {
            OrderField::Sum => Some(self.sum),
            _ => None,
        }
    }

    /// Text value of a field; `None` for integer fields
    pub fn text(&self, field: OrderField) -> Option<&str> {
        let value = match field {
            OrderField::Payment => &self.payment,
            OrderField::PickupPoint => &self.pickup_point,
            OrderField::Email => &self.email,
            OrderField::Inscription => &self.inscription,
            OrderField::Details => &self.details,
            OrderField::Texture => &self.texture,
            OrderField::Pendant => &self.pendant,
            OrderField::Ring => &self.ring,
            OrderField::ForNotes => &self.for_notes,
            OrderField::Socials => &self.socials,
            OrderField::FullName => &self.full_name,
            OrderField::InscriptionBracelet => &self.inscription_bracelet,
            OrderField::Description => &self.description,
            OrderField::PostCode => &self.post_code,
            OrderField::CustomerLink => &self.customer_link,
            OrderField::TimeTo => &self.time_to,
            OrderField::EdgeLower => &self.edge_lower,
            OrderField::DeliveryCost => &self.delivery_cost,
            OrderField::Phone => &self.phone,
            OrderField::Earrings => &self.earrings,
            OrderField::City => &self.city,
            OrderField::TimeFrom => &self.time_from,
            OrderField::DeliveryType => &self.delivery_type,
            OrderField::Notes => &self.notes,
            OrderField::BoxberryNumber => &self.boxberry_number,
            OrderField::EdgeUpper => &self.edge_upper,
            OrderField::Type => &self.order_type,
            OrderField::Extras => &self.extras,
            OrderField::DeliveryAddress => &self.delivery_address,
            OrderField::ForConfirmation => &self.for_confirmation,
            OrderField::Symbol => &self.symbol,
            OrderField::Subtype => &self.subtype,
            OrderField::PickupNumber => &self.pickup_number,
            OrderField::Sum => return None,
        };
        Some(value.as_str())
    }
}
