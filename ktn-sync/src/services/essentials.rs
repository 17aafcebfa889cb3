//! Essentials aggregator
//!
//! Per partition word and phrase frequencies over the inscription fields of
//! its records. Stored as JSON objects on the partition fingerprint and
//! rebuilt from the records on every call, so the result only depends on
//! what is stored.

use crate::services::tokenizer::{extract_phrases, extract_tokens};
use ktn_common::db::{OrderRecord, OrderStore};
use ktn_common::{Error, OrderField, PartitionKey, Result};
use std::collections::BTreeMap;

/// Order types that never carry free text
pub const EXCLUDED_TYPES: &[&str] = &["СЕРЬГИ", "ЦЕПОЧКА", "ШНУРОК"];

/// Subtype keywords (matched case-insensitively) that never carry free text
pub const EXCLUDED_SUBTYPE_KEYWORDS: &[&str] = &["серьг", "цепоч", "шнур"];

/// Frequency of each distinct token
pub type Frequencies = BTreeMap<String, u32>;

/// Word and phrase frequencies of one partition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Essentials {
    pub words: Frequencies,
    pub phrases: Frequencies,
}

impl Essentials {
    /// Count tokens and phrases of one inscription value.
    ///
    /// A token appearing several times in one value counts once.
    pub fn add_inscription(&mut self, text: &str) {
        for token in extract_tokens(text) {
            *self.words.entry(token).or_insert(0) += 1;
        }
        for phrase in extract_phrases(text) {
            *self.phrases.entry(phrase).or_insert(0) += 1;
        }
    }

    /// Aggregate over the inscription fields of every eligible record
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a OrderRecord>) -> Self {
        let mut essentials = Self::default();
        for record in records.into_iter().filter(|r| carries_free_text(r)) {
            for field in OrderField::INSCRIPTIONS {
                if let Some(text) = record.text(field).filter(|t| !t.trim().is_empty()) {
                    essentials.add_inscription(text);
                }
            }
        }
        essentials
    }
}

/// Whether a record's category can hold inscription text
pub fn carries_free_text(record: &OrderRecord) -> bool {
    let order_type = record.order_type.trim().to_uppercase();
    if EXCLUDED_TYPES.contains(&order_type.as_str()) {
        return false;
    }

    let subtype = record.subtype.to_lowercase();
    !EXCLUDED_SUBTYPE_KEYWORDS
        .iter()
        .any(|keyword| subtype.contains(keyword))
}

/// Recomputes and stores essentials
pub struct EssentialsAggregator {
    store: OrderStore,
}

impl EssentialsAggregator {
    pub fn new(store: OrderStore) -> Self {
        Self { store }
    }

    /// Recompute essentials of one partition and overwrite the stored value
    pub async fn update_for_partition(&self, key: &PartitionKey) -> Result<Essentials> {
        let records = self.store.partition_records(key).await?;
        let essentials = Essentials::from_records(&records);

        let words = serde_json::to_string(&essentials.words)
            .map_err(|e| Error::Internal(format!("Failed to serialize words: {}", e)))?;
        let phrases = serde_json::to_string(&essentials.phrases)
            .map_err(|e| Error::Internal(format!("Failed to serialize phrases: {}", e)))?;

        self.store.update_essentials(key, &words, &phrases).await?;

        tracing::debug!(
            partition = %key,
            records = records.len(),
            words = essentials.words.len(),
            phrases = essentials.phrases.len(),
            "Essentials updated"
        );
        Ok(essentials)
    }

    /// Rebuild essentials of every stored partition; returns how many were updated
    pub async fn update_all(&self) -> Result<usize> {
        let keys = self.store.list_partition_keys().await?;
        for key in &keys {
            self.update_for_partition(key).await?;
        }
        tracing::info!(partitions = keys.len(), "Essentials rebuilt");
        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(inscription: &str, order_type: &str, subtype: &str) -> OrderRecord {
        OrderRecord {
            inscription: inscription.to_string(),
            order_type: order_type.to_string(),
            subtype: subtype.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_across_records() {
        let records = vec![
            record("ДАР ЛЮБЛЮ", "КУЛОН", ""),
            record("ДАР ДАР", "КОЛЬЦО", ""),
            record("просто текст", "", ""),
        ];
        let essentials = Essentials::from_records(&records);

        assert_eq!(essentials.words.get("ДАР"), Some(&2));
        assert_eq!(essentials.words.get("ЛЮБЛЮ"), Some(&1));
        assert_eq!(essentials.words.len(), 2);
        assert_eq!(essentials.phrases.get("ДАР ЛЮБЛЮ"), Some(&1));
        assert_eq!(essentials.phrases.get("ДАР ДАР"), Some(&1));
    }

    #[test]
    fn test_denylisted_categories_skipped() {
        let records = vec![
            record("ДАР", "СЕРЬГИ", ""),
            record("ДАР", "КУЛОН", "Серьги-гвоздики"),
            record("ДАР", "КУЛОН", "круг"),
        ];
        let essentials = Essentials::from_records(&records);
        assert_eq!(essentials.words.get("ДАР"), Some(&1));
    }

    #[test]
    fn test_every_inscription_field_counted() {
        let mut r = record("ДАР", "", "");
        r.inscription_bracelet = "ДАР".to_string();
        r.edge_upper = "LOVE".to_string();
        r.notes = "ИГНОР".to_string();

        let essentials = Essentials::from_records(&[r]);
        assert_eq!(essentials.words.get("ДАР"), Some(&2));
        assert_eq!(essentials.words.get("LOVE"), Some(&1));
        assert!(!essentials.words.contains_key("ИГНОР"));
    }
}
