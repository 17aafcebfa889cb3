//! Integration tests for the order store
//!
//! Every test runs against a fresh in-memory database with the full schema.

use ktn_common::db::{
    init_database, init_memory_database, init_schema, OrderRecord, OrderStore, SearchFilter,
};
use ktn_common::{Error, PartitionKey};
use tempfile::TempDir;

async fn setup_store() -> OrderStore {
    OrderStore::new(init_memory_database().await.unwrap())
}

fn record(key: &PartitionKey, row_number: i64, inscription: &str) -> OrderRecord {
    let mut record = OrderRecord::new(key, row_number);
    record.inscription = inscription.to_string();
    record.search = inscription.to_uppercase();
    record.customer_link = format!("https://vk.com/customer{}", row_number);
    record.sum = row_number * 100;
    record
}

#[tokio::test]
async fn test_missing_fingerprint_is_not_found() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    let err = store.get_fingerprint(&key).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_replace_partition_creates_fingerprint_and_records() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    let inserted = store
        .replace_partition(
            &key,
            "abc123".to_string(),
            vec![record(&key, 2, "дар"), record(&key, 3, "люблю")],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let fingerprint = store.get_fingerprint(&key).await.unwrap();
    assert_eq!(fingerprint.hash, "abc123");
    assert!(fingerprint.words.is_none());

    let records = store.partition_records(&key).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].row_number, 2);
    assert_eq!(records[0].inscription, "дар");
    assert_eq!(records[0].sum, 200);
    assert_eq!(records[1].customer_link, "https://vk.com/customer3");
}

#[tokio::test]
async fn test_replace_partition_replaces_all_rows() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    store
        .replace_partition(
            &key,
            "first".to_string(),
            vec![record(&key, 2, "a"), record(&key, 3, "b"), record(&key, 4, "c")],
        )
        .await
        .unwrap();
    store
        .replace_partition(&key, "second".to_string(), vec![record(&key, 7, "z")])
        .await
        .unwrap();

    let records = store.partition_records(&key).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].row_number, 7);
    assert_eq!(store.get_fingerprint(&key).await.unwrap().hash, "second");
}

#[tokio::test]
async fn test_failed_replace_keeps_previous_snapshot() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    store
        .replace_partition(
            &key,
            "good".to_string(),
            vec![record(&key, 2, "дар"), record(&key, 3, "люблю")],
        )
        .await
        .unwrap();

    // Duplicate row number violates the primary key after the delete ran
    let err = store
        .replace_partition(
            &key,
            "bad".to_string(),
            vec![record(&key, 5, "x"), record(&key, 5, "y")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));

    let records = store.partition_records(&key).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].inscription, "дар");
    assert_eq!(store.get_fingerprint(&key).await.unwrap().hash, "good");
}

#[tokio::test]
async fn test_failed_first_replace_leaves_no_placeholder() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2024, 1, 9);

    let result = store
        .replace_partition(
            &key,
            "hash".to_string(),
            vec![record(&key, 2, "x"), record(&key, 2, "y")],
        )
        .await;
    assert!(result.is_err());

    assert!(store.get_fingerprint(&key).await.unwrap_err().is_not_found());
    assert!(store.list_partition_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_records_from_other_partition_rejected() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);
    let other = PartitionKey::from_parts(2023, 5, 18);

    let err = store
        .replace_partition(&key, "hash".to_string(), vec![record(&other, 2, "x")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(store.count_partition_records(&other).await.unwrap(), 0);
}

#[tokio::test]
async fn test_with_partition_transaction_rolls_back_on_error() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    let result: Result<(), Error> = store
        .with_partition_transaction(&key, "test", |tx| {
            Box::pin(async move {
                tx.ensure_fingerprint().await?;
                tx.set_hash("partial").await?;
                Err::<(), Error>(Error::Internal("abort".to_string()))
            })
        })
        .await;

    assert!(matches!(result, Err(Error::Internal(_))));
    assert!(store.get_fingerprint(&key).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_update_essentials_requires_fingerprint() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    let err = store
        .update_essentials(&key, "{}", "{}")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    store
        .replace_partition(&key, "h".to_string(), vec![record(&key, 2, "ДАР")])
        .await
        .unwrap();
    store
        .update_essentials(&key, r#"{"ДАР":1}"#, "{}")
        .await
        .unwrap();

    let fingerprint = store.get_fingerprint(&key).await.unwrap();
    assert_eq!(fingerprint.words.as_deref(), Some(r#"{"ДАР":1}"#));
    assert_eq!(fingerprint.phrases.as_deref(), Some("{}"));
}

#[tokio::test]
async fn test_search_any_word_vs_whole_phrase() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    store
        .replace_partition(
            &key,
            "h".to_string(),
            vec![
                record(&key, 2, "дар люблю"),
                record(&key, 3, "только дар"),
                record(&key, 4, "люблю тебя"),
                record(&key, 5, "ничего"),
            ],
        )
        .await
        .unwrap();

    let any = store.query_records_by_search_term("Дар люблю", false).await.unwrap();
    let rows: Vec<i64> = any.iter().map(|r| r.row_number).collect();
    assert_eq!(rows, vec![2, 3, 4]);

    let whole = store.query_records_by_search_term("дар люблю", true).await.unwrap();
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].row_number, 2);
}

#[tokio::test]
async fn test_search_orders_newest_partition_first() {
    let store = setup_store().await;
    let older = PartitionKey::from_parts(2022, 12, 1);
    let newer = PartitionKey::from_parts(2023, 2, 1);

    store
        .replace_partition(&older, "a".to_string(), vec![record(&older, 2, "дар")])
        .await
        .unwrap();
    store
        .replace_partition(&newer, "b".to_string(), vec![record(&newer, 9, "дар")])
        .await
        .unwrap();

    let filter = SearchFilter::Inscription {
        term: "дар".to_string(),
        whole_phrase: false,
    };
    assert_eq!(store.count_matching(&filter).await.unwrap(), 2);

    let first_page = store.find_matching(&filter, 1, 0).await.unwrap();
    assert_eq!(first_page[0].date, "2023.02.01");
    let second_page = store.find_matching(&filter, 1, 1).await.unwrap();
    assert_eq!(second_page[0].date, "2022.12.01");
}

#[tokio::test]
async fn test_search_by_customer_link() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    store
        .replace_partition(
            &key,
            "h".to_string(),
            vec![record(&key, 2, "a"), record(&key, 3, "b")],
        )
        .await
        .unwrap();

    let filter = SearchFilter::Customer {
        term: "VK.COM/customer3".to_string(),
    };
    let found = store.find_matching(&filter, 10, 0).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].row_number, 3);
}

#[tokio::test]
async fn test_customer_search_folds_cyrillic_case() {
    let store = setup_store().await;
    let key = PartitionKey::from_parts(2023, 5, 17);

    let mut anna = record(&key, 2, "a");
    anna.customer_link = "Анна Петрова vk.com/anna".to_string();
    store
        .replace_partition(&key, "h".to_string(), vec![anna, record(&key, 3, "b")])
        .await
        .unwrap();

    for term in ["анна", "Анна", "АННА", "петрова VK.COM", "ANNA"] {
        let filter = SearchFilter::Customer {
            term: term.to_string(),
        };
        assert_eq!(store.count_matching(&filter).await.unwrap(), 1, "term {:?}", term);
    }

    let found = store
        .find_matching(
            &SearchFilter::Customer {
                term: "анна".to_string(),
            },
            10,
            0,
        )
        .await
        .unwrap();
    assert_eq!(found[0].customer_link, "Анна Петрова vk.com/anna");
}

#[tokio::test]
async fn test_schema_sync_backfills_customer_search() {
    let pool = init_memory_database().await.unwrap();
    let store = OrderStore::new(pool.clone());
    let key = PartitionKey::from_parts(2023, 5, 17);

    store
        .replace_partition(&key, "h".to_string(), vec![record(&key, 2, "a")])
        .await
        .unwrap();

    // Row written before the folded column existed
    sqlx::query("UPDATE orders SET customer_link = 'Борис', customer_search = ''")
        .execute(&pool)
        .await
        .unwrap();

    init_schema(&pool).await.unwrap();

    let filter = SearchFilter::Customer {
        term: "борис".to_string(),
    };
    assert_eq!(store.count_matching(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn test_file_database_schema_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("ktn.db");
    let key = PartitionKey::stock(2023);

    {
        let store = OrderStore::new(init_database(&db_path).await.unwrap());
        store
            .replace_partition(&key, "h".to_string(), vec![record(&key, 2, "a")])
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store = OrderStore::new(init_database(&db_path).await.unwrap());
    assert_eq!(store.list_partition_keys().await.unwrap(), vec![key.clone()]);
    assert_eq!(store.count_partition_records(&key).await.unwrap(), 1);
}
