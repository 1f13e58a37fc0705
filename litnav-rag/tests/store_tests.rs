//! Document store lifecycle tests: round trips, TTL expiry, LRU eviction.

use std::sync::Arc;
use std::time::Duration;

use litnav_rag::{
    Chunk, CitationMetadata, Document, DocumentStore, InMemoryDocumentStore, RagConfig, RagError,
    RecursiveChunker, StorePolicy,
};
use proptest::prelude::*;

fn document(id: &str, texts: &[&str]) -> Document {
    let chunks = texts
        .iter()
        .enumerate()
        .map(|(i, text)| Chunk::new(id, i, *text, CitationMetadata::default()))
        .collect();
    Document::new(id, None, chunks)
}

/// **Store round trip**
/// *For any* chunked text, `put` then `get` SHALL return the identical
/// chunk sequence.
mod prop_store_round_trip {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn put_then_get_returns_identical_chunks(text in "[a-z]{1,10}( [a-z]{1,10}){0,200}") {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let chunks = RecursiveChunker::new(120, 30).unwrap().split("paper", &text);
            let stored = rt.block_on(async {
                let store = InMemoryDocumentStore::new();
                store.put(Document::new("paper", None, chunks.clone())).await.unwrap();
                store.get("paper").await.unwrap()
            });

            prop_assert_eq!(&stored.chunks, &chunks);
        }
    }
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let store = InMemoryDocumentStore::new();
    let err = store.get("missing").await.unwrap_err();
    assert!(matches!(err, RagError::NotFound { ref document_id } if document_id == "missing"));
}

#[tokio::test]
async fn put_replaces_the_whole_chunk_set() {
    let store = InMemoryDocumentStore::new();
    store.put(document("a", &["one", "two"])).await.unwrap();
    store.put(document("a", &["three"])).await.unwrap();

    let stored = store.get("a").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored.chunks[0].text, "three");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn readers_keep_their_snapshot_after_replacement() {
    let store = InMemoryDocumentStore::new();
    store.put(document("a", &["old"])).await.unwrap();
    let before: Arc<Document> = store.get("a").await.unwrap();

    store.put(document("a", &["new"])).await.unwrap();
    assert_eq!(before.chunks[0].text, "old");
    assert_eq!(store.get("a").await.unwrap().chunks[0].text, "new");
}

#[tokio::test]
async fn remove_reports_whether_anything_was_stored() {
    let store = InMemoryDocumentStore::new();
    store.put(document("a", &["x"])).await.unwrap();

    assert!(store.remove("a").await.unwrap());
    assert!(!store.remove("a").await.unwrap());
    assert!(store.get("a").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn documents_expire_after_ttl() {
    let store = InMemoryDocumentStore::with_policy(StorePolicy {
        capacity: None,
        ttl: Some(Duration::from_secs(60)),
    });
    store.put(document("a", &["x"])).await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(store.get("a").await.is_ok());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(matches!(store.get("a").await, Err(RagError::NotFound { .. })));
    assert_eq!(store.len().await, 0);
    assert_eq!(store.purge_expired().await, 1);
}

#[tokio::test(start_paused = true)]
async fn reput_restarts_the_ttl() {
    let store = InMemoryDocumentStore::with_policy(StorePolicy {
        capacity: None,
        ttl: Some(Duration::from_secs(60)),
    });
    store.put(document("a", &["x"])).await.unwrap();
    tokio::time::advance(Duration::from_secs(45)).await;
    store.put(document("a", &["y"])).await.unwrap();
    tokio::time::advance(Duration::from_secs(45)).await;

    assert_eq!(store.get("a").await.unwrap().chunks[0].text, "y");
}

#[tokio::test]
async fn capacity_evicts_least_recently_used() {
    let store = InMemoryDocumentStore::with_policy(StorePolicy { capacity: Some(2), ttl: None });
    store.put(document("a", &["x"])).await.unwrap();
    store.put(document("b", &["x"])).await.unwrap();

    // Touch "a" so "b" becomes the eviction candidate.
    store.get("a").await.unwrap();
    store.put(document("c", &["x"])).await.unwrap();

    assert_eq!(store.len().await, 2);
    assert!(store.get("a").await.is_ok());
    assert!(store.get("b").await.is_err());
    assert!(store.get("c").await.is_ok());
}

#[tokio::test]
async fn replacing_at_capacity_evicts_nothing() {
    let store = InMemoryDocumentStore::with_policy(StorePolicy { capacity: Some(2), ttl: None });
    store.put(document("a", &["x"])).await.unwrap();
    store.put(document("b", &["x"])).await.unwrap();
    store.put(document("a", &["y"])).await.unwrap();

    assert!(store.get("a").await.is_ok());
    assert!(store.get("b").await.is_ok());
}

#[test]
fn policy_follows_config() {
    let config = RagConfig::builder()
        .store_capacity(Some(3))
        .store_ttl(Some(Duration::from_secs(10)))
        .build()
        .unwrap();
    let policy = StorePolicy::from_config(&config);
    assert_eq!(policy.capacity, Some(3));
    assert_eq!(policy.ttl, Some(Duration::from_secs(10)));
    assert_eq!(StorePolicy::unbounded(), StorePolicy { capacity: None, ttl: None });
}
