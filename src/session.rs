//! Session store: the latest [`ResultBatch`] per teacher.
//!
//! Each upload replaces the caller's batch wholesale; there is no merge and
//! no history. Two concurrent uploads by the same teacher race and the last
//! writer wins.

use crate::model::{ExtractionResult, ResultBatch};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory, process-local store keyed by session identifier.
#[derive(Debug, Default)]
pub struct SessionStore {
    batches: RwLock<HashMap<String, ResultBatch>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the batch held for `key`, discarding any previous one.
    pub async fn replace(&self, key: &str, batch: ResultBatch) {
        debug!("Session {}: storing batch of {} results", key, batch.results.len());
        self.batches.write().await.insert(key.to_string(), batch);
    }

    /// A copy of the batch held for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<ResultBatch> {
        self.batches.read().await.get(key).cloned()
    }

    /// Swap in a re-graded result for the same image, leaving the other
    /// results untouched. Returns whether a matching result was found.
    pub async fn replace_result(&self, key: &str, result: ExtractionResult) -> bool {
        let mut batches = self.batches.write().await;
        let Some(slot) = batches
            .get_mut(key)
            .and_then(|b| b.results.iter_mut().find(|r| r.image == result.image))
        else {
            return false;
        };
        *slot = result;
        true
    }

    /// Drop the batch held for `key`.
    pub async fn clear(&self, key: &str) {
        self.batches.write().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(image: &str, text: &str) -> ExtractionResult {
        ExtractionResult {
            image: image.into(),
            extracted_text: text.into(),
            error_table: vec![],
            marked_text: text.into(),
        }
    }

    fn batch(name: &str, results: Vec<ExtractionResult>) -> ResultBatch {
        ResultBatch {
            student_name: Some(name.into()),
            student_class: None,
            subject: None,
            results,
        }
    }

    #[tokio::test]
    async fn empty_store_has_nothing() {
        let store = SessionStore::new();
        assert!(store.get("1").await.is_none());
    }

    #[tokio::test]
    async fn replace_discards_previous_batch() {
        let store = SessionStore::new();
        store.replace("1", batch("Ada", vec![result("a.jpg", "a")])).await;
        store.replace("1", batch("Bob", vec![result("b.jpg", "b")])).await;

        let got = store.get("1").await.unwrap();
        assert_eq!(got.student_name.as_deref(), Some("Bob"));
        assert_eq!(got.results.len(), 1);
        assert_eq!(got.results[0].image, "b.jpg");
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let store = SessionStore::new();
        store.replace("1", batch("Ada", vec![])).await;
        assert!(store.get("2").await.is_none());
        store.clear("1").await;
        assert!(store.get("1").await.is_none());
    }

    #[tokio::test]
    async fn replace_result_touches_only_matching_image() {
        let store = SessionStore::new();
        store
            .replace("1", batch("Ada", vec![result("a.jpg", "old a"), result("b.jpg", "old b")]))
            .await;

        assert!(store.replace_result("1", result("b.jpg", "new b")).await);
        assert!(!store.replace_result("1", result("c.jpg", "new c")).await);
        assert!(!store.replace_result("2", result("a.jpg", "x")).await);

        let got = store.get("1").await.unwrap();
        assert_eq!(got.results[0].extracted_text, "old a");
        assert_eq!(got.results[1].extracted_text, "new b");
    }
}
