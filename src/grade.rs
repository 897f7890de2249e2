//! Grading entry points: uploaded image(s) → [`ExtractionResult`]s.
//!
//! Each image goes through two gateway calls (transcribe, then critique),
//! after which normalization and highlighting are pure string work. Images of
//! one upload are independent, so they run concurrently up to
//! [`ServiceConfig::concurrency`]; results keep upload order.

use crate::config::{AnnotationStrategy, ServiceConfig};
use crate::error::SmartMarksError;
use crate::model::ExtractionResult;
use crate::pipeline::gateway::Gateway;
use crate::pipeline::{annotate, encode, normalize};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Grade a single stored image.
///
/// `image_name` is the stored filename under `upload_dir`; it is echoed
/// back in the result so the client can fetch the image again.
pub async fn process_image(
    gateway: &dyn Gateway,
    upload_dir: &Path,
    image_name: &str,
    strategy: AnnotationStrategy,
) -> Result<ExtractionResult, SmartMarksError> {
    let start = Instant::now();
    let path = upload_dir.join(image_name);

    let image = encode::encode_image(&path).await?;
    let extracted_text = gateway.extract_text(image).await?;
    debug!("{}: extracted {} chars", image_name, extracted_text.len());

    let raw = gateway.correct_text(&extracted_text).await?;
    let error_table = normalize::normalize(&raw);
    let marked_text = annotate::highlight(&extracted_text, &error_table, strategy);

    info!(
        "{}: {} errors flagged in {:?}",
        image_name,
        error_table.len(),
        start.elapsed()
    );

    Ok(ExtractionResult {
        image: image_name.to_string(),
        extracted_text,
        error_table,
        marked_text,
    })
}

/// Grade several stored images, preserving their order.
///
/// The first failing image fails the whole batch.
pub async fn process_batch(
    gateway: &dyn Gateway,
    config: &ServiceConfig,
    image_names: &[String],
) -> Result<Vec<ExtractionResult>, SmartMarksError> {
    info!("Grading {} images", image_names.len());
    let strategy = config.annotation;
    // Each job owns its path and name so the batch future stays `Send`
    // for any caller lifetime (axum handlers require it).
    let jobs: Vec<BoxFuture<'_, Result<ExtractionResult, SmartMarksError>>> = image_names
        .iter()
        .map(|name| {
            let dir = config.upload_dir.clone();
            let name = name.clone();
            async move { process_image(gateway, &dir, &name, strategy).await }.boxed()
        })
        .collect();

    stream::iter(jobs)
        .buffered(config.concurrency)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorCategory, Language};
    use crate::pipeline::normalize::RawCorrections;
    use async_trait::async_trait;
    use edgequake_llm::ImageData;

    struct CannedGateway;

    #[async_trait]
    impl Gateway for CannedGateway {
        async fn extract_text(&self, image: ImageData) -> Result<String, SmartMarksError> {
            // Echo the payload size so each image yields distinct text.
            Ok(format!("teh text {}", image.data.len()))
        }

        async fn correct_text(&self, _text: &str) -> Result<RawCorrections, SmartMarksError> {
            Ok(RawCorrections::Text("1. teh -> the -> Spelling".into()))
        }

        async fn suggest_improvements(
            &self,
            _text: &str,
            _language: Language,
        ) -> Result<String, SmartMarksError> {
            Ok("{}".into())
        }

        async fn detect_language(&self, _text: &str) -> Result<String, SmartMarksError> {
            Ok("en".into())
        }
    }

    #[tokio::test]
    async fn process_image_builds_result() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"fake-jpeg").unwrap();

        let result = process_image(&CannedGateway, dir.path(), "a.jpg", AnnotationStrategy::Sequential)
            .await
            .expect("graded");

        assert_eq!(result.image, "a.jpg");
        assert!(result.extracted_text.starts_with("teh text"));
        assert_eq!(result.error_table.len(), 1);
        assert_eq!(result.error_table[0].category, ErrorCategory::Spelling);
        assert!(result
            .marked_text
            .starts_with("<span style=\"color:red;\">teh</span>"));
    }

    #[tokio::test]
    async fn process_image_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = process_image(&CannedGateway, dir.path(), "nope.jpg", AnnotationStrategy::Sequential)
            .await
            .unwrap_err();
        assert!(matches!(err, SmartMarksError::ImageNotFound { .. }));
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (1..=5).map(|i| format!("{i}.jpg")).collect();
        for (i, name) in names.iter().enumerate() {
            std::fs::write(dir.path().join(name), vec![0u8; (i + 1) * 3]).unwrap();
        }
        let config = ServiceConfig::builder()
            .secret_key("s")
            .upload_dir(dir.path())
            .concurrency(3)
            .build()
            .unwrap();

        let results = process_batch(&CannedGateway, &config, &names).await.unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.image.as_str()).collect();
        assert_eq!(order, vec!["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"]);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn batch_future_is_send() {
        let config = ServiceConfig::builder().secret_key("s").build().unwrap();
        let names = vec!["a.jpg".to_string()];
        let batch = process_batch(&CannedGateway, &config, &names);
        assert_send(&batch);
        // Must also be spawnable once the borrowed inputs are owned by the task.
        let handle = tokio::spawn(async move {
            let config = ServiceConfig::builder().secret_key("s").build().unwrap();
            let names = vec!["missing.jpg".to_string()];
            process_batch(&CannedGateway, &config, &names).await
        });
        assert!(handle.await.unwrap().is_err());
        drop(batch);
    }
}
