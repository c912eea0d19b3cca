//! Per-record enrichment join
//!
//! Every prediction is isolated: a failing, slow or disabled service leaves
//! only its own fields absent. A record is never dropped by enrichment.

use crate::enrich::name::decompose_name;
use crate::enrich::predictors::{EthnicityPredictor, GenderPredictor, ImagePredictor};
use crate::records::{EnrichedRecord, FetchedArtifact, ImageDemographics, PartitionedRecord};
use crate::PredictionError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Joins directory records with artifacts and predicted attributes
pub struct EnrichmentJoiner {
    gender: Arc<dyn GenderPredictor>,
    ethnicity: Arc<dyn EthnicityPredictor>,
    image: Arc<dyn ImagePredictor>,
    no_image_sentinel: String,
    timeout: Duration,
}

impl EnrichmentJoiner {
    /// Creates a joiner
    ///
    /// # Arguments
    ///
    /// * `gender` - Gender-by-first-name service
    /// * `ethnicity` - Ethnicity-by-name service
    /// * `image` - Portrait analysis service
    /// * `no_image_sentinel` - Filename fragment of the "no image" placeholder
    /// * `timeout` - Upper bound for each prediction call
    pub fn new(
        gender: Arc<dyn GenderPredictor>,
        ethnicity: Arc<dyn EthnicityPredictor>,
        image: Arc<dyn ImagePredictor>,
        no_image_sentinel: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            gender,
            ethnicity,
            image,
            no_image_sentinel: no_image_sentinel.into(),
            timeout,
        }
    }

    /// Builds the enriched record for one directory record
    ///
    /// `artifact` is the record's fetched portrait, if any. The placeholder
    /// image is recorded as `image_path` but never sent to the image service.
    pub async fn join(
        &self,
        entry: &PartitionedRecord,
        artifact: Option<&FetchedArtifact>,
    ) -> EnrichedRecord {
        let record = &entry.record;
        let parts = decompose_name(&record.name);

        let name_gender = match parts.first.as_deref() {
            Some(first) => self
                .isolate("gender", &record.name, self.gender.predict_gender(first))
                .await
                .map(|gender| gender.to_string()),
            None => None,
        };

        let name_ethnicity = match parts.last.as_deref() {
            Some(last) => {
                self.isolate(
                    "ethnicity",
                    &record.name,
                    self.ethnicity.predict_ethnicity(parts.first.as_deref(), last),
                )
                .await
            }
            None => None,
        };

        let image_path = artifact.map(|a| a.local_path.display().to_string());

        let demographics = match artifact.filter(|a| !self.is_placeholder(a)) {
            Some(artifact) => self
                .isolate(
                    "image",
                    &record.name,
                    self.image.predict_from_image(&artifact.local_path),
                )
                .await
                .flatten()
                .unwrap_or_default(),
            None => ImageDemographics::default(),
        };

        EnrichedRecord {
            record: record.clone(),
            directory_partition: entry.partition.label().to_string(),
            image_path,
            name_gender,
            name_ethnicity,
            image_age: demographics.age,
            image_gender: demographics.gender,
            image_ethnicity: demographics.race,
        }
    }

    fn is_placeholder(&self, artifact: &FetchedArtifact) -> bool {
        artifact
            .file_name()
            .is_some_and(|name| name.contains(&self.no_image_sentinel))
    }

    /// Runs one prediction, collapsing any failure to `None`
    async fn isolate<T>(
        &self,
        service: &str,
        name: &str,
        prediction: impl Future<Output = Result<T, PredictionError>>,
    ) -> Option<T> {
        let outcome = match tokio::time::timeout(self.timeout, prediction).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PredictionError::Timeout(self.timeout.as_millis() as u64)),
        };

        match outcome {
            Ok(value) => Some(value),
            Err(PredictionError::Disabled) => None,
            Err(e) => {
                tracing::warn!(service, name, "Prediction failed: {}", e);
                None
            }
        }
    }
}
