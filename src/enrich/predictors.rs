//! Prediction service contracts
//!
//! The demographic models live outside this crate. Only their contracts are
//! fixed here:
//!
//! | Service | Input | Output |
//! |---------|-------|--------|
//! | Gender by name | first name | `Gender` |
//! | Ethnicity by name | optional first name, last name | category label |
//! | From image | local image path | age, gender, race, or nothing |

use crate::records::ImageDemographics;
use crate::PredictionError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Gender predicted from a first name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    MostlyMale,
    MostlyFemale,
    Androgynous,
    Unknown,
}

impl Gender {
    /// Parses a service label; unrecognized labels map to `Unknown`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "male" => Self::Male,
            "female" => Self::Female,
            "mostly_male" => Self::MostlyMale,
            "mostly_female" => Self::MostlyFemale,
            "andy" | "androgynous" => Self::Androgynous,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::MostlyMale => "mostly_male",
            Self::MostlyFemale => "mostly_female",
            Self::Androgynous => "andy",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait GenderPredictor: Send + Sync {
    async fn predict_gender(&self, first_name: &str) -> Result<Gender, PredictionError>;
}

#[async_trait]
pub trait EthnicityPredictor: Send + Sync {
    /// Uses first and last name when a first name is known, last name otherwise
    async fn predict_ethnicity(
        &self,
        first_name: Option<&str>,
        last_name: &str,
    ) -> Result<String, PredictionError>;
}

#[async_trait]
pub trait ImagePredictor: Send + Sync {
    /// `Ok(None)` when the model finds no face
    async fn predict_from_image(
        &self,
        image_path: &Path,
    ) -> Result<Option<ImageDemographics>, PredictionError>;
}

/// Stand-in used when no prediction service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledPredictor;

#[async_trait]
impl GenderPredictor for DisabledPredictor {
    async fn predict_gender(&self, _first_name: &str) -> Result<Gender, PredictionError> {
        Err(PredictionError::Disabled)
    }
}

#[async_trait]
impl EthnicityPredictor for DisabledPredictor {
    async fn predict_ethnicity(
        &self,
        _first_name: Option<&str>,
        _last_name: &str,
    ) -> Result<String, PredictionError> {
        Err(PredictionError::Disabled)
    }
}

#[async_trait]
impl ImagePredictor for DisabledPredictor {
    async fn predict_from_image(
        &self,
        _image_path: &Path,
    ) -> Result<Option<ImageDemographics>, PredictionError> {
        Err(PredictionError::Disabled)
    }
}

#[derive(Serialize)]
struct GenderRequest<'a> {
    first_name: &'a str,
}

#[derive(Deserialize)]
struct GenderResponse {
    gender: String,
}

#[derive(Serialize)]
struct EthnicityRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
    last_name: &'a str,
}

#[derive(Deserialize)]
struct EthnicityResponse {
    ethnicity: String,
}

/// Adapter for a prediction service speaking JSON over HTTP
///
/// # Endpoints
///
/// - `POST /gender` with `{"first_name"}` returns `{"gender"}`
/// - `POST /ethnicity` with `{"first_name"?, "last_name"}` returns `{"ethnicity"}`
/// - `POST /image` with the raw image bytes returns `{"age", "gender", "race"}`,
///   every key nullable; all-null means no face was found
pub struct HttpPredictionClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPredictionClient {
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PredictionError> {
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PredictionError::Service(format!("HTTP {}: {}", status, message)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PredictionError::Decode(e.to_string()))
    }

    fn classify(&self, error: reqwest::Error) -> PredictionError {
        if error.is_timeout() {
            PredictionError::Timeout(self.timeout.as_millis() as u64)
        } else {
            PredictionError::Service(error.to_string())
        }
    }
}

#[async_trait]
impl GenderPredictor for HttpPredictionClient {
    async fn predict_gender(&self, first_name: &str) -> Result<Gender, PredictionError> {
        let request = self
            .client
            .post(self.endpoint("gender"))
            .json(&GenderRequest { first_name });
        let response: GenderResponse = self.read_json(request).await?;
        Ok(Gender::from_label(&response.gender))
    }
}

#[async_trait]
impl EthnicityPredictor for HttpPredictionClient {
    async fn predict_ethnicity(
        &self,
        first_name: Option<&str>,
        last_name: &str,
    ) -> Result<String, PredictionError> {
        let request = self
            .client
            .post(self.endpoint("ethnicity"))
            .json(&EthnicityRequest {
                first_name,
                last_name,
            });
        let response: EthnicityResponse = self.read_json(request).await?;
        Ok(response.ethnicity)
    }
}

#[async_trait]
impl ImagePredictor for HttpPredictionClient {
    async fn predict_from_image(
        &self,
        image_path: &Path,
    ) -> Result<Option<ImageDemographics>, PredictionError> {
        let bytes = tokio::fs::read(image_path).await.map_err(|e| {
            PredictionError::Service(format!("reading {}: {}", image_path.display(), e))
        })?;

        let request = self
            .client
            .post(self.endpoint("image"))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        let demographics: ImageDemographics = self.read_json(request).await?;

        if demographics == ImageDemographics::default() {
            Ok(None)
        } else {
            Ok(Some(demographics))
        }
    }
}
