//! HTTP persistence client for images and calibration records.

use image::RgbaImage;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::scale::Unit;
use crate::selection::ReferencePoint;

/// Persistence client errors. None of these are retried automatically; each
/// surfaces as a user-facing message at the boundary where it occurs.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}

/// Authenticated session credential, passed into the client by the caller.
///
/// Created on successful authentication, cleared on logout or when the
/// server rejects the credential. Replaces any notion of globally shared
/// request headers.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    /// Session without a credential.
    pub fn anonymous() -> Self {
        Self { token: None }
    }

    /// Session carrying a bearer token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Drop the credential, e.g. on logout or an invalid-credential response.
    pub fn clear(&mut self) {
        self.token = None;
    }
}

/// Image metadata derived from the fetched bytes. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMeta {
    pub id: String,
    pub natural_width: u32,
    pub natural_height: u32,
}

/// A fetched reference image: metadata plus decoded pixels.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub meta: ImageMeta,
    pub pixels: RgbaImage,
}

/// The persisted result of a completed calibration for one project/image
/// pair. Also the save request body; the server's response is canonical and
/// replaces whatever the client computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationRecord {
    pub project_id: String,
    pub image_id: String,
    pub points: Vec<ReferencePoint>,
    /// Euclidean distance between the two points in native image pixels.
    pub pixel_distance: f64,
    /// The user-supplied real-world distance.
    pub distance: f64,
    pub unit: Unit,
    /// Real-world length per native pixel: `distance / pixel_distance`.
    pub real_distance_per_pixel: f64,
}

impl CalibrationRecord {
    /// A record is well-formed only with exactly two points and positive
    /// distances whose ratio matches the stored scale.
    pub fn is_well_formed(&self) -> bool {
        self.points.len() == 2
            && self.pixel_distance > 0.0
            && self.distance > 0.0
            && self.real_distance_per_pixel > 0.0
    }
}

/// Error body shape returned by the API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for the project/image REST service.
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl ApiClient {
    /// Create a client against the given base URL with an explicit session.
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: Client::new(),
            base_url,
            session,
        }
    }

    /// Replace the session credential.
    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(format!("{}{}", self.base_url, path));
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Fetch the reference image and derive its native dimensions.
    ///
    /// `GET /api/images/{imageId}`. A body that cannot be decoded as an
    /// image is an [`ClientError::ImageDecode`] failure.
    pub async fn fetch_image(&self, image_id: &str) -> Result<FetchedImage, ClientError> {
        let response = self.get(&format!("/api/images/{}", image_id)).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let bytes = response.bytes().await?;
        let pixels = image::load_from_memory(&bytes)?.to_rgba8();
        let (natural_width, natural_height) = pixels.dimensions();
        tracing::debug!(
            image_id,
            natural_width,
            natural_height,
            "fetched reference image"
        );

        Ok(FetchedImage {
            meta: ImageMeta {
                id: image_id.to_string(),
                natural_width,
                natural_height,
            },
            pixels,
        })
    }

    /// Fetch the project's current calibration record, if any.
    ///
    /// `GET /api/projects/{projectId}/calibration`. A 404 or an empty body
    /// both mean no calibration exists yet.
    pub async fn fetch_calibration(
        &self,
        project_id: &str,
    ) -> Result<Option<CalibrationRecord>, ClientError> {
        let response = self
            .get(&format!("/api/projects/{}/calibration", project_id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let text = response.text().await?;
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(None);
        }
        let record: CalibrationRecord = serde_json::from_str(&text)
            .map_err(|e| ClientError::Api {
                status: 200,
                message: format!("malformed calibration record: {}", e),
            })?;
        Ok(Some(record))
    }

    /// Save a calibration record and return the canonical one.
    ///
    /// `POST /api/projects/{projectId}/calibration`. The server may re-round
    /// or reject; callers must replace local state with the returned record,
    /// not their locally computed one.
    pub async fn save_calibration(
        &self,
        record: &CalibrationRecord,
    ) -> Result<CalibrationRecord, ClientError> {
        let response = self
            .post(&format!("/api/projects/{}/calibration", record.project_id))
            .json(record)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let canonical: CalibrationRecord = response.json().await?;
        tracing::debug!(
            project_id = %canonical.project_id,
            scale = canonical.real_distance_per_pixel,
            "calibration saved"
        );
        Ok(canonical)
    }

    /// Turn a non-success response into an [`ClientError::Api`], extracting
    /// the server's `{message}` body when present.
    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .map(|body| body.message)
            .unwrap_or(text);
        tracing::warn!(status, %message, "API request failed");
        ClientError::Api { status, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CalibrationRecord {
        CalibrationRecord {
            project_id: "proj-1".to_string(),
            image_id: "img-1".to_string(),
            points: vec![
                ReferencePoint::new(200.0, 200.0),
                ReferencePoint::new(600.0, 200.0),
            ],
            pixel_distance: 400.0,
            distance: 50.0,
            unit: Unit::Centimeter,
            real_distance_per_pixel: 0.125,
        }
    }

    #[test]
    fn test_record_wire_shape_is_camel_case() {
        let json = serde_json::to_value(sample_record()).unwrap();
        assert_eq!(json["projectId"], "proj-1");
        assert_eq!(json["imageId"], "img-1");
        assert_eq!(json["pixelDistance"], 400.0);
        assert_eq!(json["distance"], 50.0);
        assert_eq!(json["unit"], "cm");
        assert_eq!(json["realDistancePerPixel"], 0.125);
        assert_eq!(json["points"][0]["x"], 200.0);
    }

    #[test]
    fn test_record_round_trips() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: CalibrationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_well_formedness() {
        assert!(sample_record().is_well_formed());

        let mut one_point = sample_record();
        one_point.points.truncate(1);
        assert!(!one_point.is_well_formed());

        let mut zero_distance = sample_record();
        zero_distance.distance = 0.0;
        assert!(!zero_distance.is_well_formed());
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = Session::with_token("secret");
        assert_eq!(session.token(), Some("secret"));
        session.clear();
        assert_eq!(session.token(), None);
        assert!(Session::anonymous().token().is_none());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:5000/", Session::anonymous());
        assert_eq!(client.base_url, "http://localhost:5000");
    }
}
