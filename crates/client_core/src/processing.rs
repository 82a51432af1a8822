use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{
    multipart::{Form, Part},
    Client, StatusCode,
};
use serde::Serialize;
use shared::{
    domain::{Algorithm, ColorSpace},
    error::ApiErrorBody,
    protocol::{RgbTriple, WhiteBalanceQuery, WhiteBalanceResponse, APPLY_WHITE_BALANCE_PATH},
};
use tracing::debug;
use url::Url;

use crate::{error::ProcessingError, image_source::ImageFile};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
const UNKNOWN_ERROR_DETAIL: &str = "Unknown error";

#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub algorithm: Algorithm,
    pub input_color_space: ColorSpace,
    pub processing_space: ColorSpace,
    pub file: Arc<ImageFile>,
}

impl ProcessingRequest {
    pub fn query(&self) -> WhiteBalanceQuery {
        WhiteBalanceQuery {
            algorithm: self.algorithm,
            input_color_space: self.input_color_space,
            processing_space: self.processing_space,
        }
    }
}

#[derive(Clone, PartialEq, Serialize)]
pub struct ProcessedImage {
    pub algorithm: Algorithm,
    pub processing_space: ColorSpace,
    #[serde(skip)]
    pub image_png: Vec<u8>,
    pub avg_rgb_before: Option<RgbTriple>,
    pub avg_rgb_after: Option<RgbTriple>,
}

impl fmt::Debug for ProcessedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessedImage")
            .field("algorithm", &self.algorithm)
            .field("processing_space", &self.processing_space)
            .field("image_png_len", &self.image_png.len())
            .field("avg_rgb_before", &self.avg_rgb_before)
            .field("avg_rgb_after", &self.avg_rgb_after)
            .finish()
    }
}

/// Request/response contract of the external white-balance service.
#[async_trait]
pub trait ProcessingClient: Send + Sync {
    async fn process(&self, request: ProcessingRequest) -> Result<ProcessedImage, ProcessingError>;
}

pub struct MissingProcessingClient;

#[async_trait]
impl ProcessingClient for MissingProcessingClient {
    async fn process(&self, _request: ProcessingRequest) -> Result<ProcessedImage, ProcessingError> {
        Err(ProcessingError::Unavailable)
    }
}

pub struct HttpProcessingClient {
    http: Client,
    base_url: String,
}

impl HttpProcessingClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

pub fn normalize_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|err| anyhow::anyhow!("invalid processing service url '{raw}': {err}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("processing service url must be http or https: '{raw}'");
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl ProcessingClient for HttpProcessingClient {
    async fn process(&self, request: ProcessingRequest) -> Result<ProcessedImage, ProcessingError> {
        let part = Part::bytes(request.file.bytes.clone())
            .file_name(request.file.name.clone())
            .mime_str(&request.file.mime_type)
            .map_err(|err| ProcessingError::Transport(err.to_string()))?;
        let form = Form::new().part("file", part);

        let res = self
            .http
            .post(format!("{}{}", self.base_url, APPLY_WHITE_BALANCE_PATH))
            .query(&request.query())
            .multipart(form)
            .send()
            .await
            .map_err(|err| ProcessingError::Transport(err.to_string()))?;

        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|err| ProcessingError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(rejection(status, &body));
        }

        let response: WhiteBalanceResponse = serde_json::from_slice(&body)
            .map_err(|err| ProcessingError::Decode(err.to_string()))?;
        debug!(
            algorithm = %response.algorithm,
            processing_space = %response.processing_space,
            "processing response received"
        );
        decode_response(request.algorithm, response)
    }
}

/// An unparsable body reports "Unknown error"; a parsed body without a
/// detail falls back to the status line.
fn rejection(status: StatusCode, body: &[u8]) -> ProcessingError {
    let (kind, detail) = match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(error) => (error.kind, error.detail),
        Err(_) => (None, UNKNOWN_ERROR_DETAIL.to_string()),
    };
    let detail = if detail.is_empty() {
        format!("HTTP error! status: {}", status.as_u16())
    } else {
        detail
    };
    ProcessingError::Rejected {
        status: status.as_u16(),
        kind,
        detail,
    }
}

pub(crate) fn decode_response(
    requested: Algorithm,
    response: WhiteBalanceResponse,
) -> Result<ProcessedImage, ProcessingError> {
    if response.algorithm != requested {
        return Err(ProcessingError::Decode(format!(
            "service answered for {} but {} was requested",
            response.algorithm, requested
        )));
    }
    let image_png = STANDARD
        .decode(response.image_base64.as_bytes())
        .map_err(|err| ProcessingError::Decode(format!("image payload: {err}")))?;
    Ok(ProcessedImage {
        algorithm: response.algorithm,
        processing_space: response.processing_space,
        image_png,
        avg_rgb_before: response.avg_rgb_before,
        avg_rgb_after: response.avg_rgb_after,
    })
}

#[cfg(test)]
#[path = "tests/processing_tests.rs"]
mod tests;
