//! Signed uploads to the image CDN.
//!
//! An upload runs in three stages:
//!
//! 1. **Validation**: type and size are checked before any network activity.
//! 2. **Signing**: the exact parameters that will be uploaded are sent to the
//!    signature service, which answers with `{signature, timestamp, apiKey}`.
//! 3. **Transfer**: the file is streamed as multipart form data in chunks so
//!    progress can be reported while the body is being sent.
//!
//! Failures at any stage are returned as [`AppError`] values whose text is the
//! message shown to the user. Nothing is retried automatically.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::i18n;
use crate::image_processing::NaturalCrop;
use crate::transform::ImageTransformations;
use futures::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Largest accepted file.
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// MIME types accepted by the editor.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
/// Upper bound for one upload, signature request included.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Size of the body chunks that drive progress reporting.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

const SIGNATURE_FALLBACK_ERROR: &str =
    "Failed to generate upload signature. Make sure the signature service is running.";

/// A file that passed type and size validation.
#[derive(Clone)]
pub struct ValidatedFile {
    name: String,
    mime: &'static str,
    bytes: Arc<[u8]>,
}

impl ValidatedFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ValidatedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Checks the sniffed content type against [`ALLOWED_MIME_TYPES`] and the
/// size against [`MAX_FILE_SIZE`].
///
/// # Errors
///
/// Returns [`AppError::Validation`] with the user-facing message.
pub fn validate_file(name: impl Into<String>, bytes: Vec<u8>) -> Result<ValidatedFile> {
    let mime = image::guess_format(&bytes)
        .ok()
        .map(|format| format.to_mime_type())
        .and_then(|mime| ALLOWED_MIME_TYPES.iter().copied().find(|allowed| *allowed == mime))
        .ok_or_else(|| AppError::validation(i18n::t("upload.unsupportedType")))?;

    if bytes.len() > MAX_FILE_SIZE {
        return Err(AppError::validation(i18n::t("upload.error")));
    }

    Ok(ValidatedFile {
        name: name.into(),
        mime,
        bytes: bytes.into(),
    })
}

/// Resource record returned by the CDN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub public_id: String,
    pub secure_url: String,
    pub width: u32,
    pub height: u32,
    pub bytes: u64,
    pub format: String,
    pub url: String,
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default = "now_rfc3339")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_coordinates: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn default_resource_type() -> String {
    "image".to_string()
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// A finished upload together with the edits that were recorded with it.
///
/// This is the single shape the preview screen consumes, whichever path
/// produced the upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome {
    pub result: UploadResult,
    pub transforms: ImageTransformations,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureResponse {
    signature: String,
    timestamp: i64,
    api_key: String,
}

/// Parameters that are both signed and uploaded.
#[derive(Debug, Clone, Serialize)]
struct SignedParams {
    upload_preset: String,
    folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_coordinates: Option<String>,
    context: String,
}

/// Keeps reported progress within 0..=100 and never lets it go backwards.
#[derive(Clone)]
struct ProgressReporter {
    last: Arc<AtomicU8>,
    sink: Arc<dyn Fn(u8) + Send + Sync>,
}

impl ProgressReporter {
    fn new(sink: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            last: Arc::new(AtomicU8::new(0)),
            sink: Arc::new(sink),
        }
    }

    fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            (self.sink)(percent);
        }
    }

    fn report_bytes(&self, sent: usize, total: usize) {
        if total == 0 {
            return;
        }
        let percent = ((sent as f64 / total as f64) * 100.0).round() as u8;
        self.report(percent);
    }
}

/// Client for the signature service and the CDN upload API.
pub struct Uploader {
    client: Client,
    config: Config,
}

impl Uploader {
    /// Creates an uploader with the default five-minute timeout.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_timeout(config, UPLOAD_TIMEOUT)
    }

    pub fn with_timeout(config: Config, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signs and uploads `file`, recording the crop and transforms with it.
    ///
    /// `on_progress` receives percentages in `0..=100`, never decreasing, and
    /// a final `100` on success.
    ///
    /// # Errors
    ///
    /// - [`AppError::Config`] if the CDN configuration is incomplete
    /// - [`AppError::Signature`] if the signature service refuses
    /// - [`AppError::Timeout`] if the upload takes longer than the timeout
    /// - [`AppError::Network`] for transport failures
    /// - [`AppError::UploadRejected`] for non-2xx or malformed CDN answers
    pub async fn upload(
        &self,
        file: &ValidatedFile,
        crop: Option<NaturalCrop>,
        transforms: &ImageTransformations,
        on_progress: impl Fn(u8) + Send + Sync + 'static,
    ) -> Result<UploadOutcome> {
        if let Some(problem) = self.config.upload_config_error() {
            return Err(AppError::config(format!(
                "{}. Configure the Cloudinary environment variables and an upload preset.",
                problem
            )));
        }

        let progress = ProgressReporter::new(on_progress);
        let params = SignedParams {
            upload_preset: self.config.upload_preset.clone(),
            folder: self.config.upload_folder.clone(),
            custom_coordinates: crop.map(|c| c.to_string()),
            context: transforms.context().to_string(),
        };

        let signature = self.request_signature(&params).await?;
        log::info!(
            "Uploading {} ({} bytes) to {}",
            file.name(),
            file.len(),
            self.config.upload_endpoint()
        );

        let form = self.build_form(file, &params, &signature, progress.clone())?;
        let response = self
            .client
            .post(self.config.upload_endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        let body: Value = serde_json::from_str(if text.is_empty() { "{}" } else { &text })
            .map_err(|_| AppError::UploadRejected(i18n::t("upload.uploadFailed")))?;

        if !status.is_success() || body.get("error").is_some() {
            let message = error_message(&body).unwrap_or_else(|| i18n::t("upload.uploadFailed"));
            log::warn!("Upload rejected with status {}: {}", status, message);
            return Err(AppError::UploadRejected(message));
        }

        let mut result: UploadResult = serde_json::from_value(body)
            .map_err(|_| AppError::UploadRejected(i18n::t("upload.uploadFailed")))?;
        result.custom_coordinates = params.custom_coordinates;
        result.context = Some(params.context);

        progress.report(100);
        log::info!("Uploaded {} as {}", file.name(), result.public_id);

        Ok(UploadOutcome {
            result,
            transforms: *transforms,
        })
    }

    async fn request_signature(&self, params: &SignedParams) -> Result<SignatureResponse> {
        let response = self
            .client
            .post(&self.config.signature_url)
            .json(&serde_json::json!({ "paramsToSign": params }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout
                } else {
                    AppError::signature(format!("{} ({})", SIGNATURE_FALLBACK_ERROR, e))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| SIGNATURE_FALLBACK_ERROR.to_string());
            return Err(AppError::signature(message));
        }

        serde_json::from_str(&text)
            .map_err(|e| AppError::signature(format!("Invalid signature response: {}", e)))
    }

    fn build_form(
        &self,
        file: &ValidatedFile,
        params: &SignedParams,
        signature: &SignatureResponse,
        progress: ProgressReporter,
    ) -> Result<Form> {
        let total = file.len();
        let chunks: Vec<Vec<u8>> = file
            .bytes()
            .chunks(UPLOAD_CHUNK_SIZE)
            .map(<[u8]>::to_vec)
            .collect();

        let mut sent = 0usize;
        let body = stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len();
            progress.report_bytes(sent, total);
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(body), total as u64)
            .file_name(file.name().to_string())
            .mime_str(file.mime())
            .map_err(|e| AppError::network(format!("Invalid MIME type: {}", e)))?;

        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", params.upload_preset.clone())
            .text("folder", params.folder.clone());
        if let Some(coords) = &params.custom_coordinates {
            form = form.text("custom_coordinates", coords.clone());
        }
        Ok(form
            .text("context", params.context.clone())
            .text("timestamp", signature.timestamp.to_string())
            .text("signature", signature.signature.clone())
            .text("api_key", signature.api_key.clone()))
    }
}

fn transport_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout
    } else {
        log::warn!("Upload transport error: {}", e);
        AppError::network(i18n::t("upload.uploadFailed"))
    }
}

/// `error.message` of a CDN error body, or a plain string `error`.
fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
