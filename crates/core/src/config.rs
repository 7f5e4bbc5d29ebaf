//! Configuration loading.
//!
//! Values come from the process environment (with `.env` support through
//! `dotenvy`). A missing cloud name does not prevent the editor from starting;
//! it only blocks uploads, which is reported by [`Config::upload_config_error`].

use crate::error::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use url::Url;

pub const DEFAULT_UPLOAD_PRESET: &str = "unsigned_preset";
pub const DEFAULT_UPLOAD_FOLDER: &str = "tuus-imago";
pub const DEFAULT_SIGNATURE_URL: &str =
    "http://127.0.0.1:8888/.netlify/functions/cloudinary-signature";
pub const DEFAULT_UPLOAD_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Prefix used by the storefront's bundler. Variables carrying it are only
/// visible to the browser build, so finding them here means a misconfiguration.
const BUNDLER_PREFIX: &str = "VITE_";

#[derive(Clone, Debug)]
pub struct Config {
    pub cloud_name: String,
    pub upload_preset: String,
    pub upload_folder: String,
    pub signature_url: String,
    /// Base of the CDN upload API, overridable for staging and tests.
    pub upload_api_base: String,
    /// Named transformation applied ahead of the AI effect tokens.
    pub ai_template: Option<String>,
    /// Set when only the bundler-prefixed cloud name was found.
    prefixed_cloud_name_only: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let cloud_name = non_empty("CLOUDINARY_CLOUD_NAME").unwrap_or_default();
        let prefixed_cloud_name_only = cloud_name.is_empty()
            && non_empty(&format!("{BUNDLER_PREFIX}CLOUDINARY_CLOUD_NAME")).is_some();

        let mut builder = Config::builder()
            .with_cloud_name(cloud_name)
            .with_upload_preset(
                non_empty("CLOUDINARY_UPLOAD_PRESET")
                    .unwrap_or_else(|| DEFAULT_UPLOAD_PRESET.to_string()),
            )
            .with_folder(
                non_empty("TUUS_IMAGO_UPLOAD_FOLDER")
                    .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string()),
            )
            .with_signature_url(
                non_empty("TUUS_IMAGO_SIGNATURE_URL")
                    .unwrap_or_else(|| DEFAULT_SIGNATURE_URL.to_string()),
            );

        if let Some(template) = non_empty("CLOUDINARY_AI_TEMPLATE") {
            builder = builder.with_ai_template(template);
        }
        if let Some(base) = non_empty("TUUS_IMAGO_UPLOAD_API") {
            builder = builder.with_upload_api_base(base);
        }

        builder.prefixed_cloud_name_only = prefixed_cloud_name_only;
        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Turns a loaded configuration back into a builder so individual values
    /// can be overridden without losing what was detected in the environment.
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder {
            cloud_name: Some(self.cloud_name),
            upload_preset: Some(self.upload_preset),
            folder: Some(self.upload_folder),
            signature_url: Some(self.signature_url),
            upload_api_base: Some(self.upload_api_base),
            ai_template: self.ai_template,
            prefixed_cloud_name_only: self.prefixed_cloud_name_only,
        }
    }

    /// Explains why an upload cannot be attempted, or `None` when the
    /// configuration is complete.
    pub fn upload_config_error(&self) -> Option<String> {
        if self.cloud_name.is_empty() {
            if self.prefixed_cloud_name_only {
                return Some(
                    "Found VITE_CLOUDINARY_CLOUD_NAME but not CLOUDINARY_CLOUD_NAME. \
                     The editor reads non-prefixed variables; rename it"
                        .to_string(),
                );
            }
            return Some("CLOUDINARY_CLOUD_NAME is not set".to_string());
        }
        if self.upload_preset.is_empty() {
            return Some("CLOUDINARY_UPLOAD_PRESET is empty".to_string());
        }
        None
    }

    /// Endpoint receiving the multipart image upload.
    pub fn upload_endpoint(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.upload_api_base.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

/// Builder for programmatic configuration (CLI overrides, tests).
#[derive(Default)]
pub struct ConfigBuilder {
    cloud_name: Option<String>,
    upload_preset: Option<String>,
    folder: Option<String>,
    signature_url: Option<String>,
    upload_api_base: Option<String>,
    ai_template: Option<String>,
    prefixed_cloud_name_only: bool,
}

impl ConfigBuilder {
    pub fn with_cloud_name(mut self, name: impl Into<String>) -> Self {
        self.cloud_name = Some(name.into());
        self
    }

    pub fn with_upload_preset(mut self, preset: impl Into<String>) -> Self {
        self.upload_preset = Some(preset.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_signature_url(mut self, url: impl Into<String>) -> Self {
        self.signature_url = Some(url.into());
        self
    }

    pub fn with_upload_api_base(mut self, base: impl Into<String>) -> Self {
        self.upload_api_base = Some(base.into());
        self
    }

    pub fn with_ai_template(mut self, template: impl Into<String>) -> Self {
        let template = template.into();
        self.ai_template = (!template.trim().is_empty()).then(|| template.trim().to_string());
        self
    }

    /// Validates URLs and fills defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the signature URL or upload API base is
    /// not an absolute URL.
    pub fn build(self) -> Result<Config> {
        let signature_url = self
            .signature_url
            .unwrap_or_else(|| DEFAULT_SIGNATURE_URL.to_string());
        Url::parse(&signature_url)
            .map_err(|e| AppError::config(format!("Invalid signature URL '{}': {}", signature_url, e)))?;

        let upload_api_base = self
            .upload_api_base
            .unwrap_or_else(|| DEFAULT_UPLOAD_API_BASE.to_string());
        Url::parse(&upload_api_base)
            .map_err(|e| AppError::config(format!("Invalid upload API URL '{}': {}", upload_api_base, e)))?;

        Ok(Config {
            cloud_name: self.cloud_name.unwrap_or_default(),
            upload_preset: self
                .upload_preset
                .unwrap_or_else(|| DEFAULT_UPLOAD_PRESET.to_string()),
            upload_folder: self
                .folder
                .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string()),
            signature_url,
            upload_api_base,
            ai_template: self.ai_template,
            prefixed_cloud_name_only: self.prefixed_cloud_name_only,
        })
    }
}
