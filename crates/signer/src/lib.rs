//! Upload-signature service for tuus-imago.
//!
//! Holds the CDN API secret so clients never see it. A client posts the
//! parameters it intends to upload with, and receives a signature over
//! those parameters plus a server-chosen timestamp:
//!
//! ```text
//! POST /sign  {"paramsToSign": {"upload_preset": "...", "folder": "..."}}
//!   -> 200    {"signature": "<sha1 hex>", "timestamp": 1700000000, "apiKey": "..."}
//! ```
//!
//! The same handler is mounted at `/.netlify/functions/cloudinary-signature`
//! so existing storefront deployments keep working.

pub mod error;
pub mod handlers;
pub mod signature;

pub use error::SignerError;
pub use signature::{params_from_body, sign_params, signature_payload};

use actix_web::web;
use std::env;

pub const SIGN_PATH: &str = "/sign";
pub const LEGACY_SIGN_PATH: &str = "/.netlify/functions/cloudinary-signature";

const API_KEY_VAR: &str = "CLOUDINARY_API_KEY";
const API_SECRET_VAR: &str = "CLOUDINARY_API_SECRET";
const BUNDLER_PREFIX: &str = "VITE_";

/// Server-side CDN credentials. Missing values are reported per request.
#[derive(Clone, Default)]
pub struct Credentials {
    api_key: Option<String>,
    api_secret: Option<String>,
    prefixed_present: bool,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_secret: Some(api_secret.into()),
            prefixed_present: false,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let prefixed = |key: &str| non_empty(&format!("{BUNDLER_PREFIX}{key}")).is_some();
        Self {
            api_key: non_empty(API_KEY_VAR),
            api_secret: non_empty(API_SECRET_VAR),
            prefixed_present: prefixed(API_KEY_VAR) || prefixed(API_SECRET_VAR),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// Returns `(api_key, api_secret)`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::MissingCredentials`] if either is absent.
    pub fn pair(&self) -> Result<(&str, &str), SignerError> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(SignerError::MissingCredentials {
                prefixed: self.prefixed_present,
            }),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("prefixed_present", &self.prefixed_present)
            .finish()
    }
}

/// Registers the signing routes and the health check.
///
/// The caller provides [`Credentials`] as `web::Data`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    for path in [SIGN_PATH, LEGACY_SIGN_PATH] {
        cfg.service(
            web::resource(path)
                .route(web::post().to(handlers::sign))
                .default_service(web::to(handlers::method_not_allowed)),
        );
    }
    cfg.route("/health", web::get().to(handlers::health));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn app_with(credentials: Credentials) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(credentials))
            .configure(configure)
    }

    #[actix_web::test]
    async fn signs_posted_params() {
        let app = test::init_service(app_with(Credentials::new("key-123", "shh"))).await;
        let req = test::TestRequest::post()
            .uri(SIGN_PATH)
            .set_payload(r#"{"paramsToSign":{"upload_preset":"unsigned_preset","folder":"tuus-imago"}}"#)
            .insert_header(("content-type", "application/json"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["apiKey"], "key-123");
        let timestamp = body["timestamp"].as_i64().unwrap();

        let mut params = BTreeMap::new();
        params.insert("upload_preset".to_string(), "unsigned_preset".to_string());
        params.insert("folder".to_string(), "tuus-imago".to_string());
        assert_eq!(body["signature"], sign_params(&params, timestamp, "shh"));
    }

    #[actix_web::test]
    async fn legacy_path_is_mounted() {
        let app = test::init_service(app_with(Credentials::new("k", "s"))).await;
        let req = test::TestRequest::post()
            .uri(LEGACY_SIGN_PATH)
            .set_payload("{}")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn other_methods_are_rejected() {
        let app = test::init_service(app_with(Credentials::new("k", "s"))).await;
        let req = test::TestRequest::get().uri(SIGN_PATH).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Method Not Allowed");
    }

    #[actix_web::test]
    async fn missing_credentials_is_server_error() {
        let credentials = Credentials::from_lookup(|key| {
            (key == "VITE_CLOUDINARY_API_KEY").then(|| "leaked".to_string())
        });
        let app = test::init_service(app_with(credentials)).await;
        let req = test::TestRequest::post().uri(SIGN_PATH).set_payload("{}").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("VITE_CLOUDINARY_"));
    }

    #[actix_web::test]
    async fn invalid_json_is_bad_request() {
        let app = test::init_service(app_with(Credentials::new("k", "s"))).await;
        let req = test::TestRequest::post()
            .uri(SIGN_PATH)
            .set_payload("{oops")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Invalid request payload");
    }

    #[actix_web::test]
    async fn null_body_is_bad_request() {
        let app = test::init_service(app_with(Credentials::new("k", "s"))).await;
        let req = test::TestRequest::post().uri(SIGN_PATH).set_payload("null").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn health_reports_ok() {
        let app = test::init_service(app_with(Credentials::default())).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[::core::prelude::v1::test]
    fn blank_values_count_as_missing() {
        let credentials = Credentials::from_lookup(|key| match key {
            "CLOUDINARY_API_KEY" => Some("k".to_string()),
            "CLOUDINARY_API_SECRET" => Some("  ".to_string()),
            _ => None,
        });
        assert!(!credentials.is_complete());
        assert!(matches!(
            credentials.pair(),
            Err(SignerError::MissingCredentials { prefixed: false })
        ));
    }
}
