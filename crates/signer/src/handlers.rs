use crate::error::SignerError;
use crate::signature::{params_from_body, sign_params};
use crate::Credentials;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResponse {
    pub signature: String,
    pub timestamp: i64,
    pub api_key: String,
}

pub async fn sign(
    credentials: web::Data<Credentials>,
    body: web::Bytes,
) -> Result<HttpResponse, SignerError> {
    let (api_key, api_secret) = credentials.pair()?;
    let params = params_from_body(&body)?;

    let timestamp = Utc::now().timestamp();
    let signature = sign_params(&params, timestamp, api_secret);
    log::info!("Signed {} upload parameter(s) at {}", params.len(), timestamp);

    Ok(HttpResponse::Ok().json(SignatureResponse {
        signature,
        timestamp,
        api_key: api_key.to_string(),
    }))
}

pub async fn method_not_allowed() -> Result<HttpResponse, SignerError> {
    Err(SignerError::MethodNotAllowed)
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
