//! Prompt pre-fill from a hosted image-captioning model.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Credential;

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Captioning service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Unrecognised image format")]
    UnknownFormat,
}

/// Produces a short caption for an image. One blocking round trip, no retry.
pub trait Captioner {
    fn caption(&self, image: &[u8]) -> Result<String, CaptionError>;
}

#[derive(Debug, Serialize)]
struct CaptionRequest<'a> {
    image_url: &'a str,
    length: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    caption: String,
}

/// Moondream's hosted `/caption` endpoint
pub struct MoondreamCaptioner {
    client: Client,
    endpoint: String,
    api_key: Credential,
}

impl MoondreamCaptioner {
    pub fn new(endpoint: impl Into<String>, api_key: Credential) -> Result<Self, CaptionError> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

impl Captioner for MoondreamCaptioner {
    fn caption(&self, image: &[u8]) -> Result<String, CaptionError> {
        let url = data_url(image)?;
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Moondream-Auth", self.api_key.expose())
            .json(&CaptionRequest {
                image_url: &url,
                length: "short",
                stream: false,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(CaptionError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: CaptionResponse = response.json()?;
        log::info!("Generated caption: {}", parsed.caption);
        Ok(parsed.caption)
    }
}

/// `data:<mime>;base64,<payload>` for an encoded image
pub fn data_url(image: &[u8]) -> Result<String, CaptionError> {
    let format = image::guess_format(image).map_err(|_| CaptionError::UnknownFormat)?;
    Ok(format!("data:{};base64,{}", format.to_mime_type(), BASE64.encode(image)))
}
