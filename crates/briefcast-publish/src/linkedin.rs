//! LinkedIn publisher — Posts API with the three-step image flow:
//! initialize upload, PUT the binary, create the post referencing the
//! returned image URN.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use briefcast_core::config::LinkedInCredentials;
use briefcast_core::error::{PlatformError, PlatformErrorKind};
use briefcast_core::types::{Platform, PostReceipt};

use crate::PublishClient;

const API_BASE: &str = "https://api.linkedin.com";
const API_VERSION: &str = "202506";

pub struct LinkedInPublisher {
    access_token: String,
    person_urn: String,
    client: reqwest::Client,
}

impl LinkedInPublisher {
    pub fn new(creds: &LinkedInCredentials, timeout: Duration) -> Self {
        Self {
            access_token: creds.access_token.clone(),
            person_urn: creds.person_urn.clone(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    fn author_urn(&self) -> String {
        format!("urn:li:person:{}", self.person_urn)
    }

    fn rest_headers(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.access_token))
            .header("LinkedIn-Version", API_VERSION)
            .header("X-Restli-Protocol-Version", "2.0.0")
    }

    fn post_body(&self, text: &str, image_urn: Option<&str>) -> serde_json::Value {
        let mut body = json!({
            "author": self.author_urn(),
            "commentary": text,
            "visibility": "PUBLIC",
            "distribution": {
                "feedDistribution": "MAIN_FEED",
                "targetEntities": [],
                "thirdPartyDistributionChannels": [],
            },
            "lifecycleState": "PUBLISHED",
        });
        if let Some(urn) = image_urn {
            body["content"] = json!({ "media": { "title": "Chart", "id": urn } });
        }
        body
    }

    async fn create_post(
        &self,
        text: &str,
        image_urn: Option<&str>,
    ) -> std::result::Result<PostReceipt, PlatformError> {
        let response = self
            .rest_headers(self.client.post(format!("{API_BASE}/rest/posts")))
            .json(&self.post_body(text, image_urn))
            .send()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, e.to_string()))?;

        let status = response.status();
        if status.as_u16() != 201 {
            let text = response.text().await.unwrap_or_default();
            return Err(PlatformError::from_status(
                status.as_u16(),
                format!("post create failed ({status}): {text}"),
            ));
        }

        let post_urn = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        tracing::info!("LinkedIn post created: {post_urn}");
        Ok(PostReceipt { post_id: post_urn })
    }

    /// Stage the image: initialize the upload, then PUT the binary.
    /// Returns the image URN the post will reference.
    async fn stage_image(&self, path: &Path) -> std::result::Result<String, PlatformError> {
        let init_body = json!({
            "initializeUploadRequest": { "owner": self.author_urn() }
        });
        let response = self
            .rest_headers(
                self.client
                    .post(format!("{API_BASE}/rest/images?action=initializeUpload")),
            )
            .json(&init_body)
            .send()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::from_status(
                status.as_u16(),
                "image upload initialize failed",
            ));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, e.to_string()))?;
        let upload_url = payload["value"]["uploadUrl"]
            .as_str()
            .ok_or_else(|| {
                PlatformError::new(PlatformErrorKind::Other, "initialize reply missing uploadUrl")
            })?
            .to_string();
        let image_urn = payload["value"]["image"]
            .as_str()
            .ok_or_else(|| {
                PlatformError::new(PlatformErrorKind::Other, "initialize reply missing image urn")
            })?
            .to_string();

        let bytes = std::fs::read(path)
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, format!("read image: {e}")))?;
        let upload = self
            .client
            .put(&upload_url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, e.to_string()))?;

        if !upload.status().is_success() {
            return Err(PlatformError::from_status(
                upload.status().as_u16(),
                "image binary upload failed",
            ));
        }

        tracing::info!("LinkedIn image uploaded: {image_urn}");
        Ok(image_urn)
    }
}

#[async_trait]
impl PublishClient for LinkedInPublisher {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn publish(
        &self,
        text: &str,
        image: Option<&Path>,
    ) -> std::result::Result<PostReceipt, PlatformError> {
        let image_urn = match image {
            Some(path) => match self.stage_image(path).await {
                Ok(urn) => Some(urn),
                Err(e) => {
                    tracing::warn!("LinkedIn image staging failed, posting text-only: {e}");
                    None
                }
            },
            None => None,
        };
        self.create_post(text, image_urn.as_deref()).await
    }
}
