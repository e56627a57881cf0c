//! X (Twitter) publisher — OAuth 1.0a user context, v1.1 media upload,
//! v2 tweet create.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use briefcast_core::config::XCredentials;
use briefcast_core::error::{PlatformError, PlatformErrorKind};
use briefcast_core::types::{Platform, PostReceipt};

use crate::PublishClient;
use crate::oauth1::{OAuth1Credentials, authorization_header};

const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const CREATE_TWEET_URL: &str = "https://api.twitter.com/2/tweets";

pub struct XPublisher {
    creds: OAuth1Credentials,
    client: reqwest::Client,
}

impl XPublisher {
    pub fn new(creds: &XCredentials, timeout: Duration) -> Self {
        Self {
            creds: OAuth1Credentials {
                consumer_key: creds.api_key.clone(),
                consumer_secret: creds.api_secret.clone(),
                token: creds.access_token.clone(),
                token_secret: creds.access_token_secret.clone(),
            },
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Stage the image binary, returning the platform's media reference.
    async fn upload_media(&self, path: &Path) -> std::result::Result<String, PlatformError> {
        let bytes = std::fs::read(path)
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, format!("read image: {e}")))?;

        let part = reqwest::multipart::Part::bytes(bytes).file_name("chart.png");
        let form = reqwest::multipart::Form::new().part("media", part);

        // Multipart bodies contribute no params to the OAuth signature.
        let auth = authorization_header("POST", MEDIA_UPLOAD_URL, &self.creds, &[]);
        let response = self
            .client
            .post(MEDIA_UPLOAD_URL)
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PlatformError::from_status(
                status.as_u16(),
                format!("media upload failed: {payload}"),
            ));
        }

        payload["media_id_string"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::new(PlatformErrorKind::Other, "media upload reply missing id")
            })
    }

    async fn create_tweet(
        &self,
        text: &str,
        media_id: Option<&str>,
    ) -> std::result::Result<PostReceipt, PlatformError> {
        let mut body = json!({ "text": text });
        if let Some(id) = media_id {
            body["media"] = json!({ "media_ids": [id] });
        }

        let auth = authorization_header("POST", CREATE_TWEET_URL, &self.creds, &[]);
        let response = self
            .client
            .post(CREATE_TWEET_URL)
            .header("Authorization", auth)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlatformError::new(PlatformErrorKind::Other, e.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response.json().await.unwrap_or_default();

        if !status.is_success() {
            return Err(PlatformError::from_status(
                status.as_u16(),
                format!("tweet create failed: {payload}"),
            ));
        }

        let post_id = payload["data"]["id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| {
                PlatformError::new(PlatformErrorKind::Other, "tweet reply missing id")
            })?;
        tracing::info!("Tweet posted: {post_id}");
        Ok(PostReceipt { post_id })
    }
}

#[async_trait]
impl PublishClient for XPublisher {
    fn platform(&self) -> Platform {
        Platform::X
    }

    async fn publish(
        &self,
        text: &str,
        image: Option<&Path>,
    ) -> std::result::Result<PostReceipt, PlatformError> {
        let media_id = match image {
            Some(path) => match self.upload_media(path).await {
                Ok(id) => {
                    tracing::info!("Media uploaded, id {id}");
                    Some(id)
                }
                Err(e) => {
                    // Staging failed — fall back to a text-only post
                    // before giving up on this platform.
                    tracing::warn!("X media upload failed, posting text-only: {e}");
                    None
                }
            },
            None => None,
        };
        self.create_tweet(text, media_id.as_deref()).await
    }
}
