//! Fan-out of one artifact to every enabled platform, with per-platform
//! failure isolation.

use std::sync::Arc;

use chrono::Utc;

use briefcast_core::types::{
    AttemptStatus, ContentArtifact, Platform, PublishAttempt, RunOutcome, truncate_chars,
};

/// Error summaries recorded in history are capped at this many chars.
const MAX_ERROR_CHARS: usize = 500;

pub struct PublishCoordinator {
    clients: Vec<Arc<dyn crate::PublishClient>>,
}

impl PublishCoordinator {
    pub fn new(clients: Vec<Arc<dyn crate::PublishClient>>) -> Self {
        Self { clients }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.clients.iter().map(|c| c.platform()).collect()
    }

    /// Attempt every platform in turn. A failure is recorded and the loop
    /// moves on; a prior success is never rolled back.
    pub async fn publish_all(
        &self,
        run_id: &str,
        artifact: &ContentArtifact,
    ) -> Vec<PublishAttempt> {
        let mut attempts = Vec::with_capacity(self.clients.len());

        for client in &self.clients {
            let platform = client.platform();
            let text = platform_text(artifact, platform);
            let image = artifact.chart_path.as_deref();

            let attempt = match client.publish(text, image).await {
                Ok(receipt) => {
                    tracing::info!("Published to {platform}: {}", receipt.post_id);
                    PublishAttempt {
                        id: PublishAttempt::new_id(),
                        run_id: run_id.to_string(),
                        platform,
                        status: AttemptStatus::Success,
                        post_id: Some(receipt.post_id),
                        error: None,
                        attempted_at: Utc::now(),
                    }
                }
                Err(e) => {
                    tracing::error!("Publish to {platform} failed: {e}");
                    PublishAttempt {
                        id: PublishAttempt::new_id(),
                        run_id: run_id.to_string(),
                        platform,
                        status: AttemptStatus::Failed,
                        post_id: None,
                        error: Some(truncate_chars(&e.to_string(), MAX_ERROR_CHARS)),
                        attempted_at: Utc::now(),
                    }
                }
            };
            attempts.push(attempt);
        }

        attempts
    }
}

/// The text variant used for a given platform.
fn platform_text(artifact: &ContentArtifact, platform: Platform) -> &str {
    match platform {
        Platform::LinkedIn => artifact
            .linkedin_text
            .as_deref()
            .unwrap_or(&artifact.text),
        Platform::X => &artifact.text,
    }
}

/// Classify a finished publish fan-out. An empty attempt list means the
/// run published nowhere by design (dry run) and counts as completed.
pub fn classify_outcome(attempts: &[PublishAttempt]) -> RunOutcome {
    if attempts.is_empty() {
        return RunOutcome::Completed;
    }
    let successes = attempts
        .iter()
        .filter(|a| a.status == AttemptStatus::Success)
        .count();
    if successes == attempts.len() {
        RunOutcome::Completed
    } else if successes > 0 {
        RunOutcome::PartiallyCompleted
    } else {
        RunOutcome::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use briefcast_core::error::{PlatformError, PlatformErrorKind};
    use briefcast_core::types::{ChartSpec, PostReceipt};
    use std::path::Path;

    struct StubPublisher {
        platform: Platform,
        fail: bool,
    }

    #[async_trait]
    impl crate::PublishClient for StubPublisher {
        fn platform(&self) -> Platform {
            self.platform
        }
        async fn publish(
            &self,
            _text: &str,
            _image: Option<&Path>,
        ) -> std::result::Result<PostReceipt, PlatformError> {
            if self.fail {
                Err(PlatformError::new(PlatformErrorKind::Auth, "bad token"))
            } else {
                Ok(PostReceipt {
                    post_id: format!("{}-123", self.platform),
                })
            }
        }
    }

    fn artifact() -> ContentArtifact {
        ContentArtifact {
            text: "primary".into(),
            linkedin_text: Some("li variant".into()),
            chart: ChartSpec::default(),
            chart_path: None,
            story_title: "t".into(),
            story_url: None,
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_block_other_platforms() {
        let coordinator = PublishCoordinator::new(vec![
            Arc::new(StubPublisher {
                platform: Platform::X,
                fail: true,
            }),
            Arc::new(StubPublisher {
                platform: Platform::LinkedIn,
                fail: false,
            }),
        ]);

        let attempts = coordinator.publish_all("run-1", &artifact()).await;
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].status, AttemptStatus::Failed);
        assert!(attempts[0].error.as_deref().unwrap().contains("bad token"));
        assert_eq!(attempts[1].status, AttemptStatus::Success);
        assert_eq!(classify_outcome(&attempts), RunOutcome::PartiallyCompleted);
    }

    #[tokio::test]
    async fn test_all_success_is_completed() {
        let coordinator = PublishCoordinator::new(vec![Arc::new(StubPublisher {
            platform: Platform::X,
            fail: false,
        })]);
        let attempts = coordinator.publish_all("run-2", &artifact()).await;
        assert_eq!(classify_outcome(&attempts), RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_all_failed_is_failed() {
        let coordinator = PublishCoordinator::new(vec![Arc::new(StubPublisher {
            platform: Platform::X,
            fail: true,
        })]);
        let attempts = coordinator.publish_all("run-3", &artifact()).await;
        assert_eq!(classify_outcome(&attempts), RunOutcome::Failed);
    }

    #[test]
    fn test_platform_text_variant() {
        let art = artifact();
        assert_eq!(platform_text(&art, Platform::X), "primary");
        assert_eq!(platform_text(&art, Platform::LinkedIn), "li variant");

        let mut no_variant = artifact();
        no_variant.linkedin_text = None;
        assert_eq!(platform_text(&no_variant, Platform::LinkedIn), "primary");
    }
}
