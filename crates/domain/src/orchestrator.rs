use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, warn};

use crate::DomainResult;
use crate::error::DomainError;
use crate::factory::build_jobs;
use crate::job::{JobContentType, ModerationJob};
use crate::messages::JobRequestedMessage;
use crate::ports::bus::JobRequestPublisher;
use crate::ports::jobs::ModerationJobRepository;
use crate::post::PostSnapshot;
use crate::util::now_ms;

/// Turns a post write into moderation jobs: supersedes the prior edition's
/// pending jobs, persists one job per content unit of the new edition, and
/// publishes one request per job once the rows are committed.
#[derive(Clone)]
pub struct ModerationOrchestrator {
    jobs: Arc<dyn ModerationJobRepository>,
    publisher: Arc<dyn JobRequestPublisher>,
}

impl ModerationOrchestrator {
    pub fn new(
        jobs: Arc<dyn ModerationJobRepository>,
        publisher: Arc<dyn JobRequestPublisher>,
    ) -> Self {
        Self { jobs, publisher }
    }

    /// `superseded_version` is the edition this write replaces, or `None`
    /// for a brand-new post. Returns the jobs actually created; re-invoking
    /// for the same edition creates nothing and is safe.
    pub async fn enqueue_moderation_for_post(
        &self,
        post: &PostSnapshot,
        superseded_version: Option<i64>,
    ) -> DomainResult<Vec<ModerationJob>> {
        if post.post_id.trim().is_empty() {
            return Err(DomainError::Precondition(
                "post must be persisted before moderation jobs are created".to_string(),
            ));
        }
        if post.version < 1 {
            return Err(DomainError::Precondition(
                "post version must be set before moderation jobs are created".to_string(),
            ));
        }

        self.fail_superseded_pending_jobs(post, superseded_version)
            .await?;

        let created = self.create_jobs_for_edition(post).await?;

        // The repository call above has committed; requests published from
        // here on can never refer to rows a rollback erases. A publish
        // failure is absorbed and the timeout sweeper bounds the damage.
        for job in &created {
            let message = JobRequestedMessage::for_job(job);
            if let Err(err) = self.publisher.publish(&message).await {
                error!(
                    job_id = %job.id,
                    post_id = %job.post_id,
                    post_version = job.post_version,
                    error = %err,
                    "failed to publish moderation job request"
                );
            }
        }

        Ok(created)
    }

    async fn fail_superseded_pending_jobs(
        &self,
        post: &PostSnapshot,
        superseded_version: Option<i64>,
    ) -> DomainResult<()> {
        let Some(superseded) = superseded_version else {
            return Ok(());
        };
        if superseded == post.version {
            return Ok(());
        }
        let reason = format!("superseded by post version {}", post.version);
        self.jobs
            .fail_pending_for_version(&post.post_id, superseded, &reason, now_ms())
            .await?;
        Ok(())
    }

    async fn create_jobs_for_edition(&self, post: &PostSnapshot) -> DomainResult<Vec<ModerationJob>> {
        let specs = build_jobs(post);
        if specs.is_empty() {
            warn!(post_id = %post.post_id, version = post.version, "post decomposed into no moderation jobs");
            return Ok(Vec::new());
        }

        let existing: HashSet<(String, JobContentType)> = self
            .jobs
            .list_for_version(&post.post_id, post.version)
            .await?
            .into_iter()
            .map(|job| (job.source_field, job.content_type))
            .collect();

        let now = now_ms();
        let new_jobs: Vec<ModerationJob> = specs
            .into_iter()
            .filter(|spec| !existing.contains(&(spec.source_field.clone(), spec.content_type)))
            .map(|spec| ModerationJob::from_spec(spec, &post.post_id, post.version, now))
            .collect();

        if new_jobs.is_empty() {
            return Ok(Vec::new());
        }

        self.jobs.create_pending(&new_jobs).await
    }
}
