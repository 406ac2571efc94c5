use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::DomainResult;
use crate::aggregator::Aggregator;
use crate::messages::JobResultMessage;
use crate::ports::jobs::ModerationJobRepository;
use crate::ports::posts::PostRepository;
use crate::util::now_ms;

/// What the reconciler did with one inbound result. Everything except
/// `Applied` is an absorbed no-op; none of these are errors, because all of
/// them are explained by normal duplicate, late, or garbage delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The job transitioned and aggregation ran.
    Applied,
    /// No job id in the payload and no usable correlation token.
    Unresolvable,
    /// No job record for the resolved id.
    UnknownJob,
    /// The job had already left `pending` when we loaded it.
    AlreadyResolved,
    /// The owning post no longer exists.
    UnknownPost,
    /// The job is pinned to a superseded post edition.
    StaleVersion,
    /// The payload carried no terminal status.
    MissingStatus,
    /// A concurrent delivery or sweep resolved the job between our read and
    /// the guarded write.
    LostRace,
}

/// Consumes asynchronous "job completed" messages: resolves identity,
/// applies an idempotent version-checked transition, and triggers
/// aggregation for the job's edition.
#[derive(Clone)]
pub struct ResultReconciler {
    jobs: Arc<dyn ModerationJobRepository>,
    posts: Arc<dyn PostRepository>,
    aggregator: Aggregator,
}

impl ResultReconciler {
    pub fn new(
        jobs: Arc<dyn ModerationJobRepository>,
        posts: Arc<dyn PostRepository>,
        aggregator: Aggregator,
    ) -> Self {
        Self {
            jobs,
            posts,
            aggregator,
        }
    }

    /// Invoked once per inbound broker message, under at-least-once
    /// delivery. Only storage failures surface as errors; every malformed,
    /// duplicate, or stale message is absorbed.
    pub async fn handle_job_result(
        &self,
        message: JobResultMessage,
        correlation_id: Option<&str>,
    ) -> DomainResult<ReconcileOutcome> {
        let Some(job_id) = resolve_job_id(&message, correlation_id) else {
            warn!("moderation result carries no job id or correlation token, dropping");
            return Ok(ReconcileOutcome::Unresolvable);
        };

        let Some(job) = self.jobs.get(&job_id).await? else {
            warn!(job_id = %job_id, "moderation result for unknown job, dropping");
            return Ok(ReconcileOutcome::UnknownJob);
        };

        if !job.is_pending() {
            debug!(job_id = %job.id, status = %job.status, "duplicate result for resolved job");
            return Ok(ReconcileOutcome::AlreadyResolved);
        }

        let Some(head) = self.posts.get_head(&job.post_id).await? else {
            warn!(job_id = %job.id, post_id = %job.post_id, "moderation result for missing post, dropping");
            return Ok(ReconcileOutcome::UnknownPost);
        };
        if head.version != job.post_version {
            // Supersession already failed this job, or the orchestrator's
            // bulk update is about to.
            info!(
                job_id = %job.id,
                post_id = %job.post_id,
                job_post_version = job.post_version,
                current_post_version = head.version,
                "stale moderation result, dropping"
            );
            return Ok(ReconcileOutcome::StaleVersion);
        }

        let Some(status) = message.status.filter(|status| status.is_terminal()) else {
            warn!(job_id = %job.id, "moderation result carries no terminal status, dropping");
            return Ok(ReconcileOutcome::MissingStatus);
        };

        let transitioned = self
            .jobs
            .transition_if_pending(&job.id, status, message.error_message, now_ms())
            .await?;
        if transitioned.is_none() {
            debug!(job_id = %job.id, "lost resolution race to a concurrent delivery");
            return Ok(ReconcileOutcome::LostRace);
        }

        self.aggregator
            .aggregate_and_apply(&job.post_id, job.post_version)
            .await?;

        Ok(ReconcileOutcome::Applied)
    }
}

fn resolve_job_id(message: &JobResultMessage, correlation_id: Option<&str>) -> Option<String> {
    if let Some(job_id) = &message.job_id {
        if !job_id.trim().is_empty() {
            return Some(job_id.clone());
        }
    }
    correlation_id
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
