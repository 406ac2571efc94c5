use std::sync::Arc;

use tracing::info;

use crate::DomainResult;
use crate::job::ModerationJob;
use crate::ports::jobs::ModerationJobRepository;
use crate::ports::posts::PostRepository;
use crate::post::ModerationStatus;

/// Folds all job outcomes of one post edition into a single status,
/// most-blocking first: any pending job leaves the edition undecided, then
/// failed beats rejected beats approved.
pub fn aggregate_status(jobs: &[ModerationJob]) -> ModerationStatus {
    let mut any_failed = false;
    let mut any_rejected = false;
    for job in jobs {
        match job.status {
            ModerationStatus::Pending => return ModerationStatus::Pending,
            ModerationStatus::Failed => any_failed = true,
            ModerationStatus::Rejected => any_rejected = true,
            ModerationStatus::Approved => {}
        }
    }
    if any_failed {
        ModerationStatus::Failed
    } else if any_rejected {
        ModerationStatus::Rejected
    } else {
        ModerationStatus::Approved
    }
}

#[derive(Clone)]
pub struct Aggregator {
    jobs: Arc<dyn ModerationJobRepository>,
    posts: Arc<dyn PostRepository>,
}

impl Aggregator {
    pub fn new(jobs: Arc<dyn ModerationJobRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { jobs, posts }
    }

    /// Recomputes the aggregate for `(post_id, post_version)` and applies it
    /// to the post while it is still at that version. Returns the applied
    /// status, or `None` when the edition is empty, still undecided, or was
    /// superseded before the aggregate landed.
    pub async fn aggregate_and_apply(
        &self,
        post_id: &str,
        post_version: i64,
    ) -> DomainResult<Option<ModerationStatus>> {
        let jobs = self.jobs.list_for_version(post_id, post_version).await?;
        if jobs.is_empty() {
            return Ok(None);
        }

        let aggregate = aggregate_status(&jobs);
        if !aggregate.is_terminal() {
            return Ok(None);
        }

        let applied = self
            .posts
            .apply_moderation_if_version(post_id, post_version, aggregate)
            .await?;
        if !applied {
            info!(
                post_id,
                post_version,
                aggregate = %aggregate,
                "aggregate is moot, post moved to a newer version"
            );
            return Ok(None);
        }

        Ok(Some(aggregate))
    }
}
