use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::DomainResult;
use crate::ports::jobs::ModerationJobRepository;
use crate::ports::posts::PostRepository;
use crate::post::ModerationStatus;
use crate::util::now_ms;

const TIMED_OUT_REASON: &str = "timed out waiting for moderation result";

#[derive(Clone, Debug)]
pub struct SweeperConfig {
    pub job_timeout: Duration,
    pub check_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(600),
            check_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub timed_out: usize,
    pub superseded: usize,
    pub posts_failed: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.timed_out == 0 && self.superseded == 0
    }
}

/// The pipeline's only self-healing mechanism: fails jobs stuck in `pending`
/// past the deadline, cascading to the post when the post is still waiting.
/// Without it, a lost message strands a post in `pending` forever.
#[derive(Clone)]
pub struct TimeoutSweeper {
    jobs: Arc<dyn ModerationJobRepository>,
    posts: Arc<dyn PostRepository>,
    config: SweeperConfig,
}

impl TimeoutSweeper {
    pub fn new(
        jobs: Arc<dyn ModerationJobRepository>,
        posts: Arc<dyn PostRepository>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            jobs,
            posts,
            config,
        }
    }

    pub fn check_interval(&self) -> Duration {
        self.config.check_interval
    }

    /// One sweep pass. Each stuck job goes through the same guarded
    /// transition as the reconciler, so a result racing the sweep cannot
    /// double-resolve a job.
    pub async fn sweep(&self) -> DomainResult<SweepReport> {
        let now = now_ms();
        let cutoff = now - self.config.job_timeout.as_millis() as i64;
        let stuck = self.jobs.list_pending_created_before(cutoff).await?;

        let mut report = SweepReport::default();
        for job in stuck {
            let head = self.posts.get_head(&job.post_id).await?;
            let current_version = head.as_ref().map(|head| head.version);

            if current_version.is_some_and(|version| version != job.post_version) {
                let reason = format!(
                    "superseded by post version {}",
                    current_version.unwrap_or_default()
                );
                if self
                    .jobs
                    .transition_if_pending(&job.id, ModerationStatus::Failed, Some(reason), now)
                    .await?
                    .is_some()
                {
                    report.superseded += 1;
                }
                continue;
            }

            let transitioned = self
                .jobs
                .transition_if_pending(
                    &job.id,
                    ModerationStatus::Failed,
                    Some(TIMED_OUT_REASON.to_string()),
                    now,
                )
                .await?;
            if transitioned.is_none() {
                // A worker result landed between the list and the guard.
                continue;
            }
            report.timed_out += 1;

            // A timed-out job can never resolve to anything else, so the
            // post is failed directly instead of re-aggregating.
            if self.posts.fail_if_pending(&job.post_id).await? {
                report.posts_failed += 1;
            }
        }

        if !report.is_empty() {
            warn!(
                timed_out = report.timed_out,
                superseded = report.superseded,
                posts_failed = report.posts_failed,
                "swept stuck moderation jobs"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::job::{JobSpec, ModerationJob};
    use crate::ports::BoxFuture;
    use crate::post::PostHead;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MockStore {
        jobs: Arc<RwLock<HashMap<String, ModerationJob>>>,
        heads: Arc<RwLock<HashMap<String, PostHead>>>,
    }

    impl MockStore {
        async fn seed_post(&self, post_id: &str, version: i64, status: ModerationStatus) {
            self.heads.write().await.insert(
                post_id.to_string(),
                PostHead {
                    post_id: post_id.to_string(),
                    version,
                    moderation_status: status,
                },
            );
        }

        async fn seed_job(&self, post_id: &str, post_version: i64, created_at_ms: i64) -> String {
            let job = ModerationJob::from_spec(
                JobSpec::text("title", "payload"),
                post_id,
                post_version,
                created_at_ms,
            );
            let id = job.id.clone();
            self.jobs.write().await.insert(id.clone(), job);
            id
        }

        async fn job(&self, job_id: &str) -> ModerationJob {
            self.jobs.read().await.get(job_id).expect("job").clone()
        }

        async fn post_status(&self, post_id: &str) -> ModerationStatus {
            self.heads.read().await.get(post_id).expect("head").moderation_status
        }
    }

    impl ModerationJobRepository for MockStore {
        fn create_pending(
            &self,
            jobs: &[ModerationJob],
        ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>> {
            let jobs = jobs.to_vec();
            let store = self.jobs.clone();
            Box::pin(async move {
                let mut guard = store.write().await;
                for job in &jobs {
                    guard.insert(job.id.clone(), job.clone());
                }
                Ok(jobs)
            })
        }

        fn get(&self, job_id: &str) -> BoxFuture<'_, DomainResult<Option<ModerationJob>>> {
            let job_id = job_id.to_string();
            let store = self.jobs.clone();
            Box::pin(async move { Ok(store.read().await.get(&job_id).cloned()) })
        }

        fn list_for_version(
            &self,
            post_id: &str,
            post_version: i64,
        ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>> {
            let post_id = post_id.to_string();
            let store = self.jobs.clone();
            Box::pin(async move {
                Ok(store
                    .read()
                    .await
                    .values()
                    .filter(|job| job.post_id == post_id && job.post_version == post_version)
                    .cloned()
                    .collect())
            })
        }

        fn transition_if_pending(
            &self,
            job_id: &str,
            status: ModerationStatus,
            error_message: Option<String>,
            updated_at_ms: i64,
        ) -> BoxFuture<'_, DomainResult<Option<ModerationJob>>> {
            let job_id = job_id.to_string();
            let store = self.jobs.clone();
            Box::pin(async move {
                let mut guard = store.write().await;
                let job = guard.get_mut(&job_id).ok_or(DomainError::NotFound)?;
                if !job.is_pending() {
                    return Ok(None);
                }
                job.resolve(status, error_message, updated_at_ms)?;
                Ok(Some(job.clone()))
            })
        }

        fn fail_pending_for_version(
            &self,
            _post_id: &str,
            _post_version: i64,
            _error_message: &str,
            _updated_at_ms: i64,
        ) -> BoxFuture<'_, DomainResult<usize>> {
            Box::pin(async move { Ok(0) })
        }

        fn list_pending_created_before(
            &self,
            cutoff_ms: i64,
        ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>> {
            let store = self.jobs.clone();
            Box::pin(async move {
                Ok(store
                    .read()
                    .await
                    .values()
                    .filter(|job| job.is_pending() && job.created_at_ms < cutoff_ms)
                    .cloned()
                    .collect())
            })
        }
    }

    impl PostRepository for MockStore {
        fn get_head(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Option<PostHead>>> {
            let post_id = post_id.to_string();
            let heads = self.heads.clone();
            Box::pin(async move { Ok(heads.read().await.get(&post_id).cloned()) })
        }

        fn apply_moderation_if_version(
            &self,
            post_id: &str,
            expected_version: i64,
            status: ModerationStatus,
        ) -> BoxFuture<'_, DomainResult<bool>> {
            let post_id = post_id.to_string();
            let heads = self.heads.clone();
            Box::pin(async move {
                let mut guard = heads.write().await;
                match guard.get_mut(&post_id) {
                    Some(head) if head.version == expected_version => {
                        head.moderation_status = status;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            })
        }

        fn fail_if_pending(&self, post_id: &str) -> BoxFuture<'_, DomainResult<bool>> {
            let post_id = post_id.to_string();
            let heads = self.heads.clone();
            Box::pin(async move {
                let mut guard = heads.write().await;
                match guard.get_mut(&post_id) {
                    Some(head) if head.moderation_status == ModerationStatus::Pending => {
                        head.moderation_status = ModerationStatus::Failed;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            })
        }
    }

    fn sweeper(store: &Arc<MockStore>, job_timeout: Duration) -> TimeoutSweeper {
        let jobs: Arc<dyn ModerationJobRepository> = store.clone();
        let posts: Arc<dyn PostRepository> = store.clone();
        TimeoutSweeper::new(
            jobs,
            posts,
            SweeperConfig {
                job_timeout,
                check_interval: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn times_out_stuck_job_and_fails_the_post() {
        let store = Arc::new(MockStore::default());
        store.seed_post("post-1", 1, ModerationStatus::Pending).await;
        let job_id = store.seed_job("post-1", 1, 0).await;

        let report = sweeper(&store, Duration::from_millis(1))
            .sweep()
            .await
            .expect("sweep");

        assert_eq!(report.timed_out, 1);
        assert_eq!(report.posts_failed, 1);
        let job = store.job(&job_id).await;
        assert_eq!(job.status, ModerationStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some(TIMED_OUT_REASON));
        assert_eq!(store.post_status("post-1").await, ModerationStatus::Failed);
    }

    #[tokio::test]
    async fn superseded_stuck_job_fails_without_touching_the_post() {
        let store = Arc::new(MockStore::default());
        store.seed_post("post-1", 3, ModerationStatus::Pending).await;
        let job_id = store.seed_job("post-1", 1, 0).await;

        let report = sweeper(&store, Duration::from_millis(1))
            .sweep()
            .await
            .expect("sweep");

        assert_eq!(report.superseded, 1);
        assert_eq!(report.timed_out, 0);
        let job = store.job(&job_id).await;
        assert_eq!(job.status, ModerationStatus::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("superseded by post version 3")
        );
        assert_eq!(store.post_status("post-1").await, ModerationStatus::Pending);
    }

    #[tokio::test]
    async fn fresh_jobs_are_left_alone() {
        let store = Arc::new(MockStore::default());
        store.seed_post("post-1", 1, ModerationStatus::Pending).await;
        let job_id = store.seed_job("post-1", 1, now_ms()).await;

        let report = sweeper(&store, Duration::from_secs(600))
            .sweep()
            .await
            .expect("sweep");

        assert!(report.is_empty());
        assert!(store.job(&job_id).await.is_pending());
    }

    #[tokio::test]
    async fn decided_post_is_not_overwritten_by_timeout() {
        let store = Arc::new(MockStore::default());
        store.seed_post("post-1", 1, ModerationStatus::Rejected).await;
        store.seed_job("post-1", 1, 0).await;

        let report = sweeper(&store, Duration::from_millis(1))
            .sweep()
            .await
            .expect("sweep");

        assert_eq!(report.timed_out, 1);
        assert_eq!(report.posts_failed, 0);
        assert_eq!(store.post_status("post-1").await, ModerationStatus::Rejected);
    }
}
