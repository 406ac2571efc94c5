use std::collections::HashMap;
use std::sync::Arc;

use ronda_domain::DomainResult;
use ronda_domain::error::DomainError;
use ronda_domain::job::ModerationJob;
use ronda_domain::ports::BoxFuture;
use ronda_domain::ports::jobs::ModerationJobRepository;
use ronda_domain::ports::posts::PostRepository;
use ronda_domain::post::{ModerationStatus, PostHead};
use tokio::sync::RwLock;

/// In-memory job store. Every conditional mutation runs start to finish
/// under one write guard, which gives the atomicity the ports demand; a SQL
/// adapter would use single conditional UPDATE statements instead.
#[derive(Default)]
pub struct InMemoryModerationJobRepository {
    jobs: Arc<RwLock<HashMap<String, ModerationJob>>>,
}

impl InMemoryModerationJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<ModerationJob> {
        self.jobs.read().await.values().cloned().collect()
    }
}

impl ModerationJobRepository for InMemoryModerationJobRepository {
    fn create_pending(
        &self,
        jobs: &[ModerationJob],
    ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>> {
        let jobs = jobs.to_vec();
        let store = self.jobs.clone();
        Box::pin(async move {
            let mut guard = store.write().await;
            let mut inserted = Vec::new();
            for job in jobs {
                let duplicate = guard.values().any(|existing| {
                    existing.post_id == job.post_id
                        && existing.post_version == job.post_version
                        && existing.source_field == job.source_field
                });
                if duplicate {
                    continue;
                }
                guard.insert(job.id.clone(), job.clone());
                inserted.push(job);
            }
            Ok(inserted)
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
            let mut rows: Vec<ModerationJob> = store
                .read()
                .await
                .values()
                .filter(|job| job.post_id == post_id && job.post_version == post_version)
                .cloned()
                .collect();
            rows.sort_by(|left, right| left.source_field.cmp(&right.source_field));
            Ok(rows)
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
        post_id: &str,
        post_version: i64,
        error_message: &str,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<usize>> {
        let post_id = post_id.to_string();
        let error_message = error_message.to_string();
        let store = self.jobs.clone();
        Box::pin(async move {
            let mut guard = store.write().await;
            let mut failed = 0usize;
            for job in guard.values_mut() {
                if job.post_id == post_id && job.post_version == post_version && job.is_pending() {
                    job.resolve(
                        ModerationStatus::Failed,
                        Some(error_message.clone()),
                        updated_at_ms,
                    )?;
                    failed += 1;
                }
            }
            Ok(failed)
        })
    }

    fn list_pending_created_before(
        &self,
        cutoff_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>> {
        let store = self.jobs.clone();
        Box::pin(async move {
            let mut rows: Vec<ModerationJob> = store
                .read()
                .await
                .values()
                .filter(|job| job.is_pending() && job.created_at_ms < cutoff_ms)
                .cloned()
                .collect();
            rows.sort_by(|left, right| left.created_at_ms.cmp(&right.created_at_ms));
            Ok(rows)
        })
    }
}

/// In-memory stand-in for the external post store: just the head fields this
/// core reads and writes.
#[derive(Default)]
pub struct InMemoryPostRepository {
    heads: Arc<RwLock<HashMap<String, PostHead>>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_head(&self, head: PostHead) {
        self.heads.write().await.insert(head.post_id.clone(), head);
    }
}

impl PostRepository for InMemoryPostRepository {
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
