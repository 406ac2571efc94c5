use crate::DomainResult;
use crate::job::ModerationJob;
use crate::post::ModerationStatus;
use crate::ports::BoxFuture;

/// Persisted moderation jobs, the single source of truth for the pipeline.
///
/// Every mutating method is atomic with respect to all other port calls:
/// the guard clause ("still pending", "this version") and the write happen
/// in one step, which is what makes duplicate deliveries and concurrent
/// producers safe without optimistic version columns on the job itself.
#[allow(clippy::needless_pass_by_value)]
pub trait ModerationJobRepository: Send + Sync {
    /// Inserts the given pending jobs, skipping any whose
    /// `(post_id, post_version, source_field)` triple already exists.
    /// Returns the jobs actually inserted.
    fn create_pending(
        &self,
        jobs: &[ModerationJob],
    ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>>;

    fn get(&self, job_id: &str) -> BoxFuture<'_, DomainResult<Option<ModerationJob>>>;

    fn list_for_version(
        &self,
        post_id: &str,
        post_version: i64,
    ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>>;

    /// Conditionally resolves one job, guarded by `status = pending`.
    /// Returns the updated job, or `None` when the job had already left
    /// `pending` (a concurrent delivery or sweep won). Unknown job ids are
    /// `DomainError::NotFound`.
    fn transition_if_pending(
        &self,
        job_id: &str,
        status: ModerationStatus,
        error_message: Option<String>,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Option<ModerationJob>>>;

    /// Bulk supersession: fails every still-pending job of one post edition
    /// in a single guarded update. Returns how many jobs were failed.
    fn fail_pending_for_version(
        &self,
        post_id: &str,
        post_version: i64,
        error_message: &str,
        updated_at_ms: i64,
    ) -> BoxFuture<'_, DomainResult<usize>>;

    /// Jobs still pending whose `created_at_ms` is strictly before the
    /// cutoff; the timeout sweeper's work set.
    fn list_pending_created_before(
        &self,
        cutoff_ms: i64,
    ) -> BoxFuture<'_, DomainResult<Vec<ModerationJob>>>;
}
