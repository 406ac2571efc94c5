use crate::DomainResult;
use crate::post::{ModerationStatus, PostHead};
use crate::ports::BoxFuture;

/// The slice of the external post store this core touches: the current
/// version (read) and the moderation status (write, always guarded).
#[allow(clippy::needless_pass_by_value)]
pub trait PostRepository: Send + Sync {
    fn get_head(&self, post_id: &str) -> BoxFuture<'_, DomainResult<Option<PostHead>>>;

    /// Applies a moderation status only while the post is still at the
    /// given version. Returns `false` when the post has moved on and the
    /// update was skipped.
    fn apply_moderation_if_version(
        &self,
        post_id: &str,
        expected_version: i64,
        status: ModerationStatus,
    ) -> BoxFuture<'_, DomainResult<bool>>;

    /// Sweeper shortcut: marks the post failed only while its moderation
    /// status is still `pending`. Returns `false` when already decided.
    fn fail_if_pending(&self, post_id: &str) -> BoxFuture<'_, DomainResult<bool>>;
}
