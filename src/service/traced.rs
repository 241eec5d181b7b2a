use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use super::*;

/// Logs every remote call with its kind, outcome and latency.
pub struct TracedService {
    inner: Arc<dyn SocialService>,
}

impl TracedService {
    pub fn new(inner: Arc<dyn SocialService>) -> Self {
        Self { inner }
    }

    async fn observe<T, F>(&self, call: RemoteCall, fut: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>> + Send,
    {
        let started = Instant::now();
        let result = fut.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::debug!(
                call = call.name(),
                kind = %call.kind(),
                caller = %self.inner.caller(),
                elapsed_ms,
                "remote call settled"
            ),
            Err(e) => tracing::warn!(
                call = call.name(),
                kind = %call.kind(),
                caller = %self.inner.caller(),
                elapsed_ms,
                error = %e,
                "remote call failed"
            ),
        }

        result
    }
}

#[async_trait]
impl SocialService for TracedService {
    fn caller(&self) -> &Principal {
        self.inner.caller()
    }

    async fn get_current_user(&self) -> ServiceResult<Option<UserProfile>> {
        self.observe(RemoteCall::GetCurrentUser, self.inner.get_current_user())
            .await
    }

    async fn create_profile(&self, request: UpdateProfileRequest) -> ServiceResult<UserProfile> {
        self.observe(RemoteCall::CreateProfile, self.inner.create_profile(request))
            .await
    }

    async fn update_profile(&self, request: UpdateProfileRequest) -> ServiceResult<UserProfile> {
        self.observe(RemoteCall::UpdateProfile, self.inner.update_profile(request))
            .await
    }

    async fn get_profile(&self, user: &Principal) -> ServiceResult<Option<UserProfile>> {
        self.observe(RemoteCall::GetProfile, self.inner.get_profile(user))
            .await
    }

    async fn search_users(&self, query: &str) -> ServiceResult<Vec<UserProfile>> {
        self.observe(RemoteCall::SearchUsers, self.inner.search_users(query))
            .await
    }

    async fn get_all_users(&self) -> ServiceResult<Vec<UserProfile>> {
        self.observe(RemoteCall::GetAllUsers, self.inner.get_all_users())
            .await
    }

    async fn follow_user(&self, target: &Principal) -> ServiceResult<bool> {
        self.observe(RemoteCall::FollowUser, self.inner.follow_user(target))
            .await
    }

    async fn unfollow_user(&self, target: &Principal) -> ServiceResult<bool> {
        self.observe(RemoteCall::UnfollowUser, self.inner.unfollow_user(target))
            .await
    }

    async fn is_following(&self, target: &Principal) -> ServiceResult<bool> {
        self.observe(RemoteCall::IsFollowing, self.inner.is_following(target))
            .await
    }

    async fn get_followers(&self, user: &Principal) -> ServiceResult<Vec<Principal>> {
        self.observe(RemoteCall::GetFollowers, self.inner.get_followers(user))
            .await
    }

    async fn get_following(&self, user: &Principal) -> ServiceResult<Vec<Principal>> {
        self.observe(RemoteCall::GetFollowing, self.inner.get_following(user))
            .await
    }

    async fn create_post(&self, request: CreatePostRequest) -> ServiceResult<Post> {
        self.observe(RemoteCall::CreatePost, self.inner.create_post(request))
            .await
    }

    async fn get_post(&self, post_id: &str) -> ServiceResult<Option<Post>> {
        self.observe(RemoteCall::GetPost, self.inner.get_post(post_id))
            .await
    }

    async fn get_user_posts(&self, user: &Principal) -> ServiceResult<Vec<Post>> {
        self.observe(RemoteCall::GetUserPosts, self.inner.get_user_posts(user))
            .await
    }

    async fn get_feed(&self) -> ServiceResult<Vec<Post>> {
        self.observe(RemoteCall::GetFeed, self.inner.get_feed()).await
    }

    async fn delete_post(&self, post_id: &str) -> ServiceResult<bool> {
        self.observe(RemoteCall::DeletePost, self.inner.delete_post(post_id))
            .await
    }

    async fn like_post(&self, post_id: &str) -> ServiceResult<bool> {
        self.observe(RemoteCall::LikePost, self.inner.like_post(post_id))
            .await
    }

    async fn unlike_post(&self, post_id: &str) -> ServiceResult<bool> {
        self.observe(RemoteCall::UnlikePost, self.inner.unlike_post(post_id))
            .await
    }

    async fn is_post_liked(&self, post_id: &str) -> ServiceResult<bool> {
        self.observe(RemoteCall::IsPostLiked, self.inner.is_post_liked(post_id))
            .await
    }

    async fn share_post(&self, post_id: &str) -> ServiceResult<Post> {
        self.observe(RemoteCall::SharePost, self.inner.share_post(post_id))
            .await
    }

    async fn create_comment(&self, request: CreateCommentRequest) -> ServiceResult<Comment> {
        self.observe(RemoteCall::CreateComment, self.inner.create_comment(request))
            .await
    }

    async fn get_post_comments(&self, post_id: &str) -> ServiceResult<Vec<Comment>> {
        self.observe(
            RemoteCall::GetPostComments,
            self.inner.get_post_comments(post_id),
        )
        .await
    }

    async fn like_comment(&self, comment_id: &str) -> ServiceResult<bool> {
        self.observe(RemoteCall::LikeComment, self.inner.like_comment(comment_id))
            .await
    }

    async fn unlike_comment(&self, comment_id: &str) -> ServiceResult<bool> {
        self.observe(
            RemoteCall::UnlikeComment,
            self.inner.unlike_comment(comment_id),
        )
        .await
    }

    async fn delete_comment(&self, comment_id: &str) -> ServiceResult<bool> {
        self.observe(
            RemoteCall::DeleteComment,
            self.inner.delete_comment(comment_id),
        )
        .await
    }
}
